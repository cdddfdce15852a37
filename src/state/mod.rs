/// State management module
/// 
/// This module handles all carousel state, including:
/// - The navigation and retrieval controller (carousel.rs)
/// - Slot values and record-to-slot assignment (slot.rs)
/// - Placeholder images for unavailable records (fallback.rs)
/// - The stored archive credential (credentials.rs)

pub mod carousel;
pub mod credentials;
pub mod fallback;
pub mod slot;
