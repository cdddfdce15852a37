/// Carousel presentation
///
/// Pure view code: everything here reads controller state and emits
/// `Message`s, nothing mutates.

pub mod carousel;

use iced::widget::image;

use crate::state::slot::DisplayRef;

/// A display reference rendered at one tier size
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PreviewKey {
    pub reference: DisplayRef,
    pub tier: u32,
}

/// Decoding progress of one preview
#[derive(Debug, Clone)]
pub enum PreviewState {
    Loading,
    Ready(image::Handle),
    Failed,
}
