/// Display slot values and the record-to-slot mapping
///
/// Slot assignment is pure apart from the random placeholder choice,
/// which draws from the caller's RNG.

use chrono::NaiveDate;
use rand::Rng;
use std::path::PathBuf;

use super::fallback::FallbackPool;
use crate::archive::ImageRecord;

/// Alt text every placeholder carries
pub const FALLBACK_ALT: &str = "Fallback image";

/// One of the three carousel positions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotPosition {
    Before,
    Current,
    Next,
}

/// Where a slot's picture comes from
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DisplayRef {
    Remote(String),
    Local(PathBuf),
}

/// What a display slot currently holds
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SlotValue {
    /// Backed by a real archive record
    Populated {
        display_ref: String,
        alt_text: String,
        source_date: NaiveDate,
        is_navigable: bool,
    },
    /// Local placeholder; never navigable
    Fallback {
        display_ref: PathBuf,
        alt_text: String,
    },
    /// Loading
    #[default]
    Empty,
}

impl SlotValue {
    /// Date a click on this slot navigates to
    pub fn navigable_date(&self) -> Option<NaiveDate> {
        match self {
            Self::Populated {
                source_date,
                is_navigable: true,
                ..
            } => Some(*source_date),
            _ => None,
        }
    }

    pub fn display_ref(&self) -> Option<DisplayRef> {
        match self {
            Self::Populated { display_ref, .. } => Some(DisplayRef::Remote(display_ref.clone())),
            Self::Fallback { display_ref, .. } => Some(DisplayRef::Local(display_ref.clone())),
            Self::Empty => None,
        }
    }

    pub fn alt_text(&self) -> &str {
        match self {
            Self::Populated { alt_text, .. } | Self::Fallback { alt_text, .. } => alt_text,
            Self::Empty => "",
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

/// Slot for a retrieved record
///
/// A record without a usable display reference is treated as absent.
pub fn from_record<R: Rng + ?Sized>(record: &ImageRecord, pool: &FallbackPool, rng: &mut R) -> SlotValue {
    match record.display_ref() {
        Some(display_ref) => SlotValue::Populated {
            display_ref: display_ref.to_string(),
            alt_text: record.title.clone(),
            source_date: record.date,
            is_navigable: true,
        },
        None => {
            log::info!("Record for {} has no displayable reference", record.date);
            from_absence(pool, rng)
        }
    }
}

/// Slot for a failed or empty retrieval
pub fn from_absence<R: Rng + ?Sized>(pool: &FallbackPool, rng: &mut R) -> SlotValue {
    SlotValue::Fallback {
        display_ref: pool.pick(rng),
        alt_text: FALLBACK_ALT.to_string(),
    }
}

/// `from_record` when there is one, `from_absence` otherwise
pub fn from_option<R: Rng + ?Sized>(record: Option<&ImageRecord>, pool: &FallbackPool, rng: &mut R) -> SlotValue {
    match record {
        Some(record) => from_record(record, pool, rng),
        None => from_absence(pool, rng),
    }
}
