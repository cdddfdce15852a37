/// Archive payload for a single date
///
/// These structs mirror the JSON the archive returns for `date=` and
/// `start_date=`/`end_date=` requests (with `thumbs=true`).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Kind of media an archive entry points at
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
    /// Interactive pages and anything else the archive invents later
    #[serde(other)]
    Other,
}

/// One archive entry
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ImageRecord {
    pub date: NaiveDate,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub explanation: String,
    #[serde(rename = "media_type")]
    pub media_kind: MediaKind,
    #[serde(default)]
    pub url: Option<String>,
    /// Only sent for videos when `thumbs=true`
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub hdurl: Option<String>,
    #[serde(default)]
    pub copyright: Option<String>,
}

impl ImageRecord {
    /// The reference a slot should display
    ///
    /// Videos only ever show their thumbnail; everything else shows `url`.
    /// `None` means the record must be treated as absent.
    pub fn display_ref(&self) -> Option<&str> {
        let reference = match self.media_kind {
            MediaKind::Video => self.thumbnail_url.as_deref(),
            MediaKind::Image | MediaKind::Other => self.url.as_deref(),
        };
        reference.filter(|r| !r.trim().is_empty())
    }

    /// Body text for the description slot
    pub fn body_text(&self) -> String {
        match self.copyright.as_deref().map(str::trim) {
            Some(owner) if !owner.is_empty() => {
                format!("{}\n\n© {}", self.explanation, owner)
            }
            _ => self.explanation.clone(),
        }
    }
}
