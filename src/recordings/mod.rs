//! Pre-recorded announcement clips keyed by (kind, language).

pub mod library;
pub mod studio;

pub use library::{RecordedAudio, RecordingInfo, RecordingLibrary};
pub use studio::RecordingStudio;

use crate::announce::{AnnouncementKind, Language};
use crate::error::StationvoxError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Composite key of a recorded clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordingKey {
    pub kind: AnnouncementKind,
    pub language: Language,
}

impl RecordingKey {
    pub fn new(kind: AnnouncementKind, language: Language) -> Self {
        Self { kind, language }
    }
}

impl fmt::Display for RecordingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.kind.as_str(), self.language.as_str())
    }
}

impl FromStr for RecordingKey {
    type Err = StationvoxError;

    /// Parses `{kind}_{language}`, e.g. `arrival_hindi` or `platform_change_en`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, language) = s.trim().rsplit_once(['_', ':']).ok_or_else(|| {
            StationvoxError::Other(format!(
                "Invalid recording key '{}': expected <kind>_<language>",
                s
            ))
        })?;
        Ok(Self {
            kind: kind.parse()?,
            language: language.parse()?,
        })
    }
}
