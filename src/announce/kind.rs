use crate::error::StationvoxError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Type of announcement, selecting a template family.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum AnnouncementKind {
    Arrival,
    Arrived,
    Departure,
    PlatformChange,
    Late,
    Cancelled,
    Diverted,
    Other,
}

impl AnnouncementKind {
    pub const ALL: [AnnouncementKind; 8] = [
        AnnouncementKind::Arrival,
        AnnouncementKind::Arrived,
        AnnouncementKind::Departure,
        AnnouncementKind::PlatformChange,
        AnnouncementKind::Late,
        AnnouncementKind::Cancelled,
        AnnouncementKind::Diverted,
        AnnouncementKind::Other,
    ];

    /// Identifier used in template files, recording keys and IPC.
    pub fn as_str(&self) -> &'static str {
        match self {
            AnnouncementKind::Arrival => "arrival",
            AnnouncementKind::Arrived => "arrived",
            AnnouncementKind::Departure => "departure",
            AnnouncementKind::PlatformChange => "platformChange",
            AnnouncementKind::Late => "late",
            AnnouncementKind::Cancelled => "cancelled",
            AnnouncementKind::Diverted => "diverted",
            AnnouncementKind::Other => "other",
        }
    }

    /// Human-readable label for terminal output.
    pub fn label(&self) -> &'static str {
        match self {
            AnnouncementKind::Arrival => "Arrival",
            AnnouncementKind::Arrived => "Arrived",
            AnnouncementKind::Departure => "Departure",
            AnnouncementKind::PlatformChange => "Platform Change",
            AnnouncementKind::Late => "Late/Delay",
            AnnouncementKind::Cancelled => "Cancelled",
            AnnouncementKind::Diverted => "Diverted",
            AnnouncementKind::Other => "Special Announcement",
        }
    }
}

impl fmt::Display for AnnouncementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnnouncementKind {
    type Err = StationvoxError;

    /// Accepts `platformChange`, `platform-change` and `platform_change` alike.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .collect::<String>()
            .to_lowercase();

        AnnouncementKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().to_lowercase() == normalized)
            .ok_or_else(|| StationvoxError::UnknownAnnouncementKind {
                name: s.to_string(),
            })
    }
}
