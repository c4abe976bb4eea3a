use crate::error::StationvoxError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Language an announcement is rendered and spoken in.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    English,
    Hindi,
    Kannada,
}

impl Language {
    pub const ALL: [Language; 3] = [Language::English, Language::Hindi, Language::Kannada];

    /// Lowercase identifier used in config files, recording keys and IPC.
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::English => "english",
            Language::Hindi => "hindi",
            Language::Kannada => "kannada",
        }
    }

    /// BCP 47 tag handed to speech engines.
    pub fn locale(&self) -> &'static str {
        match self {
            Language::English => "en-IN",
            Language::Hindi => "hi-IN",
            Language::Kannada => "kn-IN",
        }
    }

    /// Parse a comma-separated list such as `english,hindi`.
    ///
    /// An empty string yields an empty selection.
    pub fn parse_list(s: &str) -> Result<Vec<Language>, StationvoxError> {
        s.split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(Language::from_str)
            .collect()
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = StationvoxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "english" | "en" | "en-in" => Ok(Language::English),
            "hindi" | "hi" | "hi-in" => Ok(Language::Hindi),
            "kannada" | "kn" | "kn-in" => Ok(Language::Kannada),
            _ => Err(StationvoxError::UnknownLanguage {
                name: s.to_string(),
            }),
        }
    }
}
