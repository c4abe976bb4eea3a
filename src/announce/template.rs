//! Per-language announcement templates with named placeholders.
//!
//! Placeholders are replaced literally: `{trainNo}`, `{trainName}`, `{source}`,
//! `{destination}`, `{platform}`, `{time}`, `{delay}`, `{oldPlatform}`,
//! `{newPlatform}` and `{route}`. Values are not escaped and no locale-aware
//! formatting is applied.

use crate::announce::job::AnnouncementText;
use crate::announce::kind::AnnouncementKind;
use crate::announce::language::Language;
use crate::error::{Result, StationvoxError};
use crate::train::Train;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// Values that are not part of the train record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateExtras {
    /// Overrides the train's own delay.
    pub delay: Option<u32>,
    pub old_platform: Option<String>,
    /// Defaults to the train's platform.
    pub new_platform: Option<String>,
    /// Diversion route, or the free text of a special announcement.
    pub route: Option<String>,
}

/// Templates of one announcement kind, keyed by language.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateFamily {
    templates: BTreeMap<Language, String>,
}

impl TemplateFamily {
    pub fn get(&self, language: Language) -> Option<&str> {
        self.templates.get(&language).map(String::as_str)
    }

    pub fn set(&mut self, language: Language, template: impl Into<String>) {
        self.templates.insert(language, template.into());
    }

    /// Template for `language`, falling back to English.
    pub fn resolve(&self, language: Language) -> Option<&str> {
        self.get(language).or_else(|| self.get(Language::English))
    }
}

/// All template families known to the sequencer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateTable {
    families: HashMap<AnnouncementKind, TemplateFamily>,
}

impl TemplateTable {
    /// A table with no families; every render returns `None`.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Built-in station wording for every kind in English, Hindi and Kannada.
    pub fn builtin() -> Self {
        let mut table = Self::empty();
        for (kind, english, hindi, kannada) in BUILTIN {
            table.set(*kind, Language::English, *english);
            table.set(*kind, Language::Hindi, *hindi);
            table.set(*kind, Language::Kannada, *kannada);
        }
        table
    }

    pub fn family(&self, kind: AnnouncementKind) -> Option<&TemplateFamily> {
        self.families.get(&kind)
    }

    pub fn set(&mut self, kind: AnnouncementKind, language: Language, template: impl Into<String>) {
        self.families.entry(kind).or_default().set(language, template);
    }

    pub fn remove_family(&mut self, kind: AnnouncementKind) -> Option<TemplateFamily> {
        self.families.remove(&kind)
    }

    /// Apply overrides from a TOML document shaped like:
    ///
    /// ```toml
    /// [arrival]
    /// english = "Train {trainNo} arriving on platform {platform}"
    /// ```
    pub fn merge_toml(&mut self, contents: &str) -> Result<()> {
        let raw: BTreeMap<String, BTreeMap<String, String>> = toml::from_str(contents)?;
        for (kind_name, family) in raw {
            let kind: AnnouncementKind = kind_name.parse()?;
            for (language_name, template) in family {
                let language: Language = language_name.parse()?;
                self.set(kind, language, template);
            }
        }
        Ok(())
    }

    /// Built-in table with overrides from `path` applied on top.
    pub fn load_with_overrides(path: &Path) -> Result<Self> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| StationvoxError::TemplateLoad {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
        let mut table = Self::builtin();
        table.merge_toml(&contents)?;
        Ok(table)
    }

    /// Render `kind` for `train` in each requested language.
    ///
    /// Returns `None` when `kind` has no template family. A language without
    /// its own template uses the English one; if English is missing too, that
    /// language is left out. An empty `languages` slice yields an empty list.
    pub fn render(
        &self,
        train: &Train,
        kind: AnnouncementKind,
        languages: &[Language],
        extras: &TemplateExtras,
    ) -> Option<Vec<AnnouncementText>> {
        let family = self.families.get(&kind)?;
        let texts = languages
            .iter()
            .filter_map(|&language| {
                let template = family.resolve(language)?;
                Some(AnnouncementText {
                    language,
                    text: fill(template, train, extras),
                })
            })
            .collect();
        Some(texts)
    }
}

/// Substitute every placeholder in `template`.
pub fn fill(template: &str, train: &Train, extras: &TemplateExtras) -> String {
    let delay = extras.delay.or(train.delay).unwrap_or(0).to_string();
    let substitutions: [(&str, &str); 10] = [
        ("{trainNo}", train.train_no.as_str()),
        ("{trainName}", train.name.as_str()),
        ("{source}", train.source.as_str()),
        ("{destination}", train.destination.as_str()),
        ("{platform}", train.platform.as_str()),
        ("{time}", train.eta.as_str()),
        ("{delay}", delay.as_str()),
        ("{oldPlatform}", extras.old_platform.as_deref().unwrap_or("")),
        (
            "{newPlatform}",
            extras.new_platform.as_deref().unwrap_or(train.platform.as_str()),
        ),
        ("{route}", extras.route.as_deref().unwrap_or("")),
    ];

    let mut text = template.to_string();
    for (placeholder, value) in substitutions {
        if text.contains(placeholder) {
            text = text.replace(placeholder, value);
        }
    }
    text
}

type BuiltinRow = (AnnouncementKind, &'static str, &'static str, &'static str);

const BUILTIN: &[BuiltinRow] = &[
    (
        AnnouncementKind::Arrival,
        "Train number {trainNo}, {trainName}, from {source} to {destination}, is arriving on platform number {platform} at {time}",
        "ट्रेन संख्या {trainNo}, {trainName}, {source} से {destination} के लिए, प्लेटफार्म संख्या {platform} पर {time} बजे आ रही है",
        "ರೈಲು ಸಂಖ್ಯೆ {trainNo}, {trainName}, {source} ನಿಂದ {destination} ಗೆ, ಪ್ಲಾಟ್‌ಫಾರ್ಮ್ ಸಂಖ್ಯೆ {platform} ರಲ್ಲಿ {time} ಗಂಟೆಗೆ ಆಗಮಿಸುತ್ತಿದೆ",
    ),
    (
        AnnouncementKind::Arrived,
        "Train number {trainNo}, {trainName}, from {source} to {destination}, has arrived on platform number {platform}",
        "ट्रेन संख्या {trainNo}, {trainName}, {source} से {destination} के लिए, प्लेटफार्म संख्या {platform} पर पहुंच गई है",
        "ರೈಲು ಸಂಖ್ಯೆ {trainNo}, {trainName}, {source} ನಿಂದ {destination} ಗೆ, ಪ್ಲಾಟ್‌ಫಾರ್ಮ್ ಸಂಖ್ಯೆ {platform} ರಲ್ಲಿ ಆಗಮಿಸಿದೆ",
    ),
    (
        AnnouncementKind::Departure,
        "Train number {trainNo}, {trainName}, to {destination}, is departing from platform number {platform} at {time}",
        "ट्रेन संख्या {trainNo}, {trainName}, {destination} के लिए, प्लेटफार्म संख्या {platform} से {time} बजे प्रस्थान कर रही है",
        "ರೈಲು ಸಂಖ್ಯೆ {trainNo}, {trainName}, {destination} ಗೆ, ಪ್ಲಾಟ್‌ಫಾರ್ಮ್ ಸಂಖ್ಯೆ {platform} ರಿಂದ {time} ಗಂಟೆಗೆ ನಿರ್ಗಮಿಸುತ್ತಿದೆ",
    ),
    (
        AnnouncementKind::PlatformChange,
        "Attention please. Train number {trainNo}, {trainName}, platform changed from {oldPlatform} to {newPlatform}",
        "कृपया ध्यान दें। ट्रेन संख्या {trainNo}, {trainName}, का प्लेटफार्म {oldPlatform} से बदलकर {newPlatform} हो गया है",
        "ದಯವಿಟ್ಟು ಗಮನಿಸಿ. ರೈಲು ಸಂಖ್ಯೆ {trainNo}, {trainName}, ಪ್ಲಾಟ್‌ಫಾರ್ಮ್ {oldPlatform} ರಿಂದ {newPlatform} ಗೆ ಬದಲಾಗಿದೆ",
    ),
    (
        AnnouncementKind::Late,
        "Train number {trainNo}, {trainName}, is running late by {delay} minutes",
        "ट्रेन संख्या {trainNo}, {trainName}, {delay} मिनट देरी से चल रही है",
        "ರೈಲು ಸಂಖ್ಯೆ {trainNo}, {trainName}, {delay} ನಿಮಿಷಗಳ ತಡವಾಗಿ ಚಲಿಸುತ್ತಿದೆ",
    ),
    (
        AnnouncementKind::Cancelled,
        "Train number {trainNo}, {trainName}, has been cancelled",
        "ट्रेन संख्या {trainNo}, {trainName}, रद्द कर दी गई है",
        "ರೈಲು ಸಂಖ್ಯೆ {trainNo}, {trainName}, ರದ್ದುಗೊಂಡಿದೆ",
    ),
    (
        AnnouncementKind::Diverted,
        "Train number {trainNo}, {trainName}, has been diverted via {route}",
        "ट्रेन संख्या {trainNo}, {trainName}, को {route} होकर मोड़ दिया गया है",
        "ರೈಲು ಸಂಖ್ಯೆ {trainNo}, {trainName}, {route} ಮೂಲಕ ತಿರುಗಿಸಲಾಗಿದೆ",
    ),
    (
        AnnouncementKind::Other,
        "The special announcement is as follows: {route}",
        "विशेष घोषणा इस प्रकार है: {route}",
        "ವಿಶೇಷ ಘೋಷಣೆ ಹೀಗಿದೆ: {route}",
    ),
];
