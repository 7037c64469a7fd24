//! Media-library data model: media units, their declared subtitle formats
//! and the sidecar subtitle files found next to them on disk.
//!
//! All records are created by the backend's library scan and are read-only
//! to subcover; they are refreshed by re-querying after mutations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::ids::MediaUnitId;

// ---------------------------------------------------------------------------
// SubtitleFormat
// ---------------------------------------------------------------------------

/// Subtitle format declared by the backend for one target language.
///
/// The backend folds embedded-track detection into this value, so
/// `embedded_*` variants describe tracks muxed into the container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SubtitleFormat {
    #[default]
    #[serde(alias = "")]
    None,
    Srt,
    Ass,
    EmbeddedSrt,
    EmbeddedAss,
}

impl SubtitleFormat {
    /// Whether the subtitle lives inside the video container.
    pub fn is_embedded(self) -> bool {
        matches!(self, Self::EmbeddedSrt | Self::EmbeddedAss)
    }

    /// The sidecar format a non-embedded value is stored as on disk.
    pub fn sidecar_format(self) -> Option<SidecarFormat> {
        match self {
            Self::Srt => Some(SidecarFormat::Srt),
            Self::Ass => Some(SidecarFormat::Ass),
            Self::None | Self::EmbeddedSrt | Self::EmbeddedAss => None,
        }
    }
}

impl fmt::Display for SubtitleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Srt => write!(f, "srt"),
            Self::Ass => write!(f, "ass"),
            Self::EmbeddedSrt => write!(f, "embedded_srt"),
            Self::EmbeddedAss => write!(f, "embedded_ass"),
        }
    }
}

// ---------------------------------------------------------------------------
// SidecarFormat
// ---------------------------------------------------------------------------

/// On-disk subtitle file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SidecarFormat {
    Srt,
    Ass,
}

impl SidecarFormat {
    /// Parse a format name or file extension, case-insensitively.
    ///
    /// `ssa` files are Advanced SubStation's predecessor and are grouped
    /// with `ass`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().trim_start_matches('.').to_lowercase().as_str() {
            "srt" | "subrip" => Some(Self::Srt),
            "ass" | "ssa" => Some(Self::Ass),
            _ => None,
        }
    }
}

impl fmt::Display for SidecarFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Srt => write!(f, "srt"),
            Self::Ass => write!(f, "ass"),
        }
    }
}

// ---------------------------------------------------------------------------
// MediaKind / MediaStatus
// ---------------------------------------------------------------------------

/// Whether a media unit is a movie or a series episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    #[default]
    Episode,
    Movie,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Episode => write!(f, "episode"),
            Self::Movie => write!(f, "movie"),
        }
    }
}

/// Per-unit status the user can change through the mutation service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MediaStatus {
    #[default]
    Monitored,
    Unmonitored,
    Excluded,
}

impl fmt::Display for MediaStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Monitored => write!(f, "monitored"),
            Self::Unmonitored => write!(f, "unmonitored"),
            Self::Excluded => write!(f, "excluded"),
        }
    }
}

// ---------------------------------------------------------------------------
// MediaUnit
// ---------------------------------------------------------------------------

/// One episode or movie tracked for subtitle coverage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaUnit {
    pub id: MediaUnitId,
    pub title: String,
    #[serde(default)]
    pub kind: MediaKind,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub season: Option<i32>,
    #[serde(default)]
    pub episode: Option<i32>,
    #[serde(default)]
    pub has_file: bool,
    /// Declared subtitle format per raw target-language code.
    #[serde(default)]
    pub subtitles: BTreeMap<String, SubtitleFormat>,
    #[serde(default)]
    pub audio_languages: BTreeSet<String>,
    #[serde(default)]
    pub status: MediaStatus,
    #[serde(default)]
    pub added_at: Option<DateTime<Utc>>,
}

impl MediaUnit {
    /// Minimal unit with a title and file presence; everything else empty.
    pub fn new(id: impl Into<MediaUnitId>, title: impl Into<String>, has_file: bool) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            kind: MediaKind::default(),
            path: None,
            season: None,
            episode: None,
            has_file,
            subtitles: BTreeMap::new(),
            audio_languages: BTreeSet::new(),
            status: MediaStatus::default(),
            added_at: None,
        }
    }

    /// Builder-style helper to declare a subtitle format for a language.
    pub fn with_subtitle(mut self, language: impl Into<String>, format: SubtitleFormat) -> Self {
        self.subtitles.insert(language.into(), format);
        self
    }

    /// Declared format for `language`, matching keys through the language
    /// normalizer so `ger` and `de` address the same slot.
    ///
    /// An exact key match wins; otherwise the first key (in map order) that
    /// normalizes to the same language is used.
    pub fn declared_format(&self, language: &str) -> SubtitleFormat {
        if let Some(format) = self.subtitles.get(language) {
            return *format;
        }
        let wanted = crate::language::normalize(language);
        self.subtitles
            .iter()
            .find(|(code, _)| crate::language::normalize(code) == wanted)
            .map(|(_, format)| *format)
            .unwrap_or_default()
    }

    /// `SxxEyy` label for episodes with both ordinals, `None` otherwise.
    pub fn episode_label(&self) -> Option<String> {
        match (self.season, self.episode) {
            (Some(s), Some(e)) => Some(format!("S{s:02}E{e:02}")),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// SidecarSubtitle
// ---------------------------------------------------------------------------

/// A subtitle file stored next to the video file on disk.
///
/// Fields are kept raw: the backend occasionally reports records without a
/// path or language, and those are skipped by consumers rather than
/// rejected at deserialization time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SidecarSubtitle {
    #[serde(default)]
    pub path: String,
    /// Raw language code in either coding standard, any case.
    #[serde(default)]
    pub language: String,
    /// Raw format name; when empty the file extension is used.
    #[serde(default)]
    pub format: String,
    #[serde(default)]
    pub media_unit_id: Option<MediaUnitId>,
}

impl SidecarSubtitle {
    pub fn new(
        path: impl Into<String>,
        language: impl Into<String>,
        format: SidecarFormat,
    ) -> Self {
        Self {
            path: path.into(),
            language: language.into(),
            format: format.to_string(),
            media_unit_id: None,
        }
    }

    /// A record is usable only when it names both a path and a language.
    pub fn is_well_formed(&self) -> bool {
        !self.path.trim().is_empty() && !self.language.trim().is_empty()
    }

    /// Parsed format, falling back to the path's extension.
    pub fn sidecar_format(&self) -> Option<SidecarFormat> {
        SidecarFormat::parse(&self.format).or_else(|| {
            std::path::Path::new(&self.path)
                .extension()
                .and_then(|ext| ext.to_str())
                .and_then(SidecarFormat::parse)
        })
    }

    /// Normalized language code.
    pub fn normalized_language(&self) -> String {
        crate::language::normalize(self.language.trim())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subtitle_format_embedded_flags() {
        assert!(SubtitleFormat::EmbeddedAss.is_embedded());
        assert!(SubtitleFormat::EmbeddedSrt.is_embedded());
        assert!(!SubtitleFormat::Srt.is_embedded());
        assert!(!SubtitleFormat::None.is_embedded());
    }

    #[test]
    fn subtitle_format_sidecar_mapping() {
        assert_eq!(SubtitleFormat::Srt.sidecar_format(), Some(SidecarFormat::Srt));
        assert_eq!(SubtitleFormat::Ass.sidecar_format(), Some(SidecarFormat::Ass));
        assert_eq!(SubtitleFormat::EmbeddedAss.sidecar_format(), None);
        assert_eq!(SubtitleFormat::None.sidecar_format(), None);
    }

    #[test]
    fn subtitle_format_deserializes_empty_string_as_none() {
        let map: BTreeMap<String, SubtitleFormat> =
            serde_json::from_str(r#"{"en": "", "de": "embedded_ass", "ja": "srt"}"#).unwrap();
        assert_eq!(map["en"], SubtitleFormat::None);
        assert_eq!(map["de"], SubtitleFormat::EmbeddedAss);
        assert_eq!(map["ja"], SubtitleFormat::Srt);
    }

    #[test]
    fn sidecar_format_parse() {
        assert_eq!(SidecarFormat::parse("SRT"), Some(SidecarFormat::Srt));
        assert_eq!(SidecarFormat::parse(".ass"), Some(SidecarFormat::Ass));
        assert_eq!(SidecarFormat::parse("ssa"), Some(SidecarFormat::Ass));
        assert_eq!(SidecarFormat::parse("vtt"), None);
    }

    #[test]
    fn media_unit_deserializes_with_defaults() {
        let json = r#"{"id": 7, "title": "Pilot", "hasFile": true, "subtitles": {"ger": "srt"}}"#;
        let unit: MediaUnit = serde_json::from_str(json).unwrap();
        assert_eq!(unit.id, MediaUnitId::new(7));
        assert!(unit.has_file);
        assert_eq!(unit.kind, MediaKind::Episode);
        assert_eq!(unit.status, MediaStatus::Monitored);
        assert!(unit.audio_languages.is_empty());
    }

    #[test]
    fn declared_format_matches_across_standards() {
        let unit = MediaUnit::new(1, "Pilot", true).with_subtitle("ger", SubtitleFormat::Ass);
        assert_eq!(unit.declared_format("de"), SubtitleFormat::Ass);
        assert_eq!(unit.declared_format("DEU"), SubtitleFormat::Ass);
        assert_eq!(unit.declared_format("fr"), SubtitleFormat::None);
    }

    #[test]
    fn declared_format_prefers_exact_key() {
        let unit = MediaUnit::new(1, "Pilot", true)
            .with_subtitle("de", SubtitleFormat::Srt)
            .with_subtitle("ger", SubtitleFormat::Ass);
        assert_eq!(unit.declared_format("ger"), SubtitleFormat::Ass);
        assert_eq!(unit.declared_format("de"), SubtitleFormat::Srt);
    }

    #[test]
    fn episode_label() {
        let mut unit = MediaUnit::new(1, "Pilot", true);
        assert_eq!(unit.episode_label(), None);
        unit.season = Some(1);
        unit.episode = Some(3);
        assert_eq!(unit.episode_label().as_deref(), Some("S01E03"));
    }

    #[test]
    fn sidecar_well_formed() {
        let ok = SidecarSubtitle::new("/tv/show.de.srt", "de", SidecarFormat::Srt);
        assert!(ok.is_well_formed());
        let no_path = SidecarSubtitle {
            language: "de".into(),
            ..Default::default()
        };
        assert!(!no_path.is_well_formed());
        let no_lang = SidecarSubtitle {
            path: "/tv/show.srt".into(),
            language: "  ".into(),
            ..Default::default()
        };
        assert!(!no_lang.is_well_formed());
    }

    #[test]
    fn sidecar_format_falls_back_to_extension() {
        let sidecar = SidecarSubtitle {
            path: "/tv/show.ger.ASS".into(),
            language: "ger".into(),
            format: String::new(),
            media_unit_id: None,
        };
        assert_eq!(sidecar.sidecar_format(), Some(SidecarFormat::Ass));
        assert_eq!(sidecar.normalized_language(), "de");
    }
}
