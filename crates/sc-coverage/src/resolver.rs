//! Per-unit coverage resolution.
//!
//! The declared `subtitles` map and the sidecar inventory are two sources of
//! truth for the same fact. [`resolve`] is the only place they are
//! reconciled; rendering code reads the [`Resolution`] and never compares
//! the two directly.

use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

use sc_core::language::normalize;
use sc_core::{LanguageProfile, MediaUnit, SidecarSubtitle, SubtitleFormat};

/// Coverage classification for one (media unit, target language) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CoverageState {
    /// Styled (ASS) subtitles present, sidecar or embedded.
    Optimal,
    /// Plain (SRT) subtitles present; a styled version would be better.
    Upgradeable,
    /// No subtitles for this language.
    Missing,
}

impl fmt::Display for CoverageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Optimal => write!(f, "optimal"),
            Self::Upgradeable => write!(f, "upgradeable"),
            Self::Missing => write!(f, "missing"),
        }
    }
}

/// Map a declared format to its coverage state.
pub fn classify(format: SubtitleFormat) -> CoverageState {
    match format {
        SubtitleFormat::Ass | SubtitleFormat::EmbeddedAss => CoverageState::Optimal,
        SubtitleFormat::Srt | SubtitleFormat::EmbeddedSrt => CoverageState::Upgradeable,
        SubtitleFormat::None => CoverageState::Missing,
    }
}

/// Derived coverage for one target language. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageResult {
    pub state: CoverageState,
    /// Sidecar backing this slot, if any; enables the delete affordance.
    pub matched_sidecar_path: Option<String>,
    pub is_embedded: bool,
    /// The declared format the state was derived from.
    pub format: SubtitleFormat,
}

impl CoverageResult {
    fn missing() -> Self {
        Self {
            state: CoverageState::Missing,
            matched_sidecar_path: None,
            is_embedded: false,
            format: SubtitleFormat::None,
        }
    }
}

/// Coverage of one target language, in profile order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LanguageCoverage {
    /// Target language code as written in the profile.
    pub language: String,
    pub result: CoverageResult,
}

/// Everything the views need to render one unit's subtitle badges.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    pub per_language: Vec<LanguageCoverage>,
    /// Sidecars whose language is not a target language of the profile.
    pub extras: Vec<SidecarSubtitle>,
    /// Sidecars for a target language with the same format as the matched
    /// sidecar (e.g. `ger.srt` next to `de.srt`). Neither matched nor extra.
    pub duplicates: Vec<SidecarSubtitle>,
}

impl Resolution {
    /// Look up a target language, accepting either coding standard.
    pub fn get(&self, language: &str) -> Option<&CoverageResult> {
        let wanted = normalize(language);
        self.per_language
            .iter()
            .find(|c| normalize(&c.language) == wanted)
            .map(|c| &c.result)
    }

    /// Number of target languages in the given state.
    pub fn count(&self, state: CoverageState) -> usize {
        self.per_language
            .iter()
            .filter(|c| c.result.state == state)
            .count()
    }
}

/// Resolve a unit's coverage against the active profile.
///
/// Malformed sidecars (no path or no language) are skipped. When several
/// sidecars share the matched slot's normalized language and format, the
/// first one in input order is the match and the rest are reported as
/// duplicates.
pub fn resolve(
    unit: &MediaUnit,
    sidecars: &[SidecarSubtitle],
    profile: &LanguageProfile,
) -> Resolution {
    let usable: Vec<&SidecarSubtitle> = sidecars
        .iter()
        .filter(|s| {
            let ok = s.is_well_formed();
            if !ok {
                tracing::debug!(unit_id = %unit.id, path = %s.path, "skipping malformed sidecar record");
            }
            ok
        })
        .collect();
    let normalized: Vec<String> = usable.iter().map(|s| s.normalized_language()).collect();
    let targets = profile.normalized_targets();

    let mut per_language = Vec::with_capacity(targets.len());
    let mut duplicate_idx: Vec<usize> = Vec::new();
    let mut seen_duplicates = HashSet::new();

    for (language, target) in profile.target_languages.iter().zip(&targets) {
        if !unit.has_file {
            per_language.push(LanguageCoverage {
                language: language.clone(),
                result: CoverageResult::missing(),
            });
            continue;
        }

        let format = unit.declared_format(language.trim());
        let state = classify(format);
        let mut matched_sidecar_path = None;

        if let Some(wanted_format) = format.sidecar_format() {
            let mut candidates = usable
                .iter()
                .enumerate()
                .filter(|(i, s)| {
                    normalized[*i] == *target && s.sidecar_format() == Some(wanted_format)
                })
                .map(|(i, _)| i);

            if let Some(first) = candidates.next() {
                matched_sidecar_path = Some(usable[first].path.clone());
            }
            for dup in candidates {
                if seen_duplicates.insert(dup) {
                    tracing::debug!(
                        unit_id = %unit.id,
                        path = %usable[dup].path,
                        language = %target,
                        "duplicate sidecar for an already matched slot"
                    );
                    duplicate_idx.push(dup);
                }
            }
        }

        per_language.push(LanguageCoverage {
            language: language.clone(),
            result: CoverageResult {
                state,
                matched_sidecar_path,
                is_embedded: format.is_embedded(),
                format,
            },
        });
    }

    let extras = usable
        .iter()
        .enumerate()
        .filter(|(i, _)| !targets.contains(&normalized[*i]))
        .map(|(_, s)| (*s).clone())
        .collect();

    duplicate_idx.sort_unstable();
    let duplicates = duplicate_idx.into_iter().map(|i| usable[i].clone()).collect();

    Resolution {
        per_language,
        extras,
        duplicates,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sc_core::SidecarFormat;

    fn profile(targets: &[&str]) -> LanguageProfile {
        LanguageProfile::new(1, "en", targets.iter().copied())
    }

    fn sidecar(path: &str, lang: &str, format: SidecarFormat) -> SidecarSubtitle {
        SidecarSubtitle::new(path, lang, format)
    }

    const ALL_FORMATS: [SubtitleFormat; 5] = [
        SubtitleFormat::None,
        SubtitleFormat::Srt,
        SubtitleFormat::Ass,
        SubtitleFormat::EmbeddedSrt,
        SubtitleFormat::EmbeddedAss,
    ];

    #[test]
    fn classify_table() {
        assert_eq!(classify(SubtitleFormat::Ass), CoverageState::Optimal);
        assert_eq!(classify(SubtitleFormat::EmbeddedAss), CoverageState::Optimal);
        assert_eq!(classify(SubtitleFormat::Srt), CoverageState::Upgradeable);
        assert_eq!(classify(SubtitleFormat::EmbeddedSrt), CoverageState::Upgradeable);
        assert_eq!(classify(SubtitleFormat::None), CoverageState::Missing);
    }

    #[test]
    fn exactly_one_state_per_target_language() {
        let p = profile(&["de", "ja"]);
        for has_file in [true, false] {
            for de in ALL_FORMATS {
                for ja in ALL_FORMATS {
                    let unit = MediaUnit::new(1, "Pilot", has_file)
                        .with_subtitle("de", de)
                        .with_subtitle("ja", ja);
                    let res = resolve(&unit, &[], &p);
                    assert_eq!(res.per_language.len(), 2);
                    let total = res.count(CoverageState::Optimal)
                        + res.count(CoverageState::Upgradeable)
                        + res.count(CoverageState::Missing);
                    assert_eq!(total, 2);
                }
            }
        }
    }

    #[test]
    fn no_file_means_missing_everywhere() {
        let unit = MediaUnit::new(1, "Pilot", false).with_subtitle("de", SubtitleFormat::Ass);
        let sidecars = [sidecar("/tv/pilot.de.ass", "de", SidecarFormat::Ass)];
        let res = resolve(&unit, &sidecars, &profile(&["de"]));
        let de = res.get("de").unwrap();
        assert_eq!(de.state, CoverageState::Missing);
        assert_eq!(de.matched_sidecar_path, None);
        assert!(!de.is_embedded);
    }

    #[test]
    fn sidecar_matches_through_normalization() {
        let unit = MediaUnit::new(1, "Pilot", true).with_subtitle("ja", SubtitleFormat::Srt);
        let sidecars = [sidecar("/tv/pilot.jpn.srt", "jpn", SidecarFormat::Srt)];
        let res = resolve(&unit, &sidecars, &profile(&["ja"]));

        let ja = res.get("ja").unwrap();
        assert_eq!(ja.state, CoverageState::Upgradeable);
        assert_eq!(ja.matched_sidecar_path.as_deref(), Some("/tv/pilot.jpn.srt"));
        assert!(res.extras.is_empty());
        assert!(res.duplicates.is_empty());
    }

    #[test]
    fn embedded_formats_never_attach_a_sidecar() {
        let unit = MediaUnit::new(1, "Pilot", true).with_subtitle("de", SubtitleFormat::EmbeddedAss);
        let sidecars = [sidecar("/tv/pilot.de.ass", "de", SidecarFormat::Ass)];
        let res = resolve(&unit, &sidecars, &profile(&["de"]));
        let de = res.get("de").unwrap();
        assert_eq!(de.state, CoverageState::Optimal);
        assert!(de.is_embedded);
        assert_eq!(de.matched_sidecar_path, None);
        assert!(res.extras.is_empty());
    }

    #[test]
    fn format_must_match_for_sidecar_attachment() {
        let unit = MediaUnit::new(1, "Pilot", true).with_subtitle("de", SubtitleFormat::Srt);
        let sidecars = [sidecar("/tv/pilot.de.ass", "de", SidecarFormat::Ass)];
        let res = resolve(&unit, &sidecars, &profile(&["de"]));
        assert_eq!(res.get("de").unwrap().matched_sidecar_path, None);
        assert!(res.extras.is_empty());
    }

    #[test]
    fn extras_are_non_target_languages() {
        let unit = MediaUnit::new(1, "Pilot", true).with_subtitle("de", SubtitleFormat::Srt);
        let sidecars = [
            sidecar("/tv/pilot.de.srt", "de", SidecarFormat::Srt),
            sidecar("/tv/pilot.fre.srt", "fre", SidecarFormat::Srt),
            sidecar("/tv/pilot.it.ass", "IT", SidecarFormat::Ass),
        ];
        let res = resolve(&unit, &sidecars, &profile(&["de"]));
        let paths: Vec<&str> = res.extras.iter().map(|s| s.path.as_str()).collect();
        assert_eq!(paths, vec!["/tv/pilot.fre.srt", "/tv/pilot.it.ass"]);
    }

    #[test]
    fn duplicates_across_coding_standards() {
        let unit = MediaUnit::new(1, "Pilot", true).with_subtitle("de", SubtitleFormat::Srt);
        let sidecars = [
            sidecar("/tv/pilot.ger.srt", "ger", SidecarFormat::Srt),
            sidecar("/tv/pilot.de.srt", "de", SidecarFormat::Srt),
        ];
        let res = resolve(&unit, &sidecars, &profile(&["de"]));
        assert_eq!(
            res.get("de").unwrap().matched_sidecar_path.as_deref(),
            Some("/tv/pilot.ger.srt")
        );
        assert!(res.extras.is_empty());
        assert_eq!(res.duplicates.len(), 1);
        assert_eq!(res.duplicates[0].path, "/tv/pilot.de.srt");
    }

    #[test]
    fn malformed_sidecars_are_skipped() {
        let unit = MediaUnit::new(1, "Pilot", true).with_subtitle("de", SubtitleFormat::Srt);
        let sidecars = [
            SidecarSubtitle {
                path: String::new(),
                language: "de".into(),
                format: "srt".into(),
                media_unit_id: None,
            },
            SidecarSubtitle {
                path: "/tv/pilot.xx.srt".into(),
                language: String::new(),
                format: "srt".into(),
                media_unit_id: None,
            },
            sidecar("/tv/pilot.de.srt", "de", SidecarFormat::Srt),
        ];
        let res = resolve(&unit, &sidecars, &profile(&["de"]));
        assert_eq!(
            res.get("de").unwrap().matched_sidecar_path.as_deref(),
            Some("/tv/pilot.de.srt")
        );
        assert!(res.extras.is_empty());
        assert!(res.duplicates.is_empty());
    }

    #[test]
    fn declared_map_keyed_by_three_letter_code() {
        let unit = MediaUnit::new(1, "Pilot", true).with_subtitle("ger", SubtitleFormat::Ass);
        let res = resolve(&unit, &[], &profile(&["de"]));
        assert_eq!(res.get("deu").unwrap().state, CoverageState::Optimal);
    }

    #[test]
    fn results_follow_profile_order() {
        let unit = MediaUnit::new(1, "Pilot", true);
        let res = resolve(&unit, &[], &profile(&["ja", "de", "fr"]));
        let langs: Vec<&str> = res.per_language.iter().map(|c| c.language.as_str()).collect();
        assert_eq!(langs, vec!["ja", "de", "fr"]);
    }

    #[test]
    fn resolution_serializes_for_rendering() {
        let unit = MediaUnit::new(1, "Pilot", true).with_subtitle("de", SubtitleFormat::EmbeddedSrt);
        let res = resolve(&unit, &[], &profile(&["de"]));
        let json = serde_json::to_value(&res).unwrap();
        assert_eq!(json["perLanguage"][0]["result"]["state"], "upgradeable");
        assert_eq!(json["perLanguage"][0]["result"]["isEmbedded"], true);
    }
}
