//! Library-wide coverage totals.
//!
//! Counts are derived from the same classification table as
//! [`resolve`](crate::resolver::resolve), so the summary banner and the
//! per-row badges never disagree.

use serde::Serialize;

use sc_core::{LanguageProfile, MediaUnit, MediaUnitId};

use crate::resolver::{classify, CoverageState};

/// One missing (media unit, target language) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingPair {
    pub unit_id: MediaUnitId,
    /// Target language as written in the profile.
    pub language: String,
}

/// Totals over a set of media units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageSummary {
    pub missing: usize,
    pub upgradeable: usize,
    pub optimal: usize,
    /// Units skipped because they have no video file yet.
    pub units_without_file: usize,
}

impl CoverageSummary {
    /// Total number of counted (unit, language) pairs.
    pub fn pairs(&self) -> usize {
        self.missing + self.upgradeable + self.optimal
    }
}

fn states<'a>(
    unit: &'a MediaUnit,
    profile: &'a LanguageProfile,
) -> impl Iterator<Item = (&'a String, CoverageState)> + 'a {
    profile
        .target_languages
        .iter()
        .map(move |lang| (lang, classify(unit.declared_format(lang.trim()))))
}

/// Number of (unit, language) pairs with no subtitles, over units that have
/// a file. A unit without a file is not actionable and is not counted.
pub fn count_missing(units: &[MediaUnit], profile: &LanguageProfile) -> usize {
    count_state(units, profile, CoverageState::Missing)
}

/// Number of (unit, language) pairs with only plain subtitles.
pub fn count_upgradeable(units: &[MediaUnit], profile: &LanguageProfile) -> usize {
    count_state(units, profile, CoverageState::Upgradeable)
}

fn count_state(units: &[MediaUnit], profile: &LanguageProfile, state: CoverageState) -> usize {
    units
        .iter()
        .filter(|u| u.has_file)
        .flat_map(|u| states(u, profile))
        .filter(|(_, s)| *s == state)
        .count()
}

/// All three totals in a single pass.
pub fn summarize(units: &[MediaUnit], profile: &LanguageProfile) -> CoverageSummary {
    let mut summary = CoverageSummary::default();
    for unit in units {
        if !unit.has_file {
            summary.units_without_file += 1;
            continue;
        }
        for (_, state) in states(unit, profile) {
            match state {
                CoverageState::Missing => summary.missing += 1,
                CoverageState::Upgradeable => summary.upgradeable += 1,
                CoverageState::Optimal => summary.optimal += 1,
            }
        }
    }
    summary
}

/// The missing pairs behind [`count_missing`], in unit then profile order.
///
/// This is the work list a "search missing" batch is built from.
pub fn missing_pairs(units: &[MediaUnit], profile: &LanguageProfile) -> Vec<MissingPair> {
    units
        .iter()
        .filter(|u| u.has_file)
        .flat_map(|u| {
            states(u, profile)
                .filter(|(_, s)| *s == CoverageState::Missing)
                .map(move |(lang, _)| MissingPair {
                    unit_id: u.id,
                    language: lang.clone(),
                })
        })
        .collect()
}
