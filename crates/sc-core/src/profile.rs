//! Language profiles and the editing rules that keep them consistent.
//!
//! A profile names the source language, the ordered target languages the
//! library should carry subtitles for, and the translation backends to try.
//! [`ProfileRegistry`] is the in-memory create/update/delete surface; the
//! default profile can never be deleted.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

use crate::error::{Error, Result};
use crate::ids::ProfileId;
use crate::language::normalize;

/// How forced (foreign-parts-only) subtitles are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ForcedSubtitlePreference {
    #[default]
    Disabled,
    Separate,
    Auto,
}

impl fmt::Display for ForcedSubtitlePreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => write!(f, "disabled"),
            Self::Separate => write!(f, "separate"),
            Self::Auto => write!(f, "auto"),
        }
    }
}

/// A language profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguageProfile {
    pub id: ProfileId,
    pub name: String,
    pub source_language: String,
    pub target_languages: Vec<String>,
    /// Primary translation backend; empty means the backend default.
    #[serde(default)]
    pub translation_backend: String,
    /// Backends tried after the primary, in order. May omit the primary.
    #[serde(default)]
    pub fallback_chain: Vec<String>,
    #[serde(default)]
    pub forced_subtitle_preference: ForcedSubtitlePreference,
    #[serde(default)]
    pub is_default: bool,
}

impl LanguageProfile {
    pub fn new(
        id: impl Into<ProfileId>,
        source_language: impl Into<String>,
        target_languages: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            source_language: source_language.into(),
            target_languages: target_languages.into_iter().map(Into::into).collect(),
            translation_backend: String::new(),
            fallback_chain: Vec::new(),
            forced_subtitle_preference: ForcedSubtitlePreference::default(),
            is_default: false,
        }
    }

    /// Check the structural invariants of a profile.
    pub fn validate(&self) -> Result<()> {
        if self.source_language.trim().is_empty() {
            return Err(Error::Validation("source language must be set".into()));
        }
        if self.target_languages.is_empty() {
            return Err(Error::Validation(
                "at least one target language is required".into(),
            ));
        }
        let mut seen = HashSet::new();
        for code in &self.target_languages {
            if code.trim().is_empty() {
                return Err(Error::Validation("target language code is empty".into()));
            }
            if !seen.insert(normalize(code.trim())) {
                return Err(Error::Validation(format!(
                    "target language '{code}' is listed more than once"
                )));
            }
        }
        Ok(())
    }

    /// Target languages in profile order, normalized.
    pub fn normalized_targets(&self) -> Vec<String> {
        self.target_languages
            .iter()
            .map(|code| normalize(code.trim()))
            .collect()
    }

    /// Whether `code` normalizes to one of the target languages.
    pub fn targets_language(&self, code: &str) -> bool {
        let wanted = normalize(code.trim());
        self.normalized_targets().iter().any(|t| *t == wanted)
    }

    /// The fallback chain as the backend will walk it: the primary first
    /// (when set), followed by the stored chain without repeating it.
    pub fn effective_fallback_chain(&self) -> Vec<String> {
        let primary = self.translation_backend.trim();
        let mut chain = Vec::with_capacity(self.fallback_chain.len() + 1);
        if !primary.is_empty() {
            chain.push(primary.to_string());
        }
        for backend in &self.fallback_chain {
            let backend = backend.trim();
            if backend.is_empty() || chain.iter().any(|b| b == backend) {
                continue;
            }
            chain.push(backend.to_string());
        }
        chain
    }

    /// Replace the primary backend, keeping it at the head of the chain.
    pub fn set_primary_backend(&mut self, backend: impl Into<String>) {
        let backend = backend.into().trim().to_string();
        let previous = std::mem::replace(&mut self.translation_backend, backend.clone());
        self.fallback_chain.retain(|b| *b != previous && *b != backend);
        if !backend.is_empty() {
            self.fallback_chain.insert(0, backend);
        }
    }

    /// Append a fallback backend. Adding one already in the chain is a no-op.
    pub fn add_fallback(&mut self, backend: impl Into<String>) -> Result<()> {
        let backend = backend.into().trim().to_string();
        if backend.is_empty() {
            return Err(Error::Validation("backend identifier is empty".into()));
        }
        self.materialize_chain();
        if !self.fallback_chain.contains(&backend) {
            self.fallback_chain.push(backend);
        }
        Ok(())
    }

    /// Remove a fallback backend. The primary cannot be removed.
    pub fn remove_fallback(&mut self, backend: &str) -> Result<()> {
        let backend = backend.trim();
        if !self.translation_backend.is_empty() && backend == self.translation_backend {
            return Err(Error::Validation(format!(
                "'{backend}' is the primary backend and cannot be removed from the chain"
            )));
        }
        self.materialize_chain();
        self.fallback_chain.retain(|b| b != backend);
        Ok(())
    }

    /// Move a fallback entry. Index 0 is the primary and stays put.
    pub fn move_fallback(&mut self, from: usize, to: usize) -> Result<()> {
        self.materialize_chain();
        let pinned = usize::from(!self.translation_backend.is_empty());
        let len = self.fallback_chain.len();
        if from >= len || to >= len {
            return Err(Error::Validation(format!(
                "fallback index out of range (len {len})"
            )));
        }
        if from < pinned || to < pinned {
            return Err(Error::Validation(
                "the primary backend must stay first in the chain".into(),
            ));
        }
        let entry = self.fallback_chain.remove(from);
        self.fallback_chain.insert(to, entry);
        Ok(())
    }

    /// Store the effective chain so edits operate on what the user sees.
    fn materialize_chain(&mut self) {
        self.fallback_chain = self.effective_fallback_chain();
    }
}

// ---------------------------------------------------------------------------
// ProfileRegistry
// ---------------------------------------------------------------------------

/// In-memory profile store with exactly one undeletable default.
#[derive(Debug, Clone, Default)]
pub struct ProfileRegistry {
    profiles: BTreeMap<ProfileId, LanguageProfile>,
}

impl ProfileRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new profile. The first profile becomes the default.
    pub fn create(&mut self, mut profile: LanguageProfile) -> Result<&LanguageProfile> {
        profile.validate()?;
        if self.profiles.contains_key(&profile.id) {
            return Err(Error::Validation(format!(
                "profile {} already exists",
                profile.id
            )));
        }
        if self.profiles.is_empty() {
            profile.is_default = true;
        } else if profile.is_default {
            self.clear_default();
        }
        let id = profile.id;
        tracing::debug!(profile_id = %id, "created language profile");
        Ok(self.profiles.entry(id).or_insert(profile))
    }

    /// Replace an existing profile.
    pub fn update(&mut self, mut profile: LanguageProfile) -> Result<&LanguageProfile> {
        profile.validate()?;
        let was_default = self
            .profiles
            .get(&profile.id)
            .map(|p| p.is_default)
            .ok_or_else(|| Error::not_found("profile", profile.id))?;
        if profile.is_default && !was_default {
            self.clear_default();
        } else if was_default {
            // The default can only move by promoting another profile.
            profile.is_default = true;
        }
        let id = profile.id;
        self.profiles.insert(id, profile);
        self.profiles
            .get(&id)
            .ok_or_else(|| Error::Internal("profile vanished during update".into()))
    }

    /// Delete a profile. The default profile is protected.
    pub fn delete(&mut self, id: ProfileId) -> Result<LanguageProfile> {
        match self.profiles.get(&id) {
            None => Err(Error::not_found("profile", id)),
            Some(p) if p.is_default => Err(Error::Validation(
                "the default profile cannot be deleted".into(),
            )),
            Some(_) => self
                .profiles
                .remove(&id)
                .ok_or_else(|| Error::not_found("profile", id)),
        }
    }

    pub fn get(&self, id: ProfileId) -> Option<&LanguageProfile> {
        self.profiles.get(&id)
    }

    pub fn default_profile(&self) -> Option<&LanguageProfile> {
        self.profiles.values().find(|p| p.is_default)
    }

    pub fn list(&self) -> impl Iterator<Item = &LanguageProfile> {
        self.profiles.values()
    }

    fn clear_default(&mut self) {
        for p in self.profiles.values_mut() {
            p.is_default = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(id: i64, targets: &[&str]) -> LanguageProfile {
        LanguageProfile::new(id, "en", targets.iter().copied())
    }

    #[test]
    fn validate_rejects_empty_targets() {
        let p = profile(1, &[]);
        assert!(matches!(p.validate(), Err(Error::Validation(_))));
    }

    #[test]
    fn validate_rejects_duplicates_across_standards() {
        let p = profile(1, &["de", "ger"]);
        let err = p.validate().unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn validate_accepts_distinct_targets() {
        assert!(profile(1, &["de", "ja", "fr"]).validate().is_ok());
    }

    #[test]
    fn targets_language_uses_normalization() {
        let p = profile(1, &["ja"]);
        assert!(p.targets_language("jpn"));
        assert!(p.targets_language("JA"));
        assert!(!p.targets_language("de"));
    }

    #[test]
    fn effective_chain_prepends_primary() {
        let mut p = profile(1, &["de"]);
        p.translation_backend = "deepl".into();
        p.fallback_chain = vec!["google".into(), "libre".into()];
        assert_eq!(p.effective_fallback_chain(), vec!["deepl", "google", "libre"]);
    }

    #[test]
    fn effective_chain_does_not_duplicate_primary() {
        let mut p = profile(1, &["de"]);
        p.translation_backend = "deepl".into();
        p.fallback_chain = vec!["google".into(), "deepl".into()];
        assert_eq!(p.effective_fallback_chain(), vec!["deepl", "google"]);
    }

    #[test]
    fn effective_chain_without_primary() {
        let mut p = profile(1, &["de"]);
        p.fallback_chain = vec!["google".into()];
        assert_eq!(p.effective_fallback_chain(), vec!["google"]);
    }

    #[test]
    fn removing_primary_is_rejected() {
        let mut p = profile(1, &["de"]);
        p.set_primary_backend("deepl");
        p.add_fallback("google").unwrap();
        assert!(p.remove_fallback("deepl").is_err());
        p.remove_fallback("google").unwrap();
        assert_eq!(p.effective_fallback_chain(), vec!["deepl"]);
    }

    #[test]
    fn set_primary_moves_it_to_front() {
        let mut p = profile(1, &["de"]);
        p.set_primary_backend("deepl");
        p.add_fallback("google").unwrap();
        p.set_primary_backend("google");
        assert_eq!(p.effective_fallback_chain(), vec!["google"]);
    }

    #[test]
    fn move_fallback_keeps_primary_pinned() {
        let mut p = profile(1, &["de"]);
        p.set_primary_backend("deepl");
        p.add_fallback("google").unwrap();
        p.add_fallback("libre").unwrap();
        p.move_fallback(2, 1).unwrap();
        assert_eq!(p.effective_fallback_chain(), vec!["deepl", "libre", "google"]);
        assert!(p.move_fallback(1, 0).is_err());
        assert!(p.move_fallback(5, 1).is_err());
    }

    #[test]
    fn registry_first_profile_is_default_and_protected() {
        let mut reg = ProfileRegistry::new();
        reg.create(profile(1, &["de"])).unwrap();
        reg.create(profile(2, &["ja"])).unwrap();
        assert_eq!(reg.default_profile().unwrap().id, ProfileId::new(1));
        assert!(matches!(
            reg.delete(ProfileId::new(1)),
            Err(Error::Validation(_))
        ));
        assert!(reg.delete(ProfileId::new(2)).is_ok());
        assert!(matches!(
            reg.delete(ProfileId::new(2)),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn registry_promoting_default_moves_the_flag() {
        let mut reg = ProfileRegistry::new();
        reg.create(profile(1, &["de"])).unwrap();
        let mut second = profile(2, &["ja"]);
        second.is_default = true;
        reg.create(second).unwrap();
        assert_eq!(reg.default_profile().unwrap().id, ProfileId::new(2));
        assert_eq!(reg.list().filter(|p| p.is_default).count(), 1);
        assert!(reg.delete(ProfileId::new(1)).is_ok());
    }

    #[test]
    fn registry_update_cannot_demote_default() {
        let mut reg = ProfileRegistry::new();
        reg.create(profile(1, &["de"])).unwrap();
        let mut edited = profile(1, &["de", "fr"]);
        edited.is_default = false;
        let stored = reg.update(edited).unwrap();
        assert!(stored.is_default);
        assert_eq!(stored.target_languages.len(), 2);
    }

    #[test]
    fn registry_rejects_invalid_and_duplicate_profiles() {
        let mut reg = ProfileRegistry::new();
        assert!(reg.create(profile(1, &[])).is_err());
        reg.create(profile(1, &["de"])).unwrap();
        assert!(reg.create(profile(1, &["fr"])).is_err());
        assert!(reg.update(profile(9, &["fr"])).is_err());
    }
}
