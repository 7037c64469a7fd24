//! Filter/sort pipeline over one server page of records.
//!
//! [`apply`] is pure: it borrows its inputs and returns a new ordering, so
//! it can be re-run on every input change. Filters are conjunctive, text
//! search is an OR over a fixed field whitelist, and sorting is a single
//! stable key with no tie-breaking so equal rows keep their server order
//! between interactions.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use sc_core::language::normalize;
use sc_core::{Error, MediaKind, MediaStatus, MediaUnit};

// ---------------------------------------------------------------------------
// Filters and sort keys
// ---------------------------------------------------------------------------

/// Categorical filter. A record must match every filter in the list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum Filter {
    HasFile(bool),
    Status(MediaStatus),
    Kind(MediaKind),
    Season(i32),
    /// Audio track language, either coding standard.
    AudioLanguage(String),
}

/// Keys of the fixed key-to-comparator table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    Title,
    Path,
    Season,
    Episode,
    Status,
    AddedAt,
}

impl SortKey {
    pub const ALL: [SortKey; 6] = [
        SortKey::Title,
        SortKey::Path,
        SortKey::Season,
        SortKey::Episode,
        SortKey::Status,
        SortKey::AddedAt,
    ];
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Title => write!(f, "title"),
            Self::Path => write!(f, "path"),
            Self::Season => write!(f, "season"),
            Self::Episode => write!(f, "episode"),
            Self::Status => write!(f, "status"),
            Self::AddedAt => write!(f, "added_at"),
        }
    }
}

impl FromStr for SortKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "title" | "name" => Ok(Self::Title),
            "path" => Ok(Self::Path),
            "season" => Ok(Self::Season),
            "episode" => Ok(Self::Episode),
            "status" => Ok(Self::Status),
            "added_at" | "added" | "date_added" => Ok(Self::AddedAt),
            other => Err(Error::Validation(format!("unknown sort key '{other}'"))),
        }
    }
}

/// Sort key plus direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SortSpec {
    pub key: SortKey,
    #[serde(default)]
    pub descending: bool,
}

impl SortSpec {
    pub fn new(key: SortKey, descending: bool) -> Self {
        Self { key, descending }
    }
}

/// A record's value for one sort key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortValue<'a> {
    /// Compared with [`collation_key`].
    Text(Option<Cow<'a, str>>),
    Number(Option<i64>),
}

// ---------------------------------------------------------------------------
// ListRecord
// ---------------------------------------------------------------------------

/// A record the pipeline can search, filter and sort.
pub trait ListRecord {
    /// Whitelisted textual fields for free-text search.
    fn search_fields(&self) -> Vec<&str>;

    fn matches(&self, filter: &Filter) -> bool;

    fn sort_value(&self, key: SortKey) -> SortValue<'_>;
}

impl ListRecord for MediaUnit {
    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.title.as_str()];
        if let Some(path) = self.path.as_deref() {
            fields.push(path);
        }
        fields
    }

    fn matches(&self, filter: &Filter) -> bool {
        match filter {
            Filter::HasFile(has_file) => self.has_file == *has_file,
            Filter::Status(status) => self.status == *status,
            Filter::Kind(kind) => self.kind == *kind,
            Filter::Season(season) => self.season == Some(*season),
            Filter::AudioLanguage(code) => {
                let wanted = normalize(code.trim());
                self.audio_languages
                    .iter()
                    .any(|lang| normalize(lang.trim()) == wanted)
            }
        }
    }

    fn sort_value(&self, key: SortKey) -> SortValue<'_> {
        match key {
            SortKey::Title => SortValue::Text(Some(Cow::Borrowed(&self.title))),
            SortKey::Path => SortValue::Text(self.path.as_deref().map(Cow::Borrowed)),
            SortKey::Season => SortValue::Number(self.season.map(i64::from)),
            SortKey::Episode => SortValue::Number(self.episode.map(i64::from)),
            SortKey::Status => SortValue::Text(Some(Cow::Owned(self.status.to_string()))),
            SortKey::AddedAt => SortValue::Number(self.added_at.map(|t| t.timestamp_millis())),
        }
    }
}

// ---------------------------------------------------------------------------
// Collation
// ---------------------------------------------------------------------------

/// Accent- and case-insensitive comparison key.
///
/// Decomposes to NFKD, drops combining marks and lowercases, so "Émile"
/// sorts with "emile" rather than after "z".
pub fn collation_key(s: &str) -> String {
    s.nfkd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
}

/// Precomputed comparable form of a [`SortValue`].
#[derive(Debug, PartialEq, Eq)]
enum Prepared {
    Text(Option<String>),
    Number(Option<i64>),
}

impl Prepared {
    fn from_value(value: SortValue<'_>) -> Self {
        match value {
            SortValue::Text(text) => Prepared::Text(text.map(|t| collation_key(&t))),
            SortValue::Number(n) => Prepared::Number(n),
        }
    }

    /// Missing values sort last in both directions.
    fn compare(&self, other: &Self, descending: bool) -> Ordering {
        let ordered = |cmp: Ordering| if descending { cmp.reverse() } else { cmp };
        match (self, other) {
            (Prepared::Text(a), Prepared::Text(b)) => match (a, b) {
                (Some(a), Some(b)) => ordered(a.cmp(b)),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            },
            (Prepared::Number(a), Prepared::Number(b)) => match (a, b) {
                (Some(a), Some(b)) => ordered(a.cmp(b)),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            },
            // A key maps to one variant for every record.
            _ => Ordering::Equal,
        }
    }
}

// ---------------------------------------------------------------------------
// apply
// ---------------------------------------------------------------------------

fn matches_search<R: ListRecord>(record: &R, needle: &str) -> bool {
    record
        .search_fields()
        .iter()
        .any(|field| field.to_lowercase().contains(needle))
}

/// Filter, search and sort `records`.
///
/// Returns references in display order; the input slice is untouched.
/// Blank search text matches everything.
pub fn apply<'a, R: ListRecord>(
    records: &'a [R],
    filters: &[Filter],
    sort: SortSpec,
    search_text: &str,
) -> Vec<&'a R> {
    let needle = search_text.trim().to_lowercase();

    let mut keyed: Vec<(Prepared, &'a R)> = records
        .iter()
        .filter(|r| filters.iter().all(|f| r.matches(f)))
        .filter(|r| needle.is_empty() || matches_search(*r, &needle))
        .map(|r| (Prepared::from_value(r.sort_value(sort.key)), r))
        .collect();

    // `sort_by` is stable; equal keys keep input order.
    keyed.sort_by(|(a, _), (b, _)| a.compare(b, sort.descending));
    keyed.into_iter().map(|(_, r)| r).collect()
}

/// The full set of pipeline inputs for one view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub filters: Vec<Filter>,
    #[serde(default)]
    pub sort: SortSpec,
    #[serde(default)]
    pub search: String,
}

impl ListQuery {
    pub fn apply<'a, R: ListRecord>(&self, records: &'a [R]) -> Vec<&'a R> {
        apply(records, &self.filters, self.sort, &self.search)
    }
}
