//! Service traits and the payloads that cross them.

use serde::{Deserialize, Serialize};

use sc_core::{
    JobId, LanguageProfile, MediaStatus, MediaUnit, MediaUnitId, ProfileId, Result,
    SidecarSubtitle,
};

/// One page of a server-paged collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub data: Vec<T>,
    /// Records across all pages.
    pub total: u64,
    /// 1-based page index.
    pub page: u32,
    pub total_pages: u32,
}

impl<T> Page<T> {
    pub fn empty() -> Self {
        Self {
            data: Vec::new(),
            total: 0,
            page: 1,
            total_pages: 0,
        }
    }
}

/// Server-side filters for [`RecordQuery::list_media_units`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaFilters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_file: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<MediaStatus>,
    /// Restrict to one series (the "series detail" view).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub series_id: Option<i64>,
}

/// A provider subtitle the user never wants downloaded again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlacklistEntry {
    pub provider_name: String,
    pub subtitle_id: String,
    pub language: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_unit_id: Option<MediaUnitId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
}

/// One (media unit, language) pair of a language-targeted batch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchItem {
    pub media_unit_id: MediaUnitId,
    pub language: String,
}

impl BatchItem {
    pub fn new(media_unit_id: MediaUnitId, language: impl Into<String>) -> Self {
        Self {
            media_unit_id,
            language: language.into(),
        }
    }
}

/// Response to a batch dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchStarted {
    pub job_id: JobId,
    /// Items the backend expects to process.
    pub total_items: u64,
}

/// Read side of the backend.
#[async_trait::async_trait]
pub trait RecordQuery: Send + Sync {
    async fn list_media_units(
        &self,
        page: u32,
        page_size: u32,
        filters: &MediaFilters,
    ) -> Result<Page<MediaUnit>>;

    /// Sidecar files on disk for one unit.
    async fn list_sidecars(&self, id: MediaUnitId) -> Result<Vec<SidecarSubtitle>>;

    async fn get_language_profile(&self, id: ProfileId) -> Result<LanguageProfile>;
}

/// Write side of the backend. No call here is assumed committed unless it
/// returns `Ok`.
#[async_trait::async_trait]
pub trait MutationService: Send + Sync {
    async fn set_status(&self, id: MediaUnitId, status: MediaStatus) -> Result<()>;

    async fn add_to_blacklist(&self, entry: &BlacklistEntry) -> Result<()>;

    async fn delete_sidecar(&self, path: &str) -> Result<()>;

    /// Start a batch over `ids`, or over the whole scope when `None`.
    /// Once accepted the job cannot be cancelled from here.
    async fn start_batch(&self, scope: &str, ids: Option<&[MediaUnitId]>) -> Result<BatchStarted>;

    /// Start a batch over explicit (unit, language) pairs. The backend
    /// enqueues one item per pair.
    async fn start_language_batch(&self, scope: &str, items: &[BatchItem]) -> Result<BatchStarted>;
}
