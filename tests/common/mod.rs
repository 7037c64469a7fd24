//! Shared test harness for integration tests.
//!
//! Provides [`FakeBackend`], an in-memory implementation of both backend
//! services with failure switches and a call log, and [`TestHarness`] which
//! pairs it with a fresh [`AppState`].

#![allow(dead_code)]

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use sc_client::{BatchItem, BatchStarted, BlacklistEntry, MediaFilters, MutationService, Page, RecordQuery};
use sc_core::config::Config;
use sc_core::{
    Error, JobId, LanguageProfile, MediaStatus, MediaUnit, MediaUnitId, ProfileId, Result,
    SidecarFormat, SidecarSubtitle, SubtitleFormat,
};
use subcover::{AppState, Backend, LibraryView};

/// A mutation the fake backend received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    SetStatus(MediaUnitId, MediaStatus),
    Blacklist(String),
    DeleteSidecar(String),
    StartBatch {
        scope: String,
        ids: Vec<MediaUnitId>,
    },
    StartLanguageBatch {
        scope: String,
        items: Vec<BatchItem>,
    },
}

#[derive(Debug, Default)]
pub struct FakeData {
    pub units: Vec<MediaUnit>,
    pub sidecars: HashMap<MediaUnitId, Vec<SidecarSubtitle>>,
    pub profile: Option<LanguageProfile>,
    pub fail_queries: bool,
    pub fail_sidecars: bool,
    pub fail_mutations: bool,
    pub calls: Vec<Call>,
    pub unit_queries: usize,
}

/// In-memory backend.
#[derive(Debug, Default)]
pub struct FakeBackend {
    pub data: Mutex<FakeData>,
}

impl FakeBackend {
    pub fn new(units: Vec<MediaUnit>, profile: LanguageProfile) -> Arc<Self> {
        let backend = Self::default();
        {
            let mut data = backend.data.lock();
            data.units = units;
            data.profile = Some(profile);
        }
        Arc::new(backend)
    }

    pub fn set_sidecars(&self, id: i64, sidecars: Vec<SidecarSubtitle>) {
        self.data.lock().sidecars.insert(MediaUnitId::new(id), sidecars);
    }

    pub fn fail_queries(&self, fail: bool) {
        self.data.lock().fail_queries = fail;
    }

    pub fn fail_sidecars(&self, fail: bool) {
        self.data.lock().fail_sidecars = fail;
    }

    pub fn fail_mutations(&self, fail: bool) {
        self.data.lock().fail_mutations = fail;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.data.lock().calls.clone()
    }
}

#[async_trait::async_trait]
impl RecordQuery for FakeBackend {
    async fn list_media_units(
        &self,
        page: u32,
        page_size: u32,
        _filters: &MediaFilters,
    ) -> Result<Page<MediaUnit>> {
        let mut data = self.data.lock();
        data.unit_queries += 1;
        if data.fail_queries {
            return Err(Error::query("media units", "connection refused"));
        }
        let size = page_size.max(1) as usize;
        let start = (page.max(1) as usize - 1) * size;
        let total = data.units.len();
        Ok(Page {
            data: data.units.iter().skip(start).take(size).cloned().collect(),
            total: total as u64,
            page,
            total_pages: total.div_ceil(size) as u32,
        })
    }

    async fn list_sidecars(&self, id: MediaUnitId) -> Result<Vec<SidecarSubtitle>> {
        let data = self.data.lock();
        if data.fail_sidecars {
            return Err(Error::http(503, "sidecar scan busy"));
        }
        Ok(data.sidecars.get(&id).cloned().unwrap_or_default())
    }

    async fn get_language_profile(&self, id: ProfileId) -> Result<LanguageProfile> {
        let data = self.data.lock();
        if data.fail_queries {
            return Err(Error::query("language profile", "connection refused"));
        }
        data.profile
            .clone()
            .filter(|p| p.id == id)
            .ok_or_else(|| Error::not_found("profile", id))
    }
}

#[async_trait::async_trait]
impl MutationService for FakeBackend {
    async fn set_status(&self, id: MediaUnitId, status: MediaStatus) -> Result<()> {
        let mut data = self.data.lock();
        if data.fail_mutations {
            return Err(Error::mutation("set status", "backend rejected the change"));
        }
        data.calls.push(Call::SetStatus(id, status));
        if let Some(unit) = data.units.iter_mut().find(|u| u.id == id) {
            unit.status = status;
        }
        Ok(())
    }

    async fn add_to_blacklist(&self, entry: &BlacklistEntry) -> Result<()> {
        let mut data = self.data.lock();
        if data.fail_mutations {
            return Err(Error::mutation("blacklist", "backend rejected the change"));
        }
        data.calls.push(Call::Blacklist(entry.subtitle_id.clone()));
        Ok(())
    }

    async fn delete_sidecar(&self, path: &str) -> Result<()> {
        let mut data = self.data.lock();
        if data.fail_mutations {
            return Err(Error::mutation("delete sidecar", "permission denied"));
        }
        data.calls.push(Call::DeleteSidecar(path.to_string()));
        for list in data.sidecars.values_mut() {
            list.retain(|s| s.path != path);
        }
        Ok(())
    }

    async fn start_batch(&self, scope: &str, ids: Option<&[MediaUnitId]>) -> Result<BatchStarted> {
        let mut data = self.data.lock();
        if data.fail_mutations {
            return Err(Error::mutation("start batch", "queue full"));
        }
        let ids = ids.map(<[MediaUnitId]>::to_vec).unwrap_or_default();
        let total_items = ids.len() as u64;
        data.calls.push(Call::StartBatch {
            scope: scope.to_string(),
            ids,
        });
        Ok(BatchStarted {
            job_id: JobId::new(),
            total_items,
        })
    }

    async fn start_language_batch(&self, scope: &str, items: &[BatchItem]) -> Result<BatchStarted> {
        let mut data = self.data.lock();
        if data.fail_mutations {
            return Err(Error::mutation("start batch", "queue full"));
        }
        data.calls.push(Call::StartLanguageBatch {
            scope: scope.to_string(),
            items: items.to_vec(),
        });
        Ok(BatchStarted {
            job_id: JobId::new(),
            total_items: items.len() as u64,
        })
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

fn episode(id: i64, title: &str, number: i32, has_file: bool) -> MediaUnit {
    let mut unit = MediaUnit::new(id, title, has_file);
    unit.season = Some(1);
    unit.episode = Some(number);
    unit.path = Some(format!("/tv/Show/Season 01/Show - S01E{number:02}.mkv"));
    unit
}

/// Four episodes against an `en` + `de` profile.
///
/// Sorted by title the order is Fourth(4), Pilot(1), Second(2), Third(3).
/// Missing pairs: (1, de), (4, en), (4, de). Unit 3 has no file.
pub fn sample_library() -> (Vec<MediaUnit>, LanguageProfile) {
    let units = vec![
        episode(1, "Pilot", 1, true).with_subtitle("en", SubtitleFormat::Srt),
        episode(2, "Second", 2, true)
            .with_subtitle("en", SubtitleFormat::EmbeddedAss)
            .with_subtitle("ger", SubtitleFormat::Ass),
        episode(3, "Third", 3, false),
        episode(4, "Fourth", 4, true),
    ];
    let mut profile = LanguageProfile::new(1, "ja", ["en", "de"]);
    profile.name = "English + German".into();
    (units, profile)
}

pub fn sample_sidecars() -> Vec<SidecarSubtitle> {
    vec![
        SidecarSubtitle::new(
            "/tv/Show/Season 01/Show - S01E01.en.srt",
            "eng",
            SidecarFormat::Srt,
        ),
        SidecarSubtitle::new(
            "/tv/Show/Season 01/Show - S01E01.fr.srt",
            "fr",
            SidecarFormat::Srt,
        ),
    ]
}

/// Test harness wrapping a shared [`AppState`] and a [`FakeBackend`]
/// loaded with [`sample_library`].
pub struct TestHarness {
    pub state: Arc<AppState>,
    pub backend: Arc<FakeBackend>,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        let (units, profile) = sample_library();
        let backend = FakeBackend::new(units, profile);
        backend.set_sidecars(1, sample_sidecars());
        Self {
            state: AppState::new(config),
            backend,
        }
    }

    /// A view over `scope` talking to the fake backend.
    pub fn view(&self, scope: &str) -> LibraryView {
        LibraryView::new(scope, Backend::new(Arc::clone(&self.backend)), &self.state)
    }

    /// A view that has completed one successful refresh.
    pub async fn loaded_view(&self, scope: &str) -> LibraryView {
        let mut view = self.view(scope);
        view.refresh_all().await;
        view
    }
}

pub fn ids(raw: &[i64]) -> Vec<MediaUnitId> {
    raw.iter().copied().map(MediaUnitId::new).collect()
}
