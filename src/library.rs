//! Library view controller.
//!
//! Wires one list view together: server records in, the filter/sort
//! pipeline and paginator over them, coverage resolved per visible row,
//! selection scoped to the view, and mutations with local recovery.
//! Network failures never escape as panics or hard errors into rendering;
//! the view degrades to its last-known data and records why.

use futures::future::join_all;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use sc_client::{BatchItem, BatchStarted, BlacklistEntry, MediaFilters, MutationService, RecordQuery};
use sc_core::{
    Error, LanguageProfile, MediaStatus, MediaUnit, MediaUnitId, ProfileId, Result,
    SidecarSubtitle,
};
use sc_coverage::{missing_pairs, resolve, summarize, CoverageSummary, MissingPair, Resolution};
use sc_view::{Filter, ListQuery, PageInfo, Paginator, ProgressReconciler, SearchDebouncer, SelectionStore, SortSpec};

use crate::state::AppState;

/// Records requested per server page.
pub const SERVER_PAGE_SIZE: u32 = 250;

// ---------------------------------------------------------------------------
// View types
// ---------------------------------------------------------------------------

/// Health of the data currently shown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum ViewStatus {
    /// Nothing loaded yet.
    Loading,
    Ready,
    /// The last refresh failed; older data (or nothing) is shown.
    Degraded { message: String, retryable: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Error,
}

/// User-visible notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// One rendered row.
#[derive(Debug, Clone, Serialize)]
pub struct Row<'a> {
    pub unit: &'a MediaUnit,
    pub resolution: Resolution,
    pub selected: bool,
}

/// The two backend services a view talks to.
#[derive(Clone)]
pub struct Backend {
    pub records: Arc<dyn RecordQuery>,
    pub mutations: Arc<dyn MutationService>,
}

impl Backend {
    pub fn new<B>(backend: Arc<B>) -> Self
    where
        B: RecordQuery + MutationService + 'static,
    {
        let records: Arc<dyn RecordQuery> = backend.clone();
        let mutations: Arc<dyn MutationService> = backend;
        Self { records, mutations }
    }
}

// ---------------------------------------------------------------------------
// LibraryView
// ---------------------------------------------------------------------------

pub struct LibraryView {
    scope: String,
    backend: Backend,
    profile_id: ProfileId,
    filters: MediaFilters,
    server_page: u32,

    units: Vec<MediaUnit>,
    sidecars: HashMap<MediaUnitId, Vec<SidecarSubtitle>>,
    profile: Option<LanguageProfile>,
    status: ViewStatus,
    notices: Vec<Notice>,

    query: ListQuery,
    debouncer: SearchDebouncer,
    paginator: Paginator,
    selection: Arc<Mutex<SelectionStore<MediaUnitId>>>,
    progress: Arc<Mutex<ProgressReconciler>>,
}

impl LibraryView {
    /// A view over `scope` with defaults from the shared config.
    pub fn new(scope: impl Into<String>, backend: Backend, state: &AppState) -> Self {
        let view_config = &state.config.view;
        let sort = match view_config.default_sort.parse() {
            Ok(key) => SortSpec::new(key, view_config.descending),
            Err(e) => {
                tracing::warn!("{e}; sorting by title");
                SortSpec::new(Default::default(), view_config.descending)
            }
        };

        Self {
            scope: scope.into(),
            backend,
            profile_id: ProfileId::new(state.config.profile_id),
            filters: MediaFilters::default(),
            server_page: 1,
            units: Vec::new(),
            sidecars: HashMap::new(),
            profile: None,
            status: ViewStatus::Loading,
            notices: Vec::new(),
            query: ListQuery {
                sort,
                ..Default::default()
            },
            debouncer: SearchDebouncer::new(),
            paginator: Paginator::new(view_config.page_size),
            selection: Arc::clone(&state.selection),
            progress: Arc::clone(&state.progress),
        }
    }

    /// Restrict the server query (e.g. to one series).
    pub fn with_filters(mut self, filters: MediaFilters) -> Self {
        self.filters = filters;
        self
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn status(&self) -> &ViewStatus {
        &self.status
    }

    pub fn units(&self) -> &[MediaUnit] {
        &self.units
    }

    pub fn profile(&self) -> Option<&LanguageProfile> {
        self.profile.as_ref()
    }

    pub fn sidecars(&self, id: MediaUnitId) -> &[SidecarSubtitle] {
        self.sidecars.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    pub fn set_profile(&mut self, id: ProfileId) {
        self.profile_id = id;
    }

    pub fn set_server_page(&mut self, page: u32) {
        self.server_page = page.max(1);
    }

    // -- loading -------------------------------------------------------------

    /// Re-query the current server page, its sidecars and the profile.
    pub async fn refresh(&mut self) -> &ViewStatus {
        self.load(false).await;
        &self.status
    }

    /// Like [`refresh`](Self::refresh), but walks every server page.
    pub async fn refresh_all(&mut self) -> &ViewStatus {
        self.load(true).await;
        &self.status
    }

    async fn load(&mut self, all_pages: bool) {
        let mut failure: Option<Error> = None;

        match self.backend.records.get_language_profile(self.profile_id).await {
            Ok(profile) => self.profile = Some(profile),
            Err(e) => {
                tracing::warn!(profile_id = %self.profile_id, "Failed to load language profile: {e}");
                failure = Some(e);
            }
        }

        match self.fetch_units(all_pages).await {
            Ok(units) => {
                self.units = units;
                self.load_sidecars().await;
            }
            Err(e) => {
                tracing::warn!(scope = %self.scope, "Failed to load media units: {e}");
                failure = Some(e);
            }
        }

        self.status = match failure {
            None => ViewStatus::Ready,
            Some(e) => ViewStatus::Degraded {
                message: e.to_string(),
                retryable: e.is_retryable(),
            },
        };
        self.paginator.clamp(self.query.apply(&self.units).len());
    }

    async fn fetch_units(&self, all_pages: bool) -> Result<Vec<MediaUnit>> {
        let records = &self.backend.records;
        if !all_pages {
            let page = records
                .list_media_units(self.server_page, SERVER_PAGE_SIZE, &self.filters)
                .await?;
            return Ok(page.data);
        }

        let mut units = Vec::new();
        let mut page_no = 1;
        loop {
            let page = records
                .list_media_units(page_no, SERVER_PAGE_SIZE, &self.filters)
                .await?;
            let received = page.data.len();
            units.extend(page.data);
            if page_no >= page.total_pages || received == 0 {
                break;
            }
            page_no += 1;
        }
        Ok(units)
    }

    /// Fetch sidecars for every loaded unit. A failed fetch keeps that
    /// unit's previous inventory, or none.
    async fn load_sidecars(&mut self) {
        let records = Arc::clone(&self.backend.records);
        let ids: Vec<MediaUnitId> = self.units.iter().map(|u| u.id).collect();
        let fetched = join_all(ids.iter().map(|id| records.list_sidecars(*id))).await;

        let mut sidecars = HashMap::with_capacity(ids.len());
        for (id, result) in ids.into_iter().zip(fetched) {
            match result {
                Ok(list) => {
                    sidecars.insert(id, list);
                }
                Err(e) => {
                    tracing::warn!(unit_id = %id, "Failed to load sidecars: {e}");
                    let previous = self.sidecars.remove(&id).unwrap_or_default();
                    sidecars.insert(id, previous);
                }
            }
        }
        self.sidecars = sidecars;
    }

    // -- pipeline ------------------------------------------------------------

    pub fn query(&self) -> &ListQuery {
        &self.query
    }

    pub fn set_filters(&mut self, filters: Vec<Filter>) {
        self.query.filters = filters;
        self.paginator.clamp(self.query.apply(&self.units).len());
    }

    pub fn set_sort(&mut self, sort: SortSpec) {
        self.query.sort = sort;
    }

    /// A keystroke in the search box. Applied once it settles.
    pub fn input_search(&mut self, text: impl Into<String>) {
        self.debouncer.input(text);
    }

    pub fn input_search_at(&mut self, text: impl Into<String>, at: Instant) {
        self.debouncer.input_at(text, at);
    }

    /// Apply settled search text; returns whether the rows changed.
    pub fn poll_search_at(&mut self, now: Instant) -> bool {
        let applied = self.debouncer.poll_at(now).map(str::to_string);
        self.apply_search(applied)
    }

    /// Apply pending search text immediately.
    pub fn submit_search(&mut self) -> bool {
        let applied = self.debouncer.flush().map(str::to_string);
        self.apply_search(applied)
    }

    fn apply_search(&mut self, applied: Option<String>) -> bool {
        let Some(text) = applied else {
            return false;
        };
        self.query.search = text;
        self.paginator.clamp(self.query.apply(&self.units).len());
        true
    }

    pub fn set_page(&mut self, page: usize) {
        let len = self.query.apply(&self.units).len();
        self.paginator.set_page(page, len);
    }

    pub fn page_info(&self) -> PageInfo {
        self.paginator.info(self.query.apply(&self.units).len())
    }

    /// Ids on the current page, in display order.
    pub fn visible_ids(&mut self) -> Vec<MediaUnitId> {
        let filtered = self.query.apply(&self.units);
        self.paginator.slice(&filtered).iter().map(|u| u.id).collect()
    }

    /// Current page with coverage resolved per row.
    pub fn rows(&mut self) -> Vec<Row<'_>> {
        let filtered = self.query.apply(&self.units);
        let page = self.paginator.slice(&filtered);
        let selection = self.selection.lock();

        page.iter()
            .copied()
            .map(|unit| {
                let resolution = match &self.profile {
                    Some(profile) => {
                        let sidecars = self.sidecars.get(&unit.id).map(Vec::as_slice).unwrap_or(&[]);
                        resolve(unit, sidecars, profile)
                    }
                    None => Resolution::default(),
                };
                Row {
                    unit,
                    resolution,
                    selected: selection.is_selected(&self.scope, &unit.id),
                }
            })
            .collect()
    }

    /// Coverage totals over every loaded unit.
    pub fn summary(&self) -> CoverageSummary {
        self.profile
            .as_ref()
            .map(|p| summarize(&self.units, p))
            .unwrap_or_default()
    }

    pub fn missing_pairs(&self) -> Vec<MissingPair> {
        self.profile
            .as_ref()
            .map(|p| missing_pairs(&self.units, p))
            .unwrap_or_default()
    }

    // -- selection -----------------------------------------------------------

    /// Toggle a visible row; `range` extends from the last toggled row.
    /// Ids not on the current page are ignored.
    pub fn toggle(&mut self, id: MediaUnitId, range: bool) -> bool {
        let visible = self.visible_ids();
        let Some(index) = visible.iter().position(|v| *v == id) else {
            tracing::debug!(unit_id = %id, scope = %self.scope, "toggle on a row that is not visible");
            return false;
        };
        self.selection
            .lock()
            .toggle(&self.scope, id, index, range, &visible);
        true
    }

    pub fn select_all_visible(&mut self) {
        let visible = self.visible_ids();
        self.selection.lock().select_all(&self.scope, visible);
    }

    pub fn clear_selection(&mut self) {
        self.selection.lock().clear(&self.scope);
    }

    /// Selected ids still on the current page. Batch payloads are built
    /// from this, never from the raw selected set.
    pub fn selected_visible_ids(&mut self) -> Vec<MediaUnitId> {
        let visible = self.visible_ids();
        self.selection.lock().selected_visible(&self.scope, &visible)
    }

    // -- mutations -----------------------------------------------------------

    /// Change a unit's status, showing the new value immediately.
    ///
    /// On failure the previous status is restored and an error notice is
    /// queued.
    pub async fn set_status(&mut self, id: MediaUnitId, status: MediaStatus) -> Result<()> {
        let unit = self
            .units
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| Error::not_found("media unit", id))?;
        let previous = std::mem::replace(&mut unit.status, status);

        match self.backend.mutations.set_status(id, status).await {
            Ok(()) => Ok(()),
            Err(e) => {
                tracing::warn!(unit_id = %id, "Failed to set status: {e}");
                if let Some(unit) = self.units.iter_mut().find(|u| u.id == id) {
                    unit.status = previous;
                }
                self.notices
                    .push(Notice::error(format!("Could not set status to {status}: {e}")));
                Err(e)
            }
        }
    }

    /// Apply a status to every selected visible unit. Returns how many
    /// succeeded; failures are reverted individually.
    pub async fn set_status_selected(&mut self, status: MediaStatus) -> usize {
        let mut changed = 0;
        for id in self.selected_visible_ids() {
            if self.set_status(id, status).await.is_ok() {
                changed += 1;
            }
        }
        changed
    }

    /// Delete a sidecar file. Local state changes only after the backend
    /// confirms.
    pub async fn delete_sidecar(&mut self, unit_id: MediaUnitId, path: &str) -> Result<()> {
        if let Err(e) = self.backend.mutations.delete_sidecar(path).await {
            tracing::warn!(path, "Failed to delete sidecar: {e}");
            self.notices
                .push(Notice::error(format!("Could not delete {path}: {e}")));
            return Err(e);
        }
        if let Some(list) = self.sidecars.get_mut(&unit_id) {
            list.retain(|s| s.path != path);
        }
        self.notices.push(Notice::info(format!("Deleted {path}")));
        Ok(())
    }

    pub async fn blacklist(&mut self, entry: &BlacklistEntry) -> Result<()> {
        match self.backend.mutations.add_to_blacklist(entry).await {
            Ok(()) => {
                self.notices.push(Notice::info(format!(
                    "Blacklisted {} subtitle {}",
                    entry.provider_name, entry.subtitle_id
                )));
                Ok(())
            }
            Err(e) => {
                tracing::warn!(provider = %entry.provider_name, "Failed to blacklist subtitle: {e}");
                self.notices
                    .push(Notice::error(format!("Could not blacklist subtitle: {e}")));
                Err(e)
            }
        }
    }

    /// Start a "search missing" batch with one item per missing
    /// (unit, language) pair and track it as dispatched.
    ///
    /// The item count equals [`CoverageSummary::missing`] for the same data.
    /// Returns `Ok(None)` when nothing is missing. The batch cannot be
    /// cancelled from here once accepted.
    pub async fn search_missing(&mut self) -> Result<Option<BatchStarted>> {
        let Some(profile) = self.profile.as_ref() else {
            return Err(Error::Validation(
                "language profile not loaded; refresh first".into(),
            ));
        };
        let items: Vec<BatchItem> = missing_pairs(&self.units, profile)
            .into_iter()
            .map(|pair| BatchItem::new(pair.unit_id, pair.language))
            .collect();
        if items.is_empty() {
            self.notices.push(Notice::info("Nothing is missing"));
            return Ok(None);
        }

        match self
            .backend
            .mutations
            .start_language_batch(&self.scope, &items)
            .await
        {
            Ok(started) => {
                if started.total_items != items.len() as u64 {
                    tracing::warn!(
                        job_id = %started.job_id,
                        requested = items.len(),
                        accepted = started.total_items,
                        "backend accepted a different number of items"
                    );
                }
                self.progress.lock().dispatch(started.job_id, started.total_items);
                Ok(Some(started))
            }
            Err(e) => {
                tracing::warn!(scope = %self.scope, "Failed to start batch: {e}");
                self.notices
                    .push(Notice::error(format!("Could not start search: {e}")));
                Err(e)
            }
        }
    }

    /// Start a batch over the selected visible units.
    pub async fn start_batch_selected(&mut self) -> Result<Option<BatchStarted>> {
        let ids = self.selected_visible_ids();
        if ids.is_empty() {
            return Ok(None);
        }
        match self.backend.mutations.start_batch(&self.scope, Some(&ids)).await {
            Ok(started) => {
                self.progress.lock().dispatch(started.job_id, started.total_items);
                Ok(Some(started))
            }
            Err(e) => {
                self.notices
                    .push(Notice::error(format!("Could not start batch: {e}")));
                Err(e)
            }
        }
    }
}

impl std::fmt::Debug for LibraryView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LibraryView")
            .field("scope", &self.scope)
            .field("status", &self.status)
            .field("units", &self.units.len())
            .field("query", &self.query)
            .finish()
    }
}
