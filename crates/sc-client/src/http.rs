//! JSON-over-HTTP implementation of the backend services.

use futures::StreamExt;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use sc_core::config::BackendConfig;
use sc_core::events::EventBus;
use sc_core::{
    Error, LanguageProfile, MediaStatus, MediaUnit, MediaUnitId, ProfileId, Result,
    SidecarSubtitle,
};

use crate::api::{BatchItem, BatchStarted, BlacklistEntry, MediaFilters, MutationService, Page, RecordQuery};
use crate::sse::SseDecoder;

/// Connect timeout for the long-lived event stream.
const STREAM_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Backend client over its `/api` routes.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    /// Client without a total-request timeout, for the event stream.
    stream_client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpBackend {
    pub fn new(config: &BackendConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to build HTTP client with timeout: {}", e);
                Client::new()
            });
        let stream_client = Client::builder()
            .connect_timeout(STREAM_CONNECT_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to build streaming HTTP client: {}", e);
                Client::new()
            });

        Self {
            client,
            stream_client,
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.header("X-Api-Key", key),
            None => request,
        }
    }

    /// Send a request, mapping transport failures with `on_error` and
    /// non-2xx answers to [`Error::Http`].
    async fn send(
        &self,
        request: RequestBuilder,
        on_error: impl FnOnce(reqwest::Error) -> Error,
    ) -> Result<Response> {
        let response = self.authed(request).send().await.map_err(on_error)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let message = if body.trim().is_empty() {
            status.canonical_reason().unwrap_or("request failed").to_string()
        } else {
            body
        };
        Err(Error::http(status.as_u16(), message))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, what: &str) -> Result<T> {
        let response = self
            .send(self.client.get(self.url(path)), |e| Error::query(what, e))
            .await?;
        response.json::<T>().await.map_err(|e| Error::query(what, e))
    }

    async fn mutate(&self, request: RequestBuilder, action: &str) -> Result<Response> {
        self.send(request, |e| Error::mutation(action, e)).await
    }

    async fn post_batch(&self, body: BatchBody<'_>) -> Result<BatchStarted> {
        let scope = body.scope;
        let request = self.client.post(self.url("/batch")).json(&body);
        let started: BatchStarted = self
            .mutate(request, "start batch")
            .await?
            .json()
            .await
            .map_err(|e| Error::mutation("start batch", e))?;
        tracing::info!(job_id = %started.job_id, total = started.total_items, scope, "batch accepted");
        Ok(started)
    }

    /// Open the backend's progress stream without reading it yet.
    ///
    /// Events the backend emits after this returns are buffered by the
    /// connection, so a caller can connect, dispatch a batch, and only then
    /// start [`ProgressStream::pump`] without losing that batch's events.
    /// Connection failures surface as [`Error::Channel`] or [`Error::Http`].
    pub async fn connect_progress(&self) -> Result<ProgressStream> {
        let request = self
            .stream_client
            .get(self.url("/events"))
            .header(reqwest::header::ACCEPT, "text/event-stream");
        let response = self
            .send(request, |e| Error::Channel(format!("connect failed: {e}")))
            .await?;

        tracing::info!("subscribed to backend progress events");
        Ok(ProgressStream { response })
    }

    /// Connect and publish every job event on `bus` until the stream ends.
    pub async fn subscribe_progress(&self, bus: &EventBus) -> Result<()> {
        self.connect_progress().await?.pump(bus).await
    }
}

/// A connected server-sent-events progress stream.
#[derive(Debug)]
pub struct ProgressStream {
    response: Response,
}

impl ProgressStream {
    /// Decode the stream and publish each job event on `bus` until the
    /// backend closes it.
    ///
    /// Heartbeats and malformed events are skipped. Callers decide whether
    /// to reconnect.
    pub async fn pump(self, bus: &EventBus) -> Result<()> {
        let mut decoder = SseDecoder::new();
        let mut body = self.response.bytes_stream();

        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| Error::Channel(format!("stream interrupted: {e}")))?;
            for event in decoder.push(&chunk) {
                bus.publish(event);
            }
        }
        if let Some(event) = decoder.finish() {
            bus.publish(event);
        }

        tracing::info!("backend progress stream closed");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Wire shapes
// ---------------------------------------------------------------------------

/// Page as sent by the backend, before per-record validation.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPage {
    #[serde(default)]
    data: Vec<serde_json::Value>,
    #[serde(default)]
    total: u64,
    #[serde(default = "first_page")]
    page: u32,
    #[serde(default)]
    total_pages: u32,
}

fn first_page() -> u32 {
    1
}

fn page_params(page: u32, page_size: u32, filters: &MediaFilters) -> Vec<(&'static str, String)> {
    let mut params = vec![("page", page.to_string()), ("pageSize", page_size.to_string())];
    if let Some(has_file) = filters.has_file {
        params.push(("hasFile", has_file.to_string()));
    }
    if let Some(status) = filters.status {
        params.push(("status", status.to_string()));
    }
    if let Some(series_id) = filters.series_id {
        params.push(("seriesId", series_id.to_string()));
    }
    params
}

#[derive(Serialize)]
struct StatusBody {
    status: MediaStatus,
}

#[derive(Serialize)]
struct DeleteSidecarParams<'a> {
    path: &'a str,
}

#[derive(Serialize)]
struct BatchBody<'a> {
    scope: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    ids: Option<&'a [MediaUnitId]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    items: Option<&'a [BatchItem]>,
}

// ---------------------------------------------------------------------------
// Trait impls
// ---------------------------------------------------------------------------

#[async_trait::async_trait]
impl RecordQuery for HttpBackend {
    async fn list_media_units(
        &self,
        page: u32,
        page_size: u32,
        filters: &MediaFilters,
    ) -> Result<Page<MediaUnit>> {
        let params = page_params(page, page_size, filters);
        let request = self.client.get(self.url("/media")).query(&params);
        let raw: RawPage = self
            .send(request, |e| Error::query("media units", e))
            .await?
            .json()
            .await
            .map_err(|e| Error::query("media units", e))?;

        // One bad record must not hide the rest of the page.
        let data = raw
            .data
            .into_iter()
            .filter_map(|value| match serde_json::from_value::<MediaUnit>(value) {
                Ok(unit) => Some(unit),
                Err(e) => {
                    tracing::debug!(error = %e, "skipping malformed media unit record");
                    None
                }
            })
            .collect();

        Ok(Page {
            data,
            total: raw.total,
            page: raw.page,
            total_pages: raw.total_pages,
        })
    }

    async fn list_sidecars(&self, id: MediaUnitId) -> Result<Vec<SidecarSubtitle>> {
        let raw: Vec<serde_json::Value> = self
            .get_json(&format!("/media/{id}/subtitles"), "sidecars")
            .await?;

        Ok(raw
            .into_iter()
            .filter_map(|value| match serde_json::from_value::<SidecarSubtitle>(value) {
                Ok(sidecar) => Some(sidecar),
                Err(e) => {
                    tracing::debug!(unit_id = %id, error = %e, "skipping malformed sidecar record");
                    None
                }
            })
            .collect())
    }

    async fn get_language_profile(&self, id: ProfileId) -> Result<LanguageProfile> {
        match self
            .get_json(&format!("/profiles/{id}"), "language profile")
            .await
        {
            Err(Error::Http { status: 404, .. }) => Err(Error::not_found("profile", id)),
            other => other,
        }
    }
}

#[async_trait::async_trait]
impl MutationService for HttpBackend {
    async fn set_status(&self, id: MediaUnitId, status: MediaStatus) -> Result<()> {
        let request = self
            .client
            .put(self.url(&format!("/media/{id}/status")))
            .json(&StatusBody { status });
        self.mutate(request, "set status").await?;
        Ok(())
    }

    async fn add_to_blacklist(&self, entry: &BlacklistEntry) -> Result<()> {
        let request = self.client.post(self.url("/blacklist")).json(entry);
        self.mutate(request, "blacklist").await?;
        Ok(())
    }

    async fn delete_sidecar(&self, path: &str) -> Result<()> {
        let request = self
            .client
            .delete(self.url("/subtitles"))
            .query(&DeleteSidecarParams { path });
        self.mutate(request, "delete sidecar").await?;
        Ok(())
    }

    async fn start_batch(&self, scope: &str, ids: Option<&[MediaUnitId]>) -> Result<BatchStarted> {
        self.post_batch(BatchBody {
            scope,
            ids,
            items: None,
        })
        .await
    }

    async fn start_language_batch(&self, scope: &str, items: &[BatchItem]) -> Result<BatchStarted> {
        self.post_batch(BatchBody {
            scope,
            ids: None,
            items: Some(items),
        })
        .await
    }
}
