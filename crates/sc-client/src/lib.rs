//! sc-client: the backend services subcover consumes.
//!
//! [`RecordQuery`] and [`MutationService`] are the seams the view
//! controller is written against; [`HttpBackend`] implements both over the
//! backend's JSON API and reads its server-sent-events progress stream into
//! an [`EventBus`](sc_core::events::EventBus).

pub mod api;
pub mod http;
pub mod sse;

pub use api::{BatchItem, BatchStarted, BlacklistEntry, MediaFilters, MutationService, Page, RecordQuery};
pub use http::{HttpBackend, ProgressStream};
pub use sse::SseDecoder;
