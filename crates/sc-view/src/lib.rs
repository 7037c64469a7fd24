//! sc-view: client-side list state for subcover views.
//!
//! Holds the per-scope multi-select model, the deterministic
//! filter/sort/paginate pipeline over a server page, the search debouncer
//! and the batch progress reconciler. Nothing here performs I/O.

pub mod debounce;
pub mod paginate;
pub mod pipeline;
pub mod progress;
pub mod selection;

pub use debounce::{SearchDebouncer, SEARCH_DEBOUNCE};
pub use paginate::{PageInfo, Paginator};
pub use pipeline::{apply, collation_key, Filter, ListQuery, ListRecord, SortKey, SortSpec, SortValue};
pub use progress::{ApplyOutcome, BatchProgress, JobPhase, ProgressReconciler};
pub use selection::SelectionStore;
