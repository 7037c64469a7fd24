//! sc-coverage: subtitle coverage reconciliation.
//!
//! [`resolve`] merges a media unit's declared subtitle formats (which carry
//! embedded-track evidence) with its on-disk sidecar inventory into one
//! classification per target language. The aggregate counters fold those
//! classifications over a collection for header badges and the
//! "search all missing" batch.

pub mod counter;
pub mod resolver;

pub use counter::{
    count_missing, count_upgradeable, missing_pairs, summarize,
    CoverageSummary, MissingPair,
};
pub use resolver::{classify, resolve, CoverageResult, CoverageState, LanguageCoverage, Resolution};
