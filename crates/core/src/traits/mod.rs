//! Collaborator traits for the analytics assistant
//!
//! Everything the engine consumes from the outside world goes through one of
//! these traits so that backends can be swapped and mocked in tests.
//!
//! ```text
//! Regulatory data:
//!   - RegulatoryDataSource: per-operator numeric aggregates for a domain
//!
//! Narrative enrichment:
//!   - NarrativeEnricher: optional Tier 1 text from an external service
//!
//! Persistence:
//!   - SessionRepository: durable store for sessions and their turns
//! ```

mod data_source;
mod enrichment;
mod session_store;

pub use data_source::{
    fields, Aggregates, DataDomain, DataFilters, DataSourceError, OperatorAggregate,
    RegulatoryDataSource,
};
pub use enrichment::{EnrichmentContext, EnrichmentError, NarrativeEnricher};
pub use session_store::{PersistenceError, SessionRepository, StoredSession};
