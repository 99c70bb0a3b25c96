//! Core traits and types for the ARN analytics assistant
//!
//! This crate provides foundational types used across all other crates:
//! - Intent definitions and extracted entity slots
//! - Conversation sessions and turns
//! - Declarative chart descriptors
//! - Collaborator traits (regulatory data, narrative enrichment, session persistence)
//! - A clock abstraction so time-dependent logic never reads a hidden global clock
//! - Error types

pub mod chart;
pub mod clock;
pub mod conversation;
pub mod error;
pub mod intent;
pub mod slots;
pub mod traits;

pub use chart::{ChartDescriptor, ChartSeries, ChartType};
pub use clock::{Clock, ManualClock, SystemClock};
pub use conversation::{ConversationSession, ConversationTurn, TurnRole};
pub use error::{Error, Result};
pub use intent::{IntentCategory, IntentDefinition, MatcherSpec, UNRECOGNIZED_INTENT};
pub use slots::{Metric, SlotValue, Slots};

pub use traits::{
    // Regulatory data
    fields, Aggregates, DataDomain, DataFilters, DataSourceError, OperatorAggregate, RegulatoryDataSource,
    // Enrichment
    EnrichmentContext, EnrichmentError, NarrativeEnricher,
    // Persistence
    PersistenceError, SessionRepository, StoredSession,
};
