//! # histograph-search
//!
//! Projects node commands into an Elasticsearch-compatible search engine.
//!
//! A batch of acknowledgements travels through three steps:
//!
//! 1. [`compile`] turns it into bulk action pairs (`index` with a
//!    document, or a bare `delete`)
//! 2. [`IndexProvisioner`] creates any index the batch writes to that the
//!    [`IndexRegistry`] does not know yet
//! 3. [`BulkSink`] submits it and throttles when the engine is overloaded
//!
//! The engine itself sits behind the [`SearchEngine`] trait;
//! [`ElasticClient`] implements it over HTTP.

pub mod compile;
pub mod elastic;
pub mod engine;
pub mod error;
pub mod mapping;
pub mod provisioner;
pub mod registry;
pub mod sink;

pub use compile::{compile, compile_one, to_ndjson, ActionDescriptor, BulkActionPair, BulkOp};
pub use elastic::ElasticClient;
pub use engine::{
    BulkItem, BulkResponse, CreateOutcome, ItemError, ItemResult, SearchEngine, REJECTED_EXECUTION,
};
pub use error::{SearchError, SinkError};
pub use mapping::default_mapping;
pub use provisioner::{IndexProvisioner, ProvisionReport, DEFAULT_CREATE_CONCURRENCY};
pub use registry::IndexRegistry;
pub use sink::{BulkSink, BulkSummary, SinkState, WriteOutcome, DEFAULT_COOLDOWN, DEFAULT_REQUEST_TIMEOUT};
