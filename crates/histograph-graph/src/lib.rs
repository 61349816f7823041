//! # histograph-graph
//!
//! Registers canonical commands with the graph store.
//!
//! The [`GraphStore`] trait is the protocol boundary. [`HttpGraphStore`]
//! talks to a remote store over HTTP; [`MemoryGraphStore`] keeps everything
//! in process. [`GraphSink`] sits in front of either and adds ordered,
//! retrying registration.

pub mod error;
pub mod http;
pub mod memory;
pub mod sink;
pub mod store;

pub use error::GraphError;
pub use http::HttpGraphStore;
pub use memory::MemoryGraphStore;
pub use sink::GraphSink;
pub use store::GraphStore;
