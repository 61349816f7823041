//! # histograph-pipeline
//!
//! Wires the Histograph components into one continuously running stream:
//! queue source, command normalizer, graph sink, node filter and batcher,
//! bulk action compiler, index provisioner and bulk sink.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let pipeline = Pipeline::new(source, normalizer, graph, provisioner, sink, config);
//! let cancel = pipeline.cancel_token();
//! tokio::spawn(async move {
//!     shutdown_signal().await;
//!     cancel.cancel();
//! });
//! let stats = pipeline.run().await?;
//! ```

pub mod batcher;
pub mod error;
pub mod pipeline;
pub mod stats;

pub use batcher::{run_batcher, Batcher};
pub use error::PipelineError;
pub use pipeline::{Pipeline, PipelineConfig};
pub use stats::{PipelineStats, StatsSnapshot};
