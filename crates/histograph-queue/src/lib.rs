//! # histograph-queue
//!
//! Queue source for the Histograph ingestion pipeline.
//!
//! Producers push JSON-encoded change events onto a Redis list. The
//! [`QueueSource`] pops them one by one (blocking, destructive) and yields a
//! lazy sequence of parsed [`histograph_types::RawEvent`]s. Malformed
//! payloads and transport failures are yielded inline as errors; the
//! sequence keeps going.
//!
//! ## Transports
//!
//! - [`RedisQueue`]: `BLPOP` on a Redis list
//! - [`MemoryQueue`]: tokio channel, used in tests

pub mod error;
pub mod memory;
pub mod redis_queue;
pub mod source;
pub mod transport;

pub use error::{QueueError, SourceError};
pub use memory::{MemoryQueue, MemoryQueueHandle};
pub use redis_queue::RedisQueue;
pub use source::{QueueSource, DEFAULT_PROGRESS_EVERY};
pub use transport::QueueTransport;
