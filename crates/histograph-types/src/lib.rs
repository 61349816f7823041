//! # histograph-types
//!
//! Shared domain types for the Histograph ingestion pipeline.
//!
//! This crate defines the data flowing between the pipeline stages:
//! - Values: the tagged [`FieldValue`] model used for every payload
//! - Events: raw [`RawEvent`] messages popped from the queue
//! - Commands: canonical [`Command`] mutations and their [`Acknowledgement`]s
//! - Settings: layered configuration for the daemon
//!
//! ## Usage
//!
//! ```rust
//! use histograph_types::{Action, Operation};
//!
//! assert_eq!(Action::parse("update").map(Action::operation), Some(Operation::Add));
//! ```

pub mod command;
pub mod config;
pub mod error;
pub mod event;
pub mod value;

pub use command::{Acknowledgement, Command, Operation, Structure};
pub use config::{CoreSettings, GraphSettings, QueueSettings, SearchSettings, Settings};
pub use error::HistographError;
pub use event::{Action, RawEvent};
pub use value::{FieldValue, Payload};
