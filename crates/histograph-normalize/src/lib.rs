//! Command normalization for the Histograph ingestion pipeline.
//!
//! Turns loosely typed queue events into canonical [`Command`]s.
//!
//! ## Key Components
//!
//! - [`CommandNormalizer`]: maps a [`RawEvent`] onto a [`Command`]
//! - [`IdentifierNormalizer`]: canonicalizes node and edge identifiers
//!   ([`HgidNormalizer`] is the default)
//! - [`FuzzyDateConverter`]: turns fuzzy dates into instant ranges
//!   ([`FuzzyDates`] is the default)
//!
//! ## Example
//!
//! ```
//! use histograph_normalize::CommandNormalizer;
//! use histograph_types::{Operation, RawEvent};
//!
//! let normalizer = CommandNormalizer::default();
//! let event = RawEvent::new("update", "ds1").with_field("id", "123");
//! let command = normalizer.normalize(&event).unwrap();
//!
//! assert_eq!(command.operation, Operation::Add);
//! assert_eq!(command.id.as_deref(), Some("urn:hgid:ds1/123"));
//! ```
//!
//! [`Command`]: histograph_types::Command
//! [`RawEvent`]: histograph_types::RawEvent

pub mod error;
pub mod fuzzy_date;
pub mod identifier;
pub mod normalizer;

pub use error::NormalizeError;
pub use fuzzy_date::{FuzzyDateConverter, FuzzyDates, FuzzyRange};
pub use identifier::{HgidNormalizer, IdentifierNormalizer};
pub use normalizer::CommandNormalizer;
