//! Raw event to command normalization.
//!
//! The normalizer is a pure function of the event and its collaborators:
//! no I/O, no clock. Steps:
//! 1. Resolve the action verb to a canonical operation
//! 2. Copy `dataset` into the payload so it travels with the document
//! 3. Convert `validSince` / `validUntil` and add numeric timestamp siblings
//! 4. Canonicalize `id`/`uri` and `from`/`to` within the dataset
//! 5. Serialize nested objects in the payload to JSON strings

use std::sync::Arc;

use tracing::{debug, warn};

use histograph_types::{Action, Command, FieldValue, Payload, RawEvent};

use crate::error::NormalizeError;
use crate::fuzzy_date::{FuzzyDateConverter, FuzzyDates, FuzzyRange};
use crate::identifier::{HgidNormalizer, IdentifierNormalizer};

const VALID_SINCE: &str = "validSince";
const VALID_UNTIL: &str = "validUntil";
const VALID_SINCE_TIMESTAMP: &str = "validSinceTimestamp";
const VALID_UNTIL_TIMESTAMP: &str = "validUntilTimestamp";

/// Maps raw queue events onto canonical graph commands.
#[derive(Clone)]
pub struct CommandNormalizer {
    identifiers: Arc<dyn IdentifierNormalizer>,
    dates: Arc<dyn FuzzyDateConverter>,
}

impl Default for CommandNormalizer {
    fn default() -> Self {
        Self::new(Arc::new(HgidNormalizer::new()), Arc::new(FuzzyDates::new()))
    }
}

impl CommandNormalizer {
    /// Create a normalizer with explicit collaborators.
    pub fn new(
        identifiers: Arc<dyn IdentifierNormalizer>,
        dates: Arc<dyn FuzzyDateConverter>,
    ) -> Self {
        Self { identifiers, dates }
    }

    /// Normalize one raw event.
    pub fn normalize(&self, event: &RawEvent) -> Result<Command, NormalizeError> {
        let action = Action::parse(&event.action)
            .ok_or_else(|| NormalizeError::UnknownAction(event.action.clone()))?;
        let dataset = event.dataset.as_str();

        let mut data = event.data.clone();
        data.insert("dataset".to_string(), FieldValue::from(dataset));

        if let Some(range) = self.convert_date(&data, VALID_SINCE)? {
            data.insert(VALID_SINCE.to_string(), range.to_field());
            data.insert(
                VALID_SINCE_TIMESTAMP.to_string(),
                FieldValue::integer(range.earliest.timestamp()),
            );
        }
        if let Some(range) = self.convert_date(&data, VALID_UNTIL)? {
            data.insert(VALID_UNTIL.to_string(), range.to_field());
            data.insert(
                VALID_UNTIL_TIMESTAMP.to_string(),
                FieldValue::integer(range.latest.timestamp()),
            );
        }

        let kind = data.get("type").and_then(FieldValue::as_str).map(str::to_string);

        // nodes are identified by id or uri, whichever is present first
        let id_input = first_present(&[
            data.get("id"),
            event.id.as_ref(),
            data.get("uri"),
            event.uri.as_ref(),
        ]);
        let id = self.identifier(id_input, dataset)?;
        let source = self.identifier(first_present(&[data.get("from"), event.from.as_ref()]), dataset)?;
        let target = self.identifier(first_present(&[data.get("to"), event.to.as_ref()]), dataset)?;

        if id.is_none() && (source.is_none() || target.is_none()) {
            return Err(NormalizeError::MissingIdentifier {
                dataset: dataset.to_string(),
            });
        }

        stringify_nested(&mut data, dataset)?;

        let command = Command {
            operation: action.operation(),
            dataset: dataset.to_string(),
            kind,
            id,
            source,
            target,
            data,
        };

        debug!(
            dataset = %command.dataset,
            operation = %command.operation,
            id = ?command.id,
            "Normalized event"
        );
        Ok(command)
    }

    fn convert_date(
        &self,
        data: &Payload,
        field: &str,
    ) -> Result<Option<FuzzyRange>, NormalizeError> {
        match data.get(field) {
            Some(value) if value.is_present() => self
                .dates
                .convert(value)
                .map(Some)
                .map_err(|reason| NormalizeError::FuzzyDate {
                    field: field.to_string(),
                    reason,
                }),
            _ => Ok(None),
        }
    }

    fn identifier(
        &self,
        raw: Option<&FieldValue>,
        dataset: &str,
    ) -> Result<Option<String>, NormalizeError> {
        let Some(raw) = raw else {
            return Ok(None);
        };
        let text = raw
            .as_identifier()
            .ok_or_else(|| NormalizeError::InvalidIdentifier {
                raw: raw.to_string(),
                reason: "identifier must be a string or a number".to_string(),
            })?;
        self.identifiers.normalize(&text, dataset).map(Some)
    }
}

fn first_present<'a>(candidates: &[Option<&'a FieldValue>]) -> Option<&'a FieldValue> {
    candidates
        .iter()
        .flatten()
        .copied()
        .find(|value| value.is_present())
}

/// Replace every nested object in `data` by its JSON string, one level deep.
///
/// Arrays are left untouched, including objects inside them. Null fields are
/// kept as null and reported.
fn stringify_nested(data: &mut Payload, dataset: &str) -> Result<(), NormalizeError> {
    for (key, value) in data.iter_mut() {
        match value {
            FieldValue::Map(nested) => {
                *value = FieldValue::String(serde_json::to_string(nested)?);
            }
            FieldValue::Null => {
                warn!(dataset = %dataset, field = %key, "Event field has a null value");
            }
            _ => {}
        }
    }
    Ok(())
}
