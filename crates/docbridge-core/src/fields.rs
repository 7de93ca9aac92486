//! Allow-listed document fields that may be filled by inference.
//!
//! Webhook payloads name fields as plain strings. Only names listed in
//! [`ExtractableField`] are accepted; each maps to one typed attribute of
//! [`DocumentPatch`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::{DocumentPatch, Error};

/// Payload keys that are part of the webhook envelope rather than fields.
const ENVELOPE_KEYS: &[&str] = &["tag", "url"];

/// A document attribute that can be extracted by the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractableField {
    Title,
}

impl ExtractableField {
    /// All accepted fields, in extraction order.
    pub const ALL: &'static [ExtractableField] = &[ExtractableField::Title];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractableField::Title => "title",
        }
    }

    /// Write an extracted value into the matching patch attribute.
    pub fn apply(&self, patch: &mut DocumentPatch, value: &str) {
        match self {
            ExtractableField::Title => patch.title = Some(value.trim().to_string()),
        }
    }
}

impl FromStr for ExtractableField {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "title" => Ok(ExtractableField::Title),
            other => Err(Error::InvalidInput(format!(
                "Field '{}' cannot be extracted",
                other
            ))),
        }
    }
}

impl fmt::Display for ExtractableField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An accepted field together with the instruction for the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldInstruction {
    pub field: ExtractableField,
    pub instruction: String,
}

/// Build the ordered list of field instructions from a webhook payload.
///
/// Returns a new list; the payload is left untouched. Keys that are neither
/// envelope keys nor accepted fields are skipped, as are accepted fields whose
/// instruction is missing, blank or not a string.
pub fn collect_field_instructions(payload: &Map<String, Value>) -> Vec<FieldInstruction> {
    for key in payload.keys() {
        if !ENVELOPE_KEYS.contains(&key.as_str()) && key.parse::<ExtractableField>().is_err() {
            debug!(field = %key, "Ignoring unsupported payload field");
        }
    }

    ExtractableField::ALL
        .iter()
        .filter_map(|field| {
            let instruction = payload.get(field.as_str())?.as_str()?.trim();
            if instruction.is_empty() {
                return None;
            }
            Some(FieldInstruction {
                field: *field,
                instruction: instruction.to_string(),
            })
        })
        .collect()
}
