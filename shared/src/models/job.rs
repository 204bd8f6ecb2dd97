//! Label job payload model
//!
//! The wire shape keeps the field names used by the label station frontend
//! (`KitLabelsRequest`, `LabelSet`, `LabelTemplateZPL`, ...). Static fields and
//! batches stay raw JSON until they are read one at a time, so a wrong-typed
//! field only fails the batch it belongs to. Presence is checked by
//! [`LabelBatchRequest::check`].

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use validator::{Validate, ValidationError};

use crate::error::{AppError, ErrorCode};

/// Top-level print job
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobPayload {
    #[serde(rename = "KitLabelsRequest", default)]
    pub kit_labels_request: Option<KitLabelsRequest>,
}

/// Job body: static fields shared by every label plus the label batches
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KitLabelsRequest {
    #[serde(rename = "KitSKU", default)]
    pub kit_sku: Option<Value>,
    #[serde(rename = "LotNumber", default)]
    pub lot_number: Option<Value>,
    #[serde(rename = "ExpirationDate", default)]
    pub expiration_date: Option<Value>,
    #[serde(rename = "LabelSet", default)]
    pub label_set: Option<Value>,
}

impl KitLabelsRequest {
    /// Static fields merged into every label's field set
    ///
    /// A wrong-typed field is left out and reported.
    pub fn static_fields(&self) -> (StaticFields, Option<StructuralError>) {
        let mut error = None;
        let statics = StaticFields {
            kit_sku: read_field("KitSKU", self.kit_sku.as_ref(), &mut error),
            lot_number: read_field("LotNumber", self.lot_number.as_ref(), &mut error),
            expiration_date: read_field("ExpirationDate", self.expiration_date.as_ref(), &mut error),
        };
        (statics, error)
    }

    /// The batch container; absent means no batches
    pub fn label_set(&self) -> Result<LabelSet, StructuralError> {
        match &self.label_set {
            None | Some(Value::Null) => Ok(LabelSet::default()),
            Some(value) => serde_json::from_value(value.clone())
                .map_err(|e| StructuralError::new("LabelSet", e.to_string())),
        }
    }
}

/// Recognized batches, keyed by label type
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LabelSet {
    #[serde(rename = "KitLabelData", default)]
    pub kit_label_data: Option<Value>,
    #[serde(rename = "SpecimenLabelData", default)]
    pub specimen_label_data: Option<Value>,
}

impl LabelSet {
    /// Batches present in the job, in processing order
    pub fn batches(&self) -> Vec<(BatchKind, &Value)> {
        BatchKind::ALL
            .iter()
            .filter_map(|kind| self.batch(*kind).map(|data| (*kind, data)))
            .collect()
    }

    pub fn batch(&self, kind: BatchKind) -> Option<&Value> {
        match kind {
            BatchKind::Kit => self.kit_label_data.as_ref(),
            BatchKind::Specimen => self.specimen_label_data.as_ref(),
        }
    }
}

/// One batch as received (unvalidated)
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchData {
    /// Target printer (display name or unique id)
    #[serde(rename = "PrinterName")]
    pub printer_name: Option<String>,
    /// Template body, or the placeholder token
    #[serde(rename = "LabelTemplateZPL")]
    pub template: Option<String>,
    #[serde(rename = "KitLabelIDs")]
    pub items: Option<Vec<Value>>,
}

impl BatchData {
    /// Keys the item collection may arrive under
    const ITEM_KEYS: [&'static str; 3] = ["KitLabelIDs", "SpecimenLabelIDs", "LabelIDs"];

    /// Read one batch field by field
    ///
    /// Fields that parse are kept even when another field is wrong-typed, so
    /// a rejected batch can still report one outcome per item.
    pub fn from_value(value: &Value) -> (Self, Option<StructuralError>) {
        let Some(object) = value.as_object() else {
            return (
                Self::default(),
                Some(StructuralError::new("batch", format!("expected an object, got {}", json_type(value)))),
            );
        };

        let mut error = None;
        let template = read_field("LabelTemplateZPL", object.get("LabelTemplateZPL"), &mut error);
        let items = Self::item_entry(object)
            .and_then(|(key, raw)| read_field::<Vec<Value>>(key, Some(raw), &mut error));
        let printer_name = read_field("PrinterName", object.get("PrinterName"), &mut error);

        (
            Self {
                printer_name,
                template,
                items,
            },
            error,
        )
    }

    fn item_entry(object: &Map<String, Value>) -> Option<(&'static str, &Value)> {
        Self::ITEM_KEYS
            .iter()
            .find_map(|key| object.get(*key).map(|raw| (*key, raw)))
    }
}

/// Deserialize an optional field, recording the first type mismatch
fn read_field<T: DeserializeOwned>(
    key: &str,
    raw: Option<&Value>,
    error: &mut Option<StructuralError>,
) -> Option<T> {
    let raw = raw.filter(|v| !v.is_null())?;
    match serde_json::from_value(raw.clone()) {
        Ok(value) => Some(value),
        Err(e) => {
            error.get_or_insert_with(|| StructuralError::new(key, e.to_string()));
            None
        }
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Label type of a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchKind {
    Kit,
    Specimen,
}

impl BatchKind {
    /// All kinds, in processing order
    pub const ALL: [BatchKind; 2] = [BatchKind::Kit, BatchKind::Specimen];

    /// Item key that identifies one label
    pub fn id_key(&self) -> &'static str {
        match self {
            Self::Kit => "KitID",
            Self::Specimen => "SpecimenID",
        }
    }

    /// Placeholder name the identifier is exposed under
    pub fn id_field(&self) -> &'static str {
        match self {
            Self::Kit => "KitId",
            Self::Specimen => "SpecimenId",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Kit => "kit",
            Self::Specimen => "specimen",
        }
    }

    /// Human-readable label type
    pub fn label(&self) -> &'static str {
        match self {
            Self::Kit => "Kit Label",
            Self::Specimen => "Specimen Label",
        }
    }
}

impl fmt::Display for BatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BatchKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "kit" => Ok(Self::Kit),
            "specimen" => Ok(Self::Specimen),
            other => Err(AppError::validation(format!("unknown batch kind: {other}"))),
        }
    }
}

/// Job-level fields shared by every label in every batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticFields {
    pub kit_sku: Option<String>,
    pub lot_number: Option<String>,
    pub expiration_date: Option<String>,
}

/// A batch ready for structural validation
///
/// Built fresh by the orchestrator from the (immutable) payload, with any
/// external template substitution and target fallback already applied.
#[derive(Debug, Clone, Validate)]
pub struct LabelBatchRequest {
    pub kind: BatchKind,
    #[validate(
        required(message = "template body is missing"),
        custom(function = "not_blank", message = "template body is blank")
    )]
    pub template: Option<String>,
    #[validate(
        required(message = "item collection is missing"),
        length(min = 1, message = "item collection is empty")
    )]
    pub items: Option<Vec<Value>>,
    #[validate(
        required(message = "target printer is missing"),
        custom(function = "not_blank", message = "target printer is blank")
    )]
    pub target: Option<String>,
    pub statics: StaticFields,
    /// Type mismatch found while reading the batch or the static fields
    pub malformed: Option<StructuralError>,
}

/// Validated view of a [`LabelBatchRequest`]
#[derive(Debug, Clone, Copy)]
pub struct CheckedBatch<'a> {
    pub kind: BatchKind,
    pub template: &'a str,
    pub items: &'a [Value],
    pub target: &'a str,
    pub statics: &'a StaticFields,
}

impl LabelBatchRequest {
    /// Field order used when reporting structural problems
    const CHECKED_FIELDS: [&'static str; 3] = ["template", "items", "target"];

    /// Run the schema check, returning a borrowed view with every required
    /// field present.
    pub fn check(&self) -> Result<CheckedBatch<'_>, StructuralError> {
        if let Some(malformed) = &self.malformed {
            return Err(malformed.clone());
        }
        if let Err(errors) = self.validate() {
            let field_errors = errors.field_errors();
            for field in Self::CHECKED_FIELDS {
                if let Some(first) = field_errors.get(field).and_then(|errs| errs.first()) {
                    let reason = first
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| first.code.to_string());
                    return Err(StructuralError::new(field, reason));
                }
            }
            return Err(StructuralError::new("batch", errors.to_string()));
        }

        match (&self.template, &self.items, &self.target) {
            (Some(template), Some(items), Some(target)) => Ok(CheckedBatch {
                kind: self.kind,
                template,
                items,
                target,
                statics: &self.statics,
            }),
            _ => Err(StructuralError::new("batch", "required field is missing")),
        }
    }

    /// Number of items that would have been attempted
    pub fn item_count(&self) -> usize {
        self.items.as_ref().map_or(0, Vec::len)
    }
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

/// Batch-level precondition failure, with the offending field
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {reason}")]
pub struct StructuralError {
    pub field: String,
    pub reason: String,
}

impl StructuralError {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl From<StructuralError> for AppError {
    fn from(err: StructuralError) -> Self {
        AppError::with_message(ErrorCode::StructuralError, err.to_string())
            .with_detail("field", err.field)
            .with_detail("reason", err.reason)
    }
}
