//! Per-label field sets
//!
//! Each label is rendered from a flat field set built from the job's static
//! fields and the item's own fields. Missing static fields fall back to
//! sentinel values; a missing item identifier means the label is skipped.

use std::collections::BTreeMap;

use serde_json::Value;
use shared::{BatchKind, StaticFields};

pub const LOT_MISSING: &str = "LOT_MISSING";
pub const EXP_MISSING: &str = "EXP_MISSING";
pub const SKU_MISSING: &str = "SKU_MISSING";
pub const TYPE_MISSING: &str = "TYPE_MISSING";

/// Generic identifier key accepted for every batch kind
const GENERIC_ID_KEY: &str = "id";

/// Item key carrying the specimen sub-type
const LABEL_TYPE_KEY: &str = "LabelType";

/// Placeholder name → substitution value
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldSet {
    fields: BTreeMap<String, Value>,
}

impl FieldSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Look up a dotted path (`Patient.Name`) into nested objects
    ///
    /// A key that literally contains dots wins over the nested lookup.
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        if let Some(value) = self.fields.get(path) {
            return Some(value);
        }

        let mut parts = path.split('.');
        let mut current = self.fields.get(parts.next()?)?;
        for part in parts {
            current = current.as_object()?.get(part)?;
        }
        Some(current)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for FieldSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut set = FieldSet::new();
        for (k, v) in iter {
            set.insert(k, v);
        }
        set
    }
}

/// Identifier of an item, if it carries one
///
/// Looks at the kind's own key (`KitID`, `SpecimenID`) first, then the
/// generic `id`. Blank strings and nulls count as missing; numbers are
/// accepted and formatted.
pub fn item_id(kind: BatchKind, item: &Value) -> Option<String> {
    [kind.id_key(), GENERIC_ID_KEY]
        .iter()
        .filter_map(|key| item.get(*key))
        .find_map(scalar_id)
}

fn scalar_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Kit type: the first `-`-separated segment of the SKU
///
/// `KIT-100-A` → `KIT`. A SKU starting with `-` yields the whole SKU.
pub fn kit_type(sku: &str) -> &str {
    match sku.split('-').next() {
        Some(first) if !first.is_empty() => first,
        _ => sku,
    }
}

/// Build the field set for one item
///
/// Returns `None` when the item has no identifier. Item fields override the
/// static fields; the kind's identifier placeholder is set last.
pub fn derive(kind: BatchKind, item: &Value, statics: &StaticFields) -> Option<FieldSet> {
    let id = item_id(kind, item)?;

    let mut fields = FieldSet::new();
    let sku = non_blank(statics.kit_sku.as_deref());
    fields.insert("KitSKU", sku.unwrap_or(SKU_MISSING));
    fields.insert("KitType", sku.map(kit_type).unwrap_or(SKU_MISSING));
    fields.insert(
        "LotNumber",
        non_blank(statics.lot_number.as_deref()).unwrap_or(LOT_MISSING),
    );
    fields.insert(
        "ExpirationDate",
        non_blank(statics.expiration_date.as_deref()).unwrap_or(EXP_MISSING),
    );

    if kind == BatchKind::Specimen {
        let label_type = item
            .get(LABEL_TYPE_KEY)
            .and_then(Value::as_str)
            .and_then(|s| non_blank(Some(s)))
            .unwrap_or(TYPE_MISSING)
            .to_string();
        fields.insert(LABEL_TYPE_KEY, label_type);
    }

    if let Some(object) = item.as_object() {
        for (key, value) in object {
            if key == LABEL_TYPE_KEY && !value.is_string() {
                continue;
            }
            fields.insert(key.clone(), value.clone());
        }
    }

    fields.insert(kind.id_field(), id);
    Some(fields)
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.trim().is_empty())
}
