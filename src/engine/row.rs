//! Row model: a closed field schema and typed values decoded against it

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

use crate::remote::RemoteError;

/// Unique key of a row (for cases, the case identifier)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowKey(String);

impl RowKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RowKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

/// How a field is compared and filtered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    #[default]
    Text,
    Number,
    Date,
}

/// One declared column of a row schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub label: String,
    #[serde(default)]
    pub kind: FieldKind,
}

impl FieldSpec {
    pub fn new(name: &str, label: &str, kind: FieldKind) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            kind,
        }
    }
}

/// The closed set of fields agreed upon by the listing source and the table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowSchema {
    /// Field holding the unique row key
    pub key_field: String,
    /// Field used when a single row has to be named (falls back to the key)
    #[serde(default)]
    pub display_field: Option<String>,
    /// Columns in display and export order
    pub fields: Vec<FieldSpec>,
}

impl RowSchema {
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn kind_of(&self, name: &str) -> Option<FieldKind> {
        self.field(name).map(|f| f.kind)
    }

    /// Check that the key and display fields are declared columns
    pub fn validate(&self) -> Result<(), String> {
        if self.fields.is_empty() {
            return Err("schema declares no fields".to_string());
        }
        if self.field(&self.key_field).is_none() {
            return Err(format!("key field '{}' is not declared", self.key_field));
        }
        if let Some(display) = &self.display_field {
            if self.field(display).is_none() {
                return Err(format!("display field '{display}' is not declared"));
            }
        }
        Ok(())
    }

    /// Default schema for case listings
    pub fn cases() -> Self {
        Self {
            key_field: "caseId".to_string(),
            display_field: Some("ownerName".to_string()),
            fields: vec![
                FieldSpec::new("caseId", "Case", FieldKind::Text),
                FieldSpec::new("policyNo", "Policy", FieldKind::Text),
                FieldSpec::new("ownerName", "Owner", FieldKind::Text),
                FieldSpec::new("status", "Status", FieldKind::Text),
                FieldSpec::new("amount", "Amount", FieldKind::Number),
                FieldSpec::new("reportDate", "Reported", FieldKind::Date),
                FieldSpec::new("assignee", "Assignee", FieldKind::Text),
            ],
        }
    }

    /// Default schema for the operator directory
    pub fn assignees() -> Self {
        Self {
            key_field: "operatorId".to_string(),
            display_field: Some("name".to_string()),
            fields: vec![
                FieldSpec::new("operatorId", "ID", FieldKind::Text),
                FieldSpec::new("name", "Name", FieldKind::Text),
                FieldSpec::new("team", "Team", FieldKind::Text),
                FieldSpec::new("openCases", "Open", FieldKind::Number),
            ],
        }
    }
}

/// A typed scalar value
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FieldValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Date(NaiveDateTime),
}

static EMPTY: FieldValue = FieldValue::Empty;

impl FieldValue {
    /// Decode a JSON scalar as the given kind; unusable values become `Empty`
    pub fn from_json(kind: FieldKind, value: &Value) -> Self {
        match (kind, value) {
            (_, Value::Null) => Self::Empty,
            (FieldKind::Text, Value::String(s)) if s.is_empty() => Self::Empty,
            (FieldKind::Text, Value::String(s)) => Self::Text(s.clone()),
            (FieldKind::Text, Value::Number(n)) => Self::Text(n.to_string()),
            (FieldKind::Text, Value::Bool(b)) => Self::Text(b.to_string()),
            (FieldKind::Number, Value::Number(n)) => n.as_f64().map_or(Self::Empty, Self::Number),
            (FieldKind::Number, Value::String(s)) => s
                .trim()
                .replace(',', "")
                .parse::<f64>()
                .map_or(Self::Empty, Self::Number),
            (FieldKind::Date, Value::String(s)) => parse_date(s).map_or(Self::Empty, Self::Date),
            (FieldKind::Date, Value::Number(n)) => n
                .as_i64()
                .and_then(DateTime::from_timestamp_millis)
                .map_or(Self::Empty, |dt| Self::Date(dt.naive_utc())),
            _ => Self::Empty,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Text form used for display, substring filtering and export
    pub fn display(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Text(s) => s.clone(),
            Self::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{n:.0}"),
            Self::Number(n) => n.to_string(),
            Self::Date(dt) if dt.time() == NaiveTime::MIN => dt.format("%Y-%m-%d").to_string(),
            Self::Date(dt) => dt.format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

/// Parse the date formats the listing sources are known to emit
pub fn parse_date(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y/%m/%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt);
        }
    }
    for format in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return Some(date.and_time(NaiveTime::MIN));
        }
    }
    None
}

/// One fetched record. Identity is the key, never the allocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    key: RowKey,
    values: BTreeMap<String, FieldValue>,
    /// Fields the schema does not declare, kept as received
    extra: Map<String, Value>,
}

impl Row {
    /// Build a row directly from typed values
    #[cfg(test)]
    pub fn new(key: impl Into<String>, values: impl IntoIterator<Item = (String, FieldValue)>) -> Self {
        Self {
            key: RowKey::new(key),
            values: values.into_iter().collect(),
            extra: Map::new(),
        }
    }

    /// Decode a JSON object against the schema
    pub fn decode(schema: &RowSchema, value: Value) -> Result<Self, RemoteError> {
        let Value::Object(mut object) = value else {
            return Err(RemoteError::InvalidRow("record is not a JSON object".to_string()));
        };

        let key = match object.get(&schema.key_field) {
            Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
            Some(Value::Number(n)) => n.to_string(),
            _ => {
                return Err(RemoteError::InvalidRow(format!(
                    "record has no '{}' key",
                    schema.key_field
                )))
            }
        };

        let mut values = BTreeMap::new();
        for field in &schema.fields {
            let value = object
                .remove(&field.name)
                .map(|raw| FieldValue::from_json(field.kind, &raw))
                .unwrap_or_default();
            values.insert(field.name.clone(), value);
        }

        Ok(Self {
            key: RowKey(key),
            values,
            extra: object,
        })
    }

    pub fn key(&self) -> &RowKey {
        &self.key
    }

    pub fn value(&self, field: &str) -> &FieldValue {
        self.values.get(field).unwrap_or(&EMPTY)
    }

    pub fn text(&self, field: &str) -> String {
        self.value(field).display()
    }

    /// Undeclared fields, preserved but never used for sorting or filtering
    pub fn extra(&self) -> &Map<String, Value> {
        &self.extra
    }

    /// Human-readable name for this row
    pub fn title(&self, schema: &RowSchema) -> String {
        schema
            .display_field
            .as_deref()
            .map(|field| self.text(field))
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| self.key.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_decode_known_and_unknown_fields() {
        let schema = RowSchema::cases();
        let row = Row::decode(
            &schema,
            json!({
                "caseId": "C-1",
                "ownerName": "Chen Wei",
                "amount": "1,200.50",
                "reportDate": "2024-03-05",
                "internalFlag": true
            }),
        )
        .unwrap();

        assert_eq!(row.key().as_str(), "C-1");
        assert_eq!(row.text("ownerName"), "Chen Wei");
        assert_eq!(row.value("amount"), &FieldValue::Number(1200.5));
        assert_eq!(row.text("reportDate"), "2024-03-05");
        assert!(row.value("policyNo").is_empty());
        assert_eq!(row.extra().get("internalFlag"), Some(&json!(true)));
        assert!(row.extra().get("ownerName").is_none());
    }

    #[test]
    fn test_decode_numeric_key() {
        let schema = RowSchema::cases();
        let row = Row::decode(&schema, json!({"caseId": 42})).unwrap();
        assert_eq!(row.key().as_str(), "42");
    }

    #[test]
    fn test_decode_rejects_missing_key() {
        let schema = RowSchema::cases();
        let err = Row::decode(&schema, json!({"ownerName": "x"})).unwrap_err();
        assert!(matches!(err, RemoteError::InvalidRow(_)));
        let err = Row::decode(&schema, json!({"caseId": "  "})).unwrap_err();
        assert!(matches!(err, RemoteError::InvalidRow(_)));
    }

    #[test]
    fn test_decode_rejects_non_object() {
        let schema = RowSchema::cases();
        assert!(Row::decode(&schema, json!(["C-1"])).is_err());
    }

    #[test]
    fn test_unparseable_values_become_empty() {
        assert_eq!(
            FieldValue::from_json(FieldKind::Number, &json!("n/a")),
            FieldValue::Empty
        );
        assert_eq!(
            FieldValue::from_json(FieldKind::Date, &json!("yesterday")),
            FieldValue::Empty
        );
        assert_eq!(FieldValue::from_json(FieldKind::Text, &json!("")), FieldValue::Empty);
    }

    #[test]
    fn test_parse_date_formats() {
        let midnight = NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_time(NaiveTime::MIN);
        assert_eq!(parse_date("2024-03-05"), Some(midnight));
        assert_eq!(parse_date("2024/03/05"), Some(midnight));
        assert_eq!(
            parse_date("2024-03-05 14:30:00").map(|d| d.format("%H:%M").to_string()),
            Some("14:30".to_string())
        );
        assert_eq!(
            parse_date("2024-03-05T14:30:00+08:00").map(|d| d.format("%H:%M").to_string()),
            Some("14:30".to_string())
        );
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("soon"), None);
    }

    #[test]
    fn test_date_from_epoch_millis() {
        let value = FieldValue::from_json(FieldKind::Date, &json!(0));
        assert_eq!(value.display(), "1970-01-01");
    }

    #[test]
    fn test_number_display() {
        assert_eq!(FieldValue::Number(12.0).display(), "12");
        assert_eq!(FieldValue::Number(12.25).display(), "12.25");
        assert_eq!(FieldValue::Empty.display(), "");
    }

    #[test]
    fn test_title_falls_back_to_key() {
        let schema = RowSchema::cases();
        let named = Row::decode(&schema, json!({"caseId": "C-1", "ownerName": "Lisa"})).unwrap();
        let unnamed = Row::decode(&schema, json!({"caseId": "C-2"})).unwrap();
        assert_eq!(named.title(&schema), "Lisa");
        assert_eq!(unnamed.title(&schema), "C-2");
    }

    #[test]
    fn test_schema_validation() {
        assert!(RowSchema::cases().validate().is_ok());
        assert!(RowSchema::assignees().validate().is_ok());

        let mut schema = RowSchema::cases();
        schema.key_field = "missing".to_string();
        assert!(schema.validate().is_err());

        let mut schema = RowSchema::cases();
        schema.display_field = Some("nope".to_string());
        assert!(schema.validate().is_err());

        let empty = RowSchema {
            key_field: "id".to_string(),
            display_field: None,
            fields: Vec::new(),
        };
        assert!(empty.validate().is_err());
    }

    #[test]
    fn test_schema_deserializes_with_default_kind() {
        let schema: RowSchema = serde_json::from_str(
            r#"{"key_field": "id", "fields": [{"name": "id", "label": "ID"}, {"name": "n", "label": "N", "kind": "number"}]}"#,
        )
        .unwrap();
        assert_eq!(schema.kind_of("id"), Some(FieldKind::Text));
        assert_eq!(schema.kind_of("n"), Some(FieldKind::Number));
        assert_eq!(schema.display_field, None);
    }
}
