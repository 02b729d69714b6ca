//! Per-entity field registry
//!
//! A [`Schema`] declares every persisted field of an entity: its type,
//! default, normalisation (trim / lowercase) and validators. The registry is
//! the single place where caller input is cast to stored types, both for
//! document bodies and for query filters.
//!
//! # Example
//!
//! ```rust
//! use serde_json::json;
//! use tour_service::model::{FieldDef, Schema};
//!
//! let schema = Schema::new("Pet", "pets", "pet")
//!     .with_field(FieldDef::string("name").required("A pet needs a name").trim())
//!     .with_field(FieldDef::number("age").default_value(|| json!(0)).min(0.0, "Age cannot be negative"));
//!
//! let doc = schema.prepare_insert(json!({"name": "  Rex "})).unwrap();
//! assert_eq!(doc["name"], json!("Rex"));
//! assert_eq!(doc["age"], json!(0));
//!
//! let err = schema.prepare_insert(json!({"age": -1})).unwrap_err();
//! assert_eq!(err.errors.len(), 2);
//! ```

use std::fmt;

use chrono::DateTime;
use serde_json::Value;

use crate::store::{
    format_date, number_to_value, parse_date, Document, FilterCondition, FilterValue, QueryError,
    ID_FIELD,
};

/// Declared type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// UTF-8 string
    String,
    /// Number (integer or float)
    Number,
    /// Boolean
    Boolean,
    /// Timestamp, stored as a fixed-width UTC string
    Date,
    /// Ordered list of strings
    StringArray,
    /// Ordered list of timestamps
    DateArray,
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => write!(f, "string"),
            Self::Number => write!(f, "number"),
            Self::Boolean => write!(f, "boolean"),
            Self::Date => write!(f, "date"),
            Self::StringArray => write!(f, "string array"),
            Self::DateArray => write!(f, "date array"),
        }
    }
}

/// Predicate applied to string values
pub type StringValidator = fn(&str) -> bool;

/// Computes a derived, read-only attribute from a stored document
pub type VirtualFn = fn(&Document) -> Option<Value>;

/// Declaration of one persisted field
#[derive(Debug, Clone)]
pub struct FieldDef {
    /// Field name as stored
    pub name: &'static str,
    /// Declared type
    pub kind: FieldType,
    required: Option<&'static str>,
    default: Option<fn() -> Value>,
    unique: bool,
    trim: bool,
    lowercase: bool,
    min: Option<(f64, &'static str)>,
    max: Option<(f64, &'static str)>,
    min_length: Option<(usize, &'static str)>,
    max_length: Option<(usize, &'static str)>,
    allowed: Option<(&'static [&'static str], &'static str)>,
    validator: Option<(StringValidator, &'static str)>,
    hidden: bool,
    secret: bool,
    managed: bool,
}

impl FieldDef {
    /// Declare a field of the given type
    #[must_use]
    pub const fn new(name: &'static str, kind: FieldType) -> Self {
        Self {
            name,
            kind,
            required: None,
            default: None,
            unique: false,
            trim: false,
            lowercase: false,
            min: None,
            max: None,
            min_length: None,
            max_length: None,
            allowed: None,
            validator: None,
            hidden: false,
            secret: false,
            managed: false,
        }
    }

    #[must_use]
    pub const fn string(name: &'static str) -> Self {
        Self::new(name, FieldType::String)
    }

    #[must_use]
    pub const fn number(name: &'static str) -> Self {
        Self::new(name, FieldType::Number)
    }

    #[must_use]
    pub const fn boolean(name: &'static str) -> Self {
        Self::new(name, FieldType::Boolean)
    }

    #[must_use]
    pub const fn date(name: &'static str) -> Self {
        Self::new(name, FieldType::Date)
    }

    #[must_use]
    pub const fn string_array(name: &'static str) -> Self {
        Self::new(name, FieldType::StringArray)
    }

    #[must_use]
    pub const fn date_array(name: &'static str) -> Self {
        Self::new(name, FieldType::DateArray)
    }

    /// Reject documents missing this field, with the given message
    #[must_use]
    pub const fn required(mut self, message: &'static str) -> Self {
        self.required = Some(message);
        self
    }

    /// Value used when the field is absent on insert
    #[must_use]
    pub const fn default_value(mut self, default: fn() -> Value) -> Self {
        self.default = Some(default);
        self
    }

    /// Enforce uniqueness across the collection
    #[must_use]
    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Trim surrounding whitespace from string values
    #[must_use]
    pub const fn trim(mut self) -> Self {
        self.trim = true;
        self
    }

    /// Lowercase string values
    #[must_use]
    pub const fn lowercase(mut self) -> Self {
        self.lowercase = true;
        self
    }

    #[must_use]
    pub const fn min(mut self, bound: f64, message: &'static str) -> Self {
        self.min = Some((bound, message));
        self
    }

    #[must_use]
    pub const fn max(mut self, bound: f64, message: &'static str) -> Self {
        self.max = Some((bound, message));
        self
    }

    #[must_use]
    pub const fn min_length(mut self, bound: usize, message: &'static str) -> Self {
        self.min_length = Some((bound, message));
        self
    }

    #[must_use]
    pub const fn max_length(mut self, bound: usize, message: &'static str) -> Self {
        self.max_length = Some((bound, message));
        self
    }

    /// Restrict string values to a fixed set
    #[must_use]
    pub const fn one_of(mut self, values: &'static [&'static str], message: &'static str) -> Self {
        self.allowed = Some((values, message));
        self
    }

    /// Custom string predicate
    #[must_use]
    pub const fn validate(mut self, check: StringValidator, message: &'static str) -> Self {
        self.validator = Some((check, message));
        self
    }

    /// Leave the field out of query results unless selected by name
    #[must_use]
    pub const fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    /// Never returned, filtered on or sorted by, even when named explicitly
    #[must_use]
    pub const fn secret(mut self) -> Self {
        self.hidden = true;
        self.secret = true;
        self
    }

    /// Server-set field; values supplied by callers are discarded
    #[must_use]
    pub const fn managed(mut self) -> Self {
        self.managed = true;
        self
    }

    #[must_use]
    pub const fn is_unique(&self) -> bool {
        self.unique
    }

    #[must_use]
    pub const fn is_hidden(&self) -> bool {
        self.hidden
    }

    #[must_use]
    pub const fn is_secret(&self) -> bool {
        self.secret
    }

    #[must_use]
    pub const fn is_managed(&self) -> bool {
        self.managed
    }

    fn normalize_string(&self, raw: &str) -> String {
        let value = if self.trim { raw.trim() } else { raw };
        if self.lowercase {
            value.to_lowercase()
        } else {
            value.to_string()
        }
    }

    /// Cast a body value to the declared type
    fn cast_input(&self, value: Value) -> Result<Value, String> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        match self.kind {
            FieldType::String => self.cast_string(&value).map(Value::String),
            FieldType::Number => self.cast_number(&value),
            FieldType::Boolean => self.cast_boolean(&value).map(Value::Bool),
            FieldType::Date => self.cast_date(&value).map(Value::String),
            FieldType::StringArray => self.cast_each(value, |v| self.cast_string(v).map(Value::String)),
            FieldType::DateArray => self.cast_each(value, |v| self.cast_date(v).map(Value::String)),
        }
    }

    fn cast_failed(&self, expected: &str, value: &Value) -> String {
        format!("Cast to {expected} failed for value {value} at path \"{}\"", self.name)
    }

    fn cast_string(&self, value: &Value) -> Result<String, String> {
        match value {
            Value::String(s) => Ok(self.normalize_string(s)),
            Value::Number(n) => Ok(self.normalize_string(&n.to_string())),
            Value::Bool(b) => Ok(b.to_string()),
            other => Err(self.cast_failed("string", other)),
        }
    }

    fn cast_number(&self, value: &Value) -> Result<Value, String> {
        match value {
            Value::Number(_) => Ok(value.clone()),
            Value::String(s) if s.trim().is_empty() => Ok(Value::Null),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map(number_to_value)
                .ok_or_else(|| self.cast_failed("Number", value)),
            other => Err(self.cast_failed("Number", other)),
        }
    }

    fn cast_boolean(&self, value: &Value) -> Result<bool, String> {
        match value {
            Value::Bool(b) => Ok(*b),
            Value::Number(n) if n.as_f64() == Some(1.0) => Ok(true),
            Value::Number(n) if n.as_f64() == Some(0.0) => Ok(false),
            Value::String(s) => parse_bool(s).ok_or_else(|| self.cast_failed("Boolean", value)),
            other => Err(self.cast_failed("Boolean", other)),
        }
    }

    fn cast_date(&self, value: &Value) -> Result<String, String> {
        let parsed = match value {
            Value::String(s) => parse_date(s),
            Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
            _ => None,
        };
        parsed
            .map(|date| format_date(&date))
            .ok_or_else(|| self.cast_failed("Date", value))
    }

    fn cast_each(
        &self,
        value: Value,
        cast: impl Fn(&Value) -> Result<Value, String>,
    ) -> Result<Value, String> {
        match value {
            Value::Array(items) => items
                .iter()
                .map(cast)
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            Value::Object(_) => Err(self.cast_failed("Array", &value)),
            scalar => cast(&scalar).map(|v| Value::Array(vec![v])),
        }
    }

    /// Cast one raw query value to the declared type
    fn cast_filter_value(&self, value: FilterValue) -> Result<FilterValue, QueryError> {
        let raw = match value {
            FilterValue::String(raw) => raw,
            FilterValue::List(items) => {
                return items
                    .into_iter()
                    .map(|item| self.cast_filter_value(item))
                    .collect::<Result<Vec<_>, _>>()
                    .map(FilterValue::List);
            }
            typed => return Ok(typed),
        };

        let cast_error = |expected: &'static str, raw: &str| QueryError::Cast {
            field: self.name.to_string(),
            value: raw.to_string(),
            expected,
        };

        match self.kind {
            FieldType::String | FieldType::StringArray => {
                Ok(FilterValue::String(self.normalize_string(&raw)))
            }
            FieldType::Number => raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map(FilterValue::Number)
                .ok_or_else(|| cast_error("number", &raw)),
            FieldType::Boolean => parse_bool(&raw)
                .map(FilterValue::Boolean)
                .ok_or_else(|| cast_error("boolean", &raw)),
            FieldType::Date | FieldType::DateArray => parse_date(&raw)
                .map(FilterValue::Date)
                .ok_or_else(|| cast_error("date", &raw)),
        }
    }

    /// Run validators against a cast value; returns every failure message
    fn check(&self, value: Option<&Value>) -> Vec<String> {
        let present = match value {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) if s.is_empty() => None,
            Some(v) => Some(v),
        };

        let Some(value) = present else {
            return self
                .required
                .map(|message| vec![message.to_string()])
                .unwrap_or_default();
        };

        let mut failures = Vec::new();

        if let Some(n) = value.as_f64() {
            if let Some((bound, message)) = self.min {
                if n < bound {
                    failures.push(message.to_string());
                }
            }
            if let Some((bound, message)) = self.max {
                if n > bound {
                    failures.push(message.to_string());
                }
            }
        }

        if let Some(s) = value.as_str() {
            let length = s.chars().count();
            if let Some((bound, message)) = self.min_length {
                if length < bound {
                    failures.push(message.to_string());
                }
            }
            if let Some((bound, message)) = self.max_length {
                if length > bound {
                    failures.push(message.to_string());
                }
            }
            if let Some((values, message)) = self.allowed {
                if !values.contains(&s) {
                    failures.push(message.to_string());
                }
            }
            if let Some((check, message)) = self.validator {
                if !check(s) {
                    failures.push(message.to_string());
                }
            }
        }

        failures
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

/// One failed field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Field that failed
    pub path: String,
    /// Validator message
    pub message: String,
}

/// Document failed schema validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Entity being validated (e.g. "Tour")
    pub entity: String,
    /// Every failure, in field declaration order
    pub errors: Vec<FieldError>,
}

impl ValidationError {
    /// A body that is not a JSON object
    pub fn not_an_object(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            errors: vec![FieldError {
                path: "body".to_string(),
                message: "Expected a JSON object".to_string(),
            }],
        }
    }

    /// Messages only, in order
    #[must_use]
    pub fn messages(&self) -> Vec<&str> {
        self.errors.iter().map(|e| e.message.as_str()).collect()
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} validation failed: ", self.entity)?;
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", error.path, error.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// Derived attribute computed on read
#[derive(Debug, Clone)]
pub struct Virtual {
    /// Output name
    pub name: &'static str,
    /// Computation; `None` leaves the attribute out
    pub compute: VirtualFn,
}

/// Field registry for one entity
#[derive(Debug, Clone)]
pub struct Schema {
    entity: &'static str,
    collection: &'static str,
    id_prefix: &'static str,
    fields: Vec<FieldDef>,
    virtuals: Vec<Virtual>,
}

impl Schema {
    /// Start an empty schema
    ///
    /// `id_prefix` is the TypeID prefix of generated document identifiers.
    #[must_use]
    pub const fn new(entity: &'static str, collection: &'static str, id_prefix: &'static str) -> Self {
        Self {
            entity,
            collection,
            id_prefix,
            fields: Vec::new(),
            virtuals: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    #[must_use]
    pub fn with_virtual(mut self, name: &'static str, compute: VirtualFn) -> Self {
        self.virtuals.push(Virtual { name, compute });
        self
    }

    #[must_use]
    pub const fn entity(&self) -> &'static str {
        self.entity
    }

    #[must_use]
    pub const fn collection(&self) -> &'static str {
        self.collection
    }

    #[must_use]
    pub const fn id_prefix(&self) -> &'static str {
        self.id_prefix
    }

    #[must_use]
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Names of fields carrying a unique index
    pub fn unique_fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().filter(|f| f.unique).map(|f| f.name)
    }

    /// Names of fields left out of results unless selected
    #[must_use]
    pub fn hidden_fields(&self) -> Vec<&'static str> {
        self.fields.iter().filter(|f| f.hidden).map(|f| f.name).collect()
    }

    /// Names of fields that never leave the store
    #[must_use]
    pub fn secret_fields(&self) -> Vec<&'static str> {
        self.fields.iter().filter(|f| f.secret).map(|f| f.name).collect()
    }

    /// Whether a field path starts at a secret field
    #[must_use]
    pub fn is_secret_path(&self, path: &str) -> bool {
        let root = path.split('.').next().unwrap_or_default();
        self.field(root).is_some_and(FieldDef::is_secret)
    }

    fn body(&self, input: Value) -> Result<Document, ValidationError> {
        match input {
            Value::Object(map) => Ok(map),
            _ => Err(ValidationError::not_an_object(self.entity)),
        }
    }

    fn fail(&self, errors: Vec<FieldError>) -> Result<(), ValidationError> {
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationError {
                entity: self.entity.to_string(),
                errors,
            })
        }
    }

    /// Cast, default and validate a new document
    ///
    /// Unknown keys, identifiers and managed fields in the input are dropped.
    /// Managed fields receive their defaults.
    pub fn prepare_insert(&self, input: Value) -> Result<Document, ValidationError> {
        let mut input = self.body(input)?;
        let mut doc = Document::new();
        let mut errors = Vec::new();

        for field in &self.fields {
            let supplied = input.remove(field.name).filter(|_| !field.managed);
            match supplied.map(|value| field.cast_input(value)) {
                Some(Ok(Value::Null)) | None => {}
                Some(Ok(value)) => {
                    doc.insert(field.name.to_string(), value);
                }
                Some(Err(message)) => errors.push(FieldError {
                    path: field.name.to_string(),
                    message,
                }),
            }
            if !doc.contains_key(field.name) {
                if let Some(default) = field.default {
                    doc.insert(field.name.to_string(), default());
                }
            }
        }

        if !input.is_empty() {
            tracing::debug!(
                entity = self.entity,
                ignored = ?input.keys().collect::<Vec<_>>(),
                "dropping undeclared fields"
            );
        }

        for field in &self.fields {
            if errors.iter().any(|e| e.path == field.name) {
                continue;
            }
            for message in field.check(doc.get(field.name)) {
                errors.push(FieldError {
                    path: field.name.to_string(),
                    message,
                });
            }
        }

        self.fail(errors)?;
        Ok(doc)
    }

    /// Merge a partial update into a stored document and validate it
    ///
    /// Only the fields present in the patch are validated. A `null` value
    /// removes the field, which then fails if the field is required.
    pub fn prepare_update(&self, existing: Document, patch: Value) -> Result<Document, ValidationError> {
        let patch = self.body(patch)?;
        let mut doc = existing;
        let mut errors = Vec::new();
        let mut touched = Vec::new();

        for (key, value) in patch {
            let Some(field) = self.field(&key) else {
                continue;
            };
            if field.managed {
                continue;
            }
            match field.cast_input(value) {
                Ok(Value::Null) => {
                    doc.remove(field.name);
                    touched.push(field);
                }
                Ok(value) => {
                    doc.insert(field.name.to_string(), value);
                    touched.push(field);
                }
                Err(message) => errors.push(FieldError {
                    path: field.name.to_string(),
                    message,
                }),
            }
        }

        for field in touched {
            for message in field.check(doc.get(field.name)) {
                errors.push(FieldError {
                    path: field.name.to_string(),
                    message,
                });
            }
        }

        self.fail(errors)?;
        Ok(doc)
    }

    /// Validate a raw filter against the registry and cast its value
    pub fn cast_filter(&self, condition: FilterCondition) -> Result<FilterCondition, QueryError> {
        if condition.field == ID_FIELD {
            return Ok(condition);
        }
        let root = condition.field.split('.').next().unwrap_or_default();
        let field = self
            .field(root)
            .filter(|f| !f.secret)
            .ok_or_else(|| QueryError::UnknownField(condition.field.clone()))?;
        let value = field.cast_filter_value(condition.value)?;
        Ok(FilterCondition {
            field: condition.field,
            operator: condition.operator,
            value,
        })
    }

    /// Add virtual attributes to a document
    pub fn apply_virtuals(&self, doc: &mut Document) {
        for virtual_field in &self.virtuals {
            if let Some(value) = (virtual_field.compute)(doc) {
                doc.insert(virtual_field.name.to_string(), value);
            }
        }
    }

    /// Shape a stored document for output: hidden fields removed, virtuals added
    #[must_use]
    pub fn present(&self, mut doc: Document) -> Document {
        for field in self.fields.iter().filter(|f| f.hidden) {
            doc.remove(field.name);
        }
        self.apply_virtuals(&mut doc);
        doc
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::FilterOperator;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn has_at(s: &str) -> bool {
        s.contains('@')
    }

    fn schema() -> Schema {
        Schema::new("Thing", "things", "thing")
            .with_field(
                FieldDef::string("name")
                    .required("A thing must have a name")
                    .unique()
                    .trim()
                    .min_length(3, "Name too short")
                    .max_length(10, "Name too long"),
            )
            .with_field(FieldDef::number("score").default_value(|| json!(4.5)).min(1.0, "Too low").max(5.0, "Too high"))
            .with_field(FieldDef::string("level").one_of(&["easy", "hard"], "Bad level"))
            .with_field(FieldDef::string("contact").lowercase().validate(has_at, "Bad contact"))
            .with_field(FieldDef::boolean("secret").default_value(|| json!(false)))
            .with_field(FieldDef::string_array("tags"))
            .with_field(FieldDef::date_array("dates"))
            .with_field(FieldDef::date("createdAt").managed().hidden().default_value(|| json!("2020-01-01T00:00:00.000Z")))
            .with_field(FieldDef::string("pin").secret())
            .with_virtual("doubled", |doc| doc.get("score").and_then(Value::as_f64).map(|s| number_to_value(s * 2.0)))
    }

    #[test]
    fn test_insert_applies_defaults_and_normalisation() {
        let doc = schema()
            .prepare_insert(json!({
                "name": "  Widget ",
                "contact": "Ops@Example.COM",
                "tags": "solo",
                "dates": ["2021-04-25,10:00", "2021-07-20"],
                "createdAt": "1999-01-01",
                "unknown": 1
            }))
            .unwrap();
        assert_eq!(doc["name"], json!("Widget"));
        assert_eq!(doc["score"], json!(4.5));
        assert_eq!(doc["secret"], json!(false));
        assert_eq!(doc["contact"], json!("ops@example.com"));
        assert_eq!(doc["tags"], json!(["solo"]));
        assert_eq!(
            doc["dates"],
            json!(["2021-04-25T10:00:00.000Z", "2021-07-20T00:00:00.000Z"])
        );
        assert_eq!(doc["createdAt"], json!("2020-01-01T00:00:00.000Z"));
        assert!(!doc.contains_key("unknown"));
    }

    #[test]
    fn test_insert_casts_numeric_strings() {
        let doc = schema().prepare_insert(json!({"name": "Widget", "score": "3"})).unwrap();
        assert_eq!(doc["score"], json!(3));
    }

    #[test]
    fn test_insert_collects_every_failure() {
        let err = schema()
            .prepare_insert(json!({"score": 9, "level": "medium", "contact": "nobody"}))
            .unwrap_err();
        assert_eq!(err.entity, "Thing");
        assert_eq!(
            err.messages(),
            vec!["A thing must have a name", "Too high", "Bad level", "Bad contact"]
        );
        assert!(err.to_string().starts_with("Thing validation failed: name: A thing must have a name"));
    }

    #[test]
    fn test_insert_reports_cast_failures() {
        let err = schema()
            .prepare_insert(json!({"name": "Widget", "score": "lots", "secret": "maybe"}))
            .unwrap_err();
        assert_eq!(err.errors.len(), 2);
        assert_eq!(err.errors[0].path, "score");
        assert!(err.errors[0].message.starts_with("Cast to Number failed"));
        assert_eq!(err.errors[1].path, "secret");
    }

    #[test]
    fn test_insert_length_bounds() {
        let short = schema().prepare_insert(json!({"name": "ab"})).unwrap_err();
        assert_eq!(short.messages(), vec!["Name too short"]);
        let long = schema().prepare_insert(json!({"name": "abcdefghijk"})).unwrap_err();
        assert_eq!(long.messages(), vec!["Name too long"]);
    }

    #[test]
    fn test_insert_requires_object() {
        let err = schema().prepare_insert(json!([1, 2])).unwrap_err();
        assert_eq!(err.errors[0].path, "body");
    }

    #[test]
    fn test_update_validates_only_patched_fields() {
        let s = schema();
        let existing = s.prepare_insert(json!({"name": "Widget"})).unwrap();

        let updated = s
            .prepare_update(existing.clone(), json!({"score": 2, "createdAt": "2030-01-01"}))
            .unwrap();
        assert_eq!(updated["score"], json!(2));
        assert_eq!(updated["createdAt"], existing["createdAt"]);

        let err = s.prepare_update(existing.clone(), json!({"score": 0})).unwrap_err();
        assert_eq!(err.messages(), vec!["Too low"]);

        let err = s.prepare_update(existing, json!({"name": null})).unwrap_err();
        assert_eq!(err.messages(), vec!["A thing must have a name"]);
    }

    #[test]
    fn test_cast_filter() {
        let s = schema();
        let cast = s.cast_filter(FilterCondition::gte("score", "4.5")).unwrap();
        assert_eq!(cast.value, FilterValue::Number(4.5));
        assert_eq!(cast.operator, FilterOperator::GreaterThanOrEqual);

        let cast = s.cast_filter(FilterCondition::eq("secret", "true")).unwrap();
        assert_eq!(cast.value, FilterValue::Boolean(true));

        let cast = s.cast_filter(FilterCondition::lt("dates", "2021-06-01")).unwrap();
        assert_eq!(
            cast.value,
            FilterValue::Date(Utc.with_ymd_and_hms(2021, 6, 1, 0, 0, 0).unwrap())
        );

        let cast = s.cast_filter(FilterCondition::eq("contact", "A@B.C")).unwrap();
        assert_eq!(cast.value, FilterValue::String("a@b.c".into()));

        let list = FilterCondition::in_list("score", vec!["1".into(), "2".into()]);
        let cast = s.cast_filter(list).unwrap();
        assert_eq!(
            cast.value,
            FilterValue::List(vec![FilterValue::Number(1.0), FilterValue::Number(2.0)])
        );
    }

    #[test]
    fn test_cast_filter_rejects_bad_input() {
        let s = schema();
        assert_eq!(
            s.cast_filter(FilterCondition::eq("score", "abc")).unwrap_err(),
            QueryError::Cast {
                field: "score".into(),
                value: "abc".into(),
                expected: "number"
            }
        );
        assert_eq!(
            s.cast_filter(FilterCondition::eq("duration[foo]", "5")).unwrap_err(),
            QueryError::UnknownField("duration[foo]".into())
        );
        assert!(s.cast_filter(FilterCondition::eq("_id", "anything")).is_ok());
    }

    #[test]
    fn test_cast_filter_rejects_secret_fields() {
        let s = schema();
        assert_eq!(
            s.cast_filter(FilterCondition::eq("pin", "1234")).unwrap_err(),
            QueryError::UnknownField("pin".into())
        );
        assert_eq!(
            s.cast_filter(FilterCondition::gte("pin.length", "1")).unwrap_err(),
            QueryError::UnknownField("pin.length".into())
        );
    }

    #[test]
    fn test_present_hides_and_adds_virtuals() {
        let s = schema();
        let doc = s.prepare_insert(json!({"name": "Widget", "score": 2, "pin": "1234"})).unwrap();
        assert_eq!(doc["pin"], json!("1234"));
        let shown = s.present(doc);
        assert!(!shown.contains_key("createdAt"));
        assert!(!shown.contains_key("pin"));
        assert_eq!(shown["doubled"], json!(4));
    }

    #[test]
    fn test_registry_queries() {
        let s = schema();
        assert_eq!(s.unique_fields().collect::<Vec<_>>(), vec!["name"]);
        assert_eq!(s.hidden_fields(), vec!["createdAt", "pin"]);
        assert_eq!(s.secret_fields(), vec!["pin"]);
        assert!(s.is_secret_path("pin"));
        assert!(!s.is_secret_path("createdAt"));
        assert!(s.field("tags").is_some());
        assert!(s.field("nope").is_none());
        assert_eq!(s.collection(), "things");
        assert_eq!(s.id_prefix(), "thing");
    }
}
