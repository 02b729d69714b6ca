//! Stored document representation and dotted-path field access

use serde_json::{Map, Value};

/// A stored record: a JSON object keyed by field name
pub type Document = Map<String, Value>;

/// Identifier field present on every stored document
pub const ID_FIELD: &str = "_id";

/// Internal revision counter, `0` on insert and bumped on every update
pub const VERSION_FIELD: &str = "__v";

/// Resolve a (possibly dotted) field path inside a document
pub fn resolve<'a>(doc: &'a Document, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let mut current = doc.get(parts.next()?)?;
    for part in parts {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

/// Set a (possibly dotted) field path, creating intermediate objects
pub fn set_field(doc: &mut Document, path: &str, value: Value) {
    match path.split_once('.') {
        None => {
            doc.insert(path.to_string(), value);
        }
        Some((head, rest)) => {
            let entry = doc
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            if let Value::Object(child) = entry {
                set_field(child, rest, value);
            }
        }
    }
}

/// Remove a (possibly dotted) field path, returning the removed value
pub fn remove_field(doc: &mut Document, path: &str) -> Option<Value> {
    match path.split_once('.') {
        None => doc.remove(path),
        Some((head, rest)) => match doc.get_mut(head) {
            Some(Value::Object(child)) => remove_field(child, rest),
            _ => None,
        },
    }
}

/// Read the identifier of a stored document
pub fn document_id(doc: &Document) -> Option<&str> {
    doc.get(ID_FIELD).and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_resolve_top_level_and_nested() {
        let d = doc(json!({"name": "The Forest Hiker", "location": {"city": "Banff"}}));
        assert_eq!(resolve(&d, "name"), Some(&json!("The Forest Hiker")));
        assert_eq!(resolve(&d, "location.city"), Some(&json!("Banff")));
        assert_eq!(resolve(&d, "location.country"), None);
        assert_eq!(resolve(&d, "name.first"), None);
    }

    #[test]
    fn test_set_field_creates_parents() {
        let mut d = Document::new();
        set_field(&mut d, "a.b.c", json!(1));
        assert_eq!(Value::Object(d), json!({"a": {"b": {"c": 1}}}));
    }

    #[test]
    fn test_remove_field() {
        let mut d = doc(json!({"a": {"b": 1, "c": 2}, "d": 3}));
        assert_eq!(remove_field(&mut d, "a.b"), Some(json!(1)));
        assert_eq!(remove_field(&mut d, "d"), Some(json!(3)));
        assert_eq!(remove_field(&mut d, "missing"), None);
        assert_eq!(Value::Object(d), json!({"a": {"c": 2}}));
    }

    #[test]
    fn test_document_id() {
        let d = doc(json!({"_id": "tour_01h455vb4pex5vsknk084sn02q"}));
        assert_eq!(document_id(&d), Some("tour_01h455vb4pex5vsknk084sn02q"));
        assert_eq!(document_id(&Document::new()), None);
    }
}
