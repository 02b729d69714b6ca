//! Development data import
//!
//! Seed files hold a JSON array of documents. Each one goes through the
//! repository, so defaults, validation and save hooks apply exactly as
//! they do for `POST` requests.

use std::path::Path;

use serde_json::Value;

use crate::error::{Error, Result};
use crate::model::ModelRepository;
use crate::store::DocumentStore;

/// Import every document in a JSON array file
///
/// Stops at the first rejected document; earlier documents stay imported.
pub async fn import_file<S: DocumentStore>(
    repository: &ModelRepository<S>,
    path: impl AsRef<Path>,
) -> Result<usize> {
    let path = path.as_ref();
    let raw = tokio::fs::read_to_string(path).await?;
    let docs = parse_documents(&raw)
        .map_err(|e| Error::Seed(format!("{}: {}", path.display(), e)))?;

    let imported = import_documents(repository, docs).await?;
    tracing::info!(
        path = %path.display(),
        collection = repository.schema().collection(),
        imported,
        "Seed data imported"
    );
    Ok(imported)
}

/// Create each document in order
pub async fn import_documents<S: DocumentStore>(
    repository: &ModelRepository<S>,
    docs: Vec<Value>,
) -> Result<usize> {
    let mut imported = 0;
    for (index, doc) in docs.into_iter().enumerate() {
        repository
            .create(doc)
            .await
            .map_err(|e| Error::Seed(format!("document {}: {}", index, e.message)))?;
        imported += 1;
    }
    Ok(imported)
}

fn parse_documents(raw: &str) -> std::result::Result<Vec<Value>, String> {
    match serde_json::from_str::<Value>(raw).map_err(|e| e.to_string())? {
        Value::Array(docs) => Ok(docs),
        _ => Err("expected a JSON array of documents".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::Arc;

    use super::*;
    use crate::model::tour_repository;
    use crate::store::{FindQuery, MemoryStore};
    use serde_json::json;

    fn tour(name: &str) -> Value {
        json!({
            "name": name,
            "duration": 5,
            "maxGroupSize": 25,
            "difficulty": "easy",
            "price": 397,
            "summary": "Breathtaking hike through the Canadian Banff National Park",
            "imageCover": "tour-1-cover.jpg",
            "startDates": ["2021-04-25,10:00", "2021-07-20,10:00"],
        })
    }

    #[tokio::test]
    async fn test_import_file_runs_hooks() {
        let repo = tour_repository(Arc::new(MemoryStore::new("seed")));
        repo.init().await.unwrap();

        let mut file = tempfile::NamedTempFile::new().unwrap();
        let docs = json!([tour("The Forest Hiker"), tour("The Sea Explorer")]);
        write!(file, "{}", docs).unwrap();

        let imported = import_file(&repo, file.path()).await.unwrap();
        assert_eq!(imported, 2);

        let stored = repo.find(FindQuery::new()).await.unwrap();
        assert_eq!(stored.len(), 2);
        assert!(stored.iter().all(|doc| doc.contains_key("slug")));
    }

    #[tokio::test]
    async fn test_import_stops_at_invalid_document() {
        let repo = tour_repository(Arc::new(MemoryStore::new("seed")));
        repo.init().await.unwrap();

        let err = import_documents(
            &repo,
            vec![tour("The Forest Hiker"), json!({"name": "No details"})],
        )
        .await
        .unwrap_err();

        assert!(err.to_string().starts_with("Seed error: document 1:"));
        assert_eq!(repo.count(Vec::new()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_import_file_rejects_non_array() {
        let repo = tour_repository(Arc::new(MemoryStore::new("seed")));
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{\"name\": \"x\"}}").unwrap();

        let err = import_file(&repo, file.path()).await.unwrap_err();
        assert!(matches!(err, Error::Seed(_)));
    }

    #[tokio::test]
    async fn test_import_missing_file_is_io_error() {
        let repo = tour_repository(Arc::new(MemoryStore::new("seed")));
        let err = import_file(&repo, "/nonexistent/tours.json").await.unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
