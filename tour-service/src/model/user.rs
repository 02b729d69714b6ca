//! User model
//!
//! Passwords are stored as given. There is no hashing and no check that
//! `passwordConfirm` matches `password`; both fields are secret, so no
//! query can return, filter on or sort by them.

use std::sync::{Arc, LazyLock};

use regex::Regex;

use crate::store::DocumentStore;

use super::hooks::{HookPipeline, QueryTimer};
use super::repository::ModelRepository;
use super::schema::{FieldDef, Schema};

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$")
        .expect("email regex is valid")
});

/// Minimum password length
pub const PASSWORD_MIN_LENGTH: usize = 8;

/// Whether a value looks like an email address
#[must_use]
pub fn is_email(value: &str) -> bool {
    EMAIL_PATTERN.is_match(value)
}

/// Field registry for users
#[must_use]
pub fn user_schema() -> Schema {
    Schema::new("User", "users", "user")
        .with_field(
            FieldDef::string("name")
                .required("A user must have a name")
                .trim(),
        )
        .with_field(
            FieldDef::string("email")
                .required("A user must have an email")
                .unique()
                .trim()
                .lowercase()
                .validate(is_email, "Please provide a valid email"),
        )
        .with_field(FieldDef::string("photo"))
        .with_field(
            FieldDef::string("password")
                .required("Please enter a password")
                .min_length(PASSWORD_MIN_LENGTH, "A password must have at least 8 characters")
                .secret(),
        )
        .with_field(
            FieldDef::string("passwordConfirm")
                .required("Please confirm the password")
                .secret(),
        )
}

/// Repository for users
pub type UserRepository<S> = ModelRepository<S>;

/// Build the user repository over a store
pub fn user_repository<S: DocumentStore>(store: Arc<S>) -> UserRepository<S> {
    ModelRepository::new(store, user_schema(), HookPipeline::new().with_query_hook(QueryTimer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RepositoryErrorKind;
    use crate::store::{FindQuery, MemoryStore};
    use serde_json::json;

    async fn repository() -> UserRepository<MemoryStore> {
        let repo = user_repository(Arc::new(MemoryStore::new("test")));
        repo.init().await.unwrap();
        repo
    }

    #[test]
    fn test_is_email() {
        assert!(is_email("jonas@example.com"));
        assert!(is_email("a.b+c@mail.example.co.uk"));
        assert!(!is_email("jonas"));
        assert!(!is_email("jonas@"));
        assert!(!is_email("jonas@example"));
        assert!(!is_email("jo nas@example.com"));
    }

    #[tokio::test]
    async fn test_create_user_normalises_and_hides_passwords() {
        let repo = repository().await;
        let created = repo
            .create(json!({
                "name": " Jonas ",
                "email": "Jonas@Example.COM",
                "password": "pass1234",
                "passwordConfirm": "pass1234",
            }))
            .await
            .unwrap();
        assert_eq!(created["name"], json!("Jonas"));
        assert_eq!(created["email"], json!("jonas@example.com"));
        assert!(!created.contains_key("password"));
        assert!(!created.contains_key("passwordConfirm"));
        assert!(created["_id"].as_str().unwrap().starts_with("user_"));

        let listed = repo.find(FindQuery::new()).await.unwrap();
        assert!(!listed[0].contains_key("password"));
    }

    #[tokio::test]
    async fn test_create_user_rejects_bad_input() {
        let repo = repository().await;
        let err = repo
            .create(json!({"name": "Jonas", "email": "nope", "password": "short", "passwordConfirm": "short"}))
            .await
            .unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::ValidationFailed);
        assert!(err.message.contains("Please provide a valid email"));
        assert!(err.message.contains("at least 8 characters"));
    }

    #[tokio::test]
    async fn test_duplicate_email_differs_only_in_case() {
        let repo = repository().await;
        let user = json!({"name": "A", "email": "a@b.io", "password": "pass1234", "passwordConfirm": "pass1234"});
        repo.create(user).await.unwrap();
        let dup = json!({"name": "B", "email": "A@B.IO", "password": "pass1234", "passwordConfirm": "pass1234"});
        assert_eq!(
            repo.create(dup).await.unwrap_err().kind,
            RepositoryErrorKind::AlreadyExists
        );
    }
}
