//! Argon2 hashing for secret fields. The async entry points run Argon2 on the
//! blocking pool so request workers stay free.

use crate::config::ResourceSchema;
use crate::error::AppError;
use crate::store::Row;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use serde_json::Value;

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Unexpected(format!("password hashing: {}", e)))
}

/// False for a wrong password and for a stored value that is not an Argon2 hash.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// [`verify_password`] on the blocking pool.
pub async fn check_password(password: String, hash: String) -> Result<bool, AppError> {
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| AppError::Unexpected(format!("password check task: {}", e)))
}

/// Replace every non-null secret field in `values` with its hash.
pub async fn hash_secret_fields(resource: &ResourceSchema, values: &mut Row) -> Result<(), AppError> {
    let plain: Vec<(String, String)> = resource
        .fields
        .iter()
        .filter(|f| f.secret)
        .filter_map(|f| match values.get(&f.name) {
            Some(Value::String(p)) => Some((f.name.clone(), p.clone())),
            _ => None,
        })
        .collect();
    if plain.is_empty() {
        return Ok(());
    }
    let hashed = tokio::task::spawn_blocking(move || {
        plain
            .into_iter()
            .map(|(name, p)| hash_password(&p).map(|h| (name, h)))
            .collect::<Result<Vec<_>, AppError>>()
    })
    .await
    .map_err(|e| AppError::Unexpected(format!("password hashing task: {}", e)))??;
    for (name, hash) in hashed {
        values.insert(name, Value::String(hash));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{builtin_resources, resolve};
    use serde_json::json;

    #[test]
    fn hash_then_verify() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("wrong", &hash));
        assert!(!verify_password("correct horse", "correct horse"));
    }

    #[tokio::test]
    async fn check_password_off_the_runtime() {
        let hash = hash_password("pw").unwrap();
        assert!(check_password("pw".into(), hash.clone()).await.unwrap());
        assert!(!check_password("nope".into(), hash).await.unwrap());
    }

    #[tokio::test]
    async fn only_secret_fields_are_hashed() {
        let registry = resolve(&builtin_resources()).unwrap();
        let users = registry.get("users").unwrap();
        let mut values = json!({ "email": "a@b.c", "password": "pw" })
            .as_object()
            .cloned()
            .unwrap();
        hash_secret_fields(users, &mut values).await.unwrap();
        assert_eq!(values["email"], "a@b.c");
        let stored = values["password"].as_str().unwrap();
        assert_ne!(stored, "pw");
        assert!(verify_password("pw", stored));
    }
}
