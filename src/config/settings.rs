//! Process settings from environment (and `.env` via dotenvy, loaded by the binary).

use crate::config::ResourceRegistry;
use crate::error::ConfigError;
use crate::query::FilterCombinator;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageKind {
    Postgres,
    Memory,
}

/// Which resource and fields back `POST /tokens/`.
#[derive(Clone, Debug)]
pub struct LoginSettings {
    pub resource: String,
    pub login_field: String,
    pub password_field: String,
}

impl Default for LoginSettings {
    fn default() -> Self {
        LoginSettings {
            resource: "users".into(),
            login_field: "email".into(),
            password_field: "password".into(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Settings {
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub bind_addr: String,
    pub storage: StorageKind,
    pub resources_path: Option<PathBuf>,
    pub filter_combinator: FilterCombinator,
    pub auto_migrate: bool,
    pub max_body_bytes: usize,
    pub token_ttl: Duration,
    pub login: LoginSettings,
}

impl LoginSettings {
    /// The login resource must exist with a queryable login field and a secret password field.
    pub fn check(&self, registry: &ResourceRegistry) -> Result<(), ConfigError> {
        let resource = registry.get(&self.resource).ok_or_else(|| {
            ConfigError::Validation(format!("login resource '{}' is not registered", self.resource))
        })?;
        if resource.queryable_field(&self.login_field).is_none() {
            return Err(ConfigError::Validation(format!(
                "login field '{}.{}' is missing or secret",
                self.resource, self.login_field
            )));
        }
        if !resource.field(&self.password_field).is_some_and(|f| f.secret) {
            return Err(ConfigError::Validation(format!(
                "password field '{}.{}' must be a secret field",
                self.resource, self.password_field
            )));
        }
        Ok(())
    }
}

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";
const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;
const DEFAULT_TOKEN_TTL_SECS: u64 = 5 * 24 * 60 * 60;

impl Settings {
    /// Defaults for everything but the token secret; in-memory storage.
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Settings {
            database_url: None,
            jwt_secret: jwt_secret.into(),
            bind_addr: DEFAULT_BIND_ADDR.into(),
            storage: StorageKind::Memory,
            resources_path: None,
            filter_combinator: FilterCombinator::Any,
            auto_migrate: true,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            token_ttl: Duration::from_secs(DEFAULT_TOKEN_TTL_SECS),
            login: LoginSettings::default(),
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(get: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| get(key).filter(|v| !v.trim().is_empty());

        let jwt_secret = get("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?;
        let mut settings = Settings::new(jwt_secret);

        settings.database_url = get("DATABASE_URL").or_else(|| {
            match (get("DB_USER"), get("DB_PASSWORD"), get("DB_HOST"), get("DB_NAME")) {
                (Some(user), Some(password), Some(host), Some(name)) => {
                    Some(format!("postgres://{}:{}@{}/{}", user, password, host, name))
                }
                _ => None,
            }
        });
        settings.storage = match get("STORAGE").as_deref().map(str::to_lowercase).as_deref() {
            None | Some("postgres") => StorageKind::Postgres,
            Some("memory") => StorageKind::Memory,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "STORAGE",
                    reason: format!("'{}' (expected postgres or memory)", other),
                })
            }
        };
        if settings.storage == StorageKind::Postgres && settings.database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }
        if let Some(addr) = get("BIND_ADDR") {
            settings.bind_addr = addr;
        }
        settings.resources_path = get("RESOURCES_PATH").map(PathBuf::from);
        if let Some(v) = get("FILTER_COMBINATOR") {
            settings.filter_combinator = v.parse().map_err(|reason| ConfigError::Invalid {
                name: "FILTER_COMBINATOR",
                reason,
            })?;
        }
        if let Some(v) = get("AUTO_MIGRATE") {
            settings.auto_migrate = parse_bool("AUTO_MIGRATE", &v)?;
        }
        if let Some(v) = get("MAX_BODY_BYTES") {
            settings.max_body_bytes = v.trim().parse().map_err(|_| ConfigError::Invalid {
                name: "MAX_BODY_BYTES",
                reason: format!("'{}' is not a byte count", v),
            })?;
        }
        if let Some(v) = get("TOKEN_TTL_SECS") {
            let secs: u64 = v.trim().parse().map_err(|_| ConfigError::Invalid {
                name: "TOKEN_TTL_SECS",
                reason: format!("'{}' is not a number of seconds", v),
            })?;
            settings.token_ttl = Duration::from_secs(secs);
        }
        if let Some(v) = get("LOGIN_RESOURCE") {
            settings.login.resource = v;
        }
        if let Some(v) = get("LOGIN_FIELD") {
            settings.login.login_field = v;
        }
        if let Some(v) = get("PASSWORD_FIELD") {
            settings.login.password_field = v;
        }
        Ok(settings)
    }
}

fn parse_bool(name: &'static str, v: &str) -> Result<bool, ConfigError> {
    match v.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            name,
            reason: format!("'{}' is not a boolean", v),
        }),
    }
}
