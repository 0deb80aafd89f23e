//! Load resource configs from a JSON file or the built-in set, and resolve them into a registry.

use crate::config::resolved::{FieldSpec, Operation, ResourceRegistry, ResourceSchema, ID_FIELD};
use crate::config::types::*;
use crate::config::validate;
use crate::error::ConfigError;
use std::path::Path;

/// Build the resource registry from configs (validates first).
pub fn resolve(configs: &[ResourceConfig]) -> Result<ResourceRegistry, ConfigError> {
    validate(configs)?;

    let mut resources = Vec::with_capacity(configs.len());
    for cfg in configs {
        let mut fields = Vec::with_capacity(cfg.fields.len() + 1);
        fields.push(FieldSpec {
            name: ID_FIELD.to_string(),
            kind: FieldKind::Integer,
            default: None,
            required: false,
            secret: false,
        });
        for f in cfg.fields.iter().filter(|f| f.name != ID_FIELD) {
            let default = match &f.default {
                Some(d) => Some(f.kind.coerce_json(d).ok_or_else(|| {
                    ConfigError::Validation(format!("default for '{}.{}'", cfg.name, f.name))
                })?),
                None => None,
            };
            fields.push(FieldSpec {
                name: f.name.clone(),
                kind: f.kind,
                default,
                required: f.required,
                secret: f.secret,
            });
        }

        let operations = match &cfg.operations {
            Some(ops) => ops.iter().filter_map(|o| Operation::parse(o)).collect(),
            None => Operation::ALL.to_vec(),
        };

        resources.push(ResourceSchema {
            name: cfg.name.clone(),
            path_segment: cfg.path_segment.clone().unwrap_or_else(|| cfg.name.clone()),
            table: cfg.table.clone().unwrap_or_else(|| cfg.name.clone()),
            fields,
            render_fields: cfg.render_fields.clone(),
            operations,
        });
    }

    Ok(ResourceRegistry::from_resources(resources))
}

/// Read a JSON array of resource configs.
pub async fn load_from_path(path: &Path) -> Result<Vec<ResourceConfig>, ConfigError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
    serde_json::from_str(&raw).map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))
}

/// Users and projects.
pub fn builtin_resources() -> Vec<ResourceConfig> {
    vec![
        builtin(
            "users",
            vec![
                string_field("first_name", false, false),
                string_field("last_name", false, false),
                string_field("email", true, false),
                string_field("password", true, true),
            ],
            &["id", "first_name", "last_name"],
        ),
        builtin(
            "projects",
            vec![string_field("name", true, false)],
            &["id", "name"],
        ),
    ]
}

fn builtin(name: &str, fields: Vec<FieldConfig>, render: &[&str]) -> ResourceConfig {
    ResourceConfig {
        name: name.to_string(),
        path_segment: None,
        table: None,
        operations: None,
        fields,
        render_fields: render.iter().map(|f| f.to_string()).collect(),
    }
}

fn string_field(name: &str, required: bool, secret: bool) -> FieldConfig {
    FieldConfig {
        name: name.to_string(),
        kind: FieldKind::String,
        default: None,
        required,
        secret,
    }
}
