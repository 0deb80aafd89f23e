//! Resource config validation: field sets, render whitelist, paths, operations.

use crate::config::{FieldKind, Operation, ResourceConfig, ID_FIELD};
use crate::error::ConfigError;
use std::collections::HashSet;

/// Paths taken by the fixed routes.
const RESERVED_PATHS: [&str; 5] = ["tokens", "health", "ready", "version", "docs"];

/// Characters allowed in a path segment; anything else could read as a route parameter.
fn is_path_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')
}

pub fn validate(configs: &[ResourceConfig]) -> Result<(), ConfigError> {
    let mut names = HashSet::new();
    let mut paths = HashSet::new();

    for r in configs {
        if r.name.is_empty() {
            return Err(ConfigError::Validation("resource name must not be empty".into()));
        }
        if !names.insert(r.name.as_str()) {
            return Err(ConfigError::Duplicate {
                kind: "resource",
                name: r.name.clone(),
            });
        }
        let path = r.path_segment.as_deref().unwrap_or(&r.name);
        if path.is_empty() || !path.chars().all(is_path_char) {
            return Err(ConfigError::Validation(format!(
                "resource '{}': invalid path segment '{}'",
                r.name, path
            )));
        }
        if RESERVED_PATHS.contains(&path) {
            return Err(ConfigError::Validation(format!(
                "resource '{}': path segment '{}' is reserved",
                r.name, path
            )));
        }
        if !paths.insert(path) {
            return Err(ConfigError::Duplicate {
                kind: "path segment",
                name: path.to_string(),
            });
        }

        let mut fields = HashSet::new();
        for f in &r.fields {
            if !fields.insert(f.name.as_str()) {
                return Err(ConfigError::Duplicate {
                    kind: "field",
                    name: format!("{}.{}", r.name, f.name),
                });
            }
            if f.name == ID_FIELD && (f.kind != FieldKind::Integer || f.secret) {
                return Err(ConfigError::Validation(format!(
                    "resource '{}': '{}' must be a plain integer field",
                    r.name, ID_FIELD
                )));
            }
            if f.secret && f.kind != FieldKind::String {
                return Err(ConfigError::Validation(format!(
                    "resource '{}': secret field '{}' must be a string",
                    r.name, f.name
                )));
            }
            if let Some(d) = &f.default {
                if f.kind.coerce_json(d).is_none() {
                    return Err(ConfigError::Validation(format!(
                        "resource '{}': default for '{}' is not a valid {}",
                        r.name,
                        f.name,
                        f.kind.as_str()
                    )));
                }
            }
        }

        for name in &r.render_fields {
            if name == ID_FIELD {
                continue;
            }
            let Some(f) = r.fields.iter().find(|f| f.name == *name) else {
                return Err(ConfigError::UnknownRenderField {
                    resource: r.name.clone(),
                    field: name.clone(),
                });
            };
            if f.secret {
                return Err(ConfigError::Validation(format!(
                    "resource '{}': secret field '{}' cannot be rendered",
                    r.name, name
                )));
            }
        }

        if let Some(ops) = &r.operations {
            for op in ops {
                if Operation::parse(op).is_none() {
                    return Err(ConfigError::Validation(format!(
                        "resource '{}': unknown operation '{}'",
                        r.name, op
                    )));
                }
            }
        }
    }

    Ok(())
}
