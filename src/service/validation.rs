//! Request payload validation and coercion against a resource schema.
//!
//! Unknown fields are rejected. The identity field is dropped before anything else.

use crate::config::{FieldSpec, ResourceSchema, ID_FIELD};
use crate::error::AppError;
use crate::store::Row;
use serde_json::Value;

pub struct PayloadValidator;

impl PayloadValidator {
    /// Full payload for create: required fields present and non-null, defaults applied.
    pub fn validate_create(resource: &ResourceSchema, body: Row) -> Result<Row, AppError> {
        let body = Self::known_fields(resource, body)?;
        let mut out = Row::with_capacity(body.len());
        for f in resource.data_fields() {
            let v = match body.get(&f.name) {
                Some(v) => coerce(f, v)?,
                None => match &f.default {
                    Some(d) => d.clone(),
                    None if f.required => {
                        return Err(AppError::Validation(format!("{} is required", f.name)))
                    }
                    None => continue,
                },
            };
            if v.is_null() && f.required {
                return Err(AppError::Validation(format!("{} is required", f.name)));
            }
            out.insert(f.name.clone(), v);
        }
        Ok(out)
    }

    /// Partial payload for update: only present fields, each coerced. Required fields may not be nulled.
    pub fn validate_update(resource: &ResourceSchema, body: Row) -> Result<Row, AppError> {
        let body = Self::known_fields(resource, body)?;
        let mut out = Row::with_capacity(body.len());
        for f in resource.data_fields() {
            let Some(v) = body.get(&f.name) else { continue };
            let v = coerce(f, v)?;
            if v.is_null() && f.required {
                return Err(AppError::Validation(format!("{} may not be null", f.name)));
            }
            out.insert(f.name.clone(), v);
        }
        Ok(out)
    }

    fn known_fields(resource: &ResourceSchema, mut body: Row) -> Result<Row, AppError> {
        body.remove(ID_FIELD);
        if let Some(unknown) = body.keys().find(|k| resource.field(k).is_none()) {
            return Err(AppError::Validation(format!("unknown field: {}", unknown)));
        }
        Ok(body)
    }
}

fn coerce(field: &FieldSpec, v: &Value) -> Result<Value, AppError> {
    field.kind.coerce_json(v).ok_or_else(|| {
        AppError::Validation(format!("{} must be a {}", field.name, field.kind.as_str()))
    })
}
