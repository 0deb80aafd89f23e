//! Ordering expressions: `field` (ascending) or `-field` (descending).

use crate::config::ResourceSchema;
use crate::error::AppError;

const DESCENDING_PREFIX: char = '-';

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

impl Direction {
    pub fn sql(&self) -> &'static str {
        match self {
            Direction::Ascending => "ASC",
            Direction::Descending => "DESC",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderingDirective {
    pub field: String,
    pub direction: Direction,
}

/// Parse an ordering token. Absent or blank input yields `None`.
pub fn parse_ordering(
    resource: &ResourceSchema,
    input: Option<&str>,
) -> Result<Option<OrderingDirective>, AppError> {
    let Some(token) = input.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    let (name, direction) = match token.strip_prefix(DESCENDING_PREFIX) {
        Some(rest) => (rest, Direction::Descending),
        None => (token, Direction::Ascending),
    };
    let field = resource
        .queryable_field(name)
        .ok_or_else(|| AppError::BadRequest(format!("unknown ordering field '{}'", name)))?;
    Ok(Some(OrderingDirective {
        field: field.name.clone(),
        direction,
    }))
}
