//! List query DSL: filter and ordering expressions from the query string.

mod filter;
mod ordering;
pub use filter::*;
pub use ordering::*;

pub(crate) use filter::compare_values;

use crate::config::ResourceSchema;
use crate::error::AppError;
use std::str::FromStr;

/// How multiple filter predicates combine. `Any` (OR) is the default.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FilterCombinator {
    #[default]
    Any,
    All,
}

impl FilterCombinator {
    pub fn sql(&self) -> &'static str {
        match self {
            FilterCombinator::Any => " OR ",
            FilterCombinator::All => " AND ",
        }
    }
}

impl FromStr for FilterCombinator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "or" | "any" => Ok(FilterCombinator::Any),
            "and" | "all" => Ok(FilterCombinator::All),
            other => Err(format!("'{}' (expected or / and)", other)),
        }
    }
}

/// Parsed `filters` and `ordering` for one list request.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ListQuery {
    pub predicates: Vec<Predicate>,
    pub combinator: FilterCombinator,
    pub ordering: Option<OrderingDirective>,
}

impl ListQuery {
    pub fn parse(
        resource: &ResourceSchema,
        filters: Option<&str>,
        ordering: Option<&str>,
        combinator: FilterCombinator,
    ) -> Result<Self, AppError> {
        let predicates = match filters {
            Some(f) => parse_filters(resource, f)?,
            None => Vec::new(),
        };
        Ok(ListQuery {
            predicates,
            combinator,
            ordering: parse_ordering(resource, ordering)?,
        })
    }
}
