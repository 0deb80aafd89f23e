//! Filter expressions: `field<op>value` clauses separated by commas.
//!
//! Operators, matched at the first position in the clause where any of them occurs,
//! in priority order: `>=`, `<=`, `==`, `!=`, `>`, `<`, then `~contains~`.

use crate::config::{FieldKind, ResourceSchema};
use crate::error::AppError;
use serde_json::Value;
use std::cmp::Ordering;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterOperator {
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
    Contains,
}

/// Symbolic tokens in match priority order.
const SYMBOL_TOKENS: [(&str, FilterOperator); 6] = [
    (">=", FilterOperator::Ge),
    ("<=", FilterOperator::Le),
    ("==", FilterOperator::Eq),
    ("!=", FilterOperator::Ne),
    (">", FilterOperator::Gt),
    ("<", FilterOperator::Lt),
];

const NAMED_DELIMITER: char = '~';

impl FilterOperator {
    /// SQL comparison operator; `None` for `Contains`, which compiles to `strpos`.
    pub fn sql(&self) -> Option<&'static str> {
        match self {
            FilterOperator::Eq => Some("="),
            FilterOperator::Ne => Some("<>"),
            FilterOperator::Gt => Some(">"),
            FilterOperator::Lt => Some("<"),
            FilterOperator::Ge => Some(">="),
            FilterOperator::Le => Some("<="),
            FilterOperator::Contains => None,
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "contains" => Some(FilterOperator::Contains),
            _ => None,
        }
    }
}

/// One `(field, operator, value)` condition. The value stays raw text until the store
/// coerces it to the field's type.
#[derive(Clone, Debug, PartialEq)]
pub struct Predicate {
    pub field: String,
    pub operator: FilterOperator,
    pub value: String,
}

impl Predicate {
    /// Comparison value typed for the field. `Contains` always compares text.
    pub fn typed_value(&self, kind: FieldKind) -> Result<Value, AppError> {
        if self.operator == FilterOperator::Contains {
            return Ok(Value::String(self.value.clone()));
        }
        kind.coerce_str(&self.value).ok_or_else(|| {
            AppError::BadRequest(format!(
                "filter value '{}' for '{}' is not a valid {}",
                self.value,
                self.field,
                kind.as_str()
            ))
        })
    }

    /// Evaluate against a stored value, with SQL null semantics (null never matches).
    pub fn matches(&self, stored: &Value, typed: &Value) -> bool {
        if stored.is_null() {
            return false;
        }
        if self.operator == FilterOperator::Contains {
            let needle = typed.as_str().unwrap_or_default();
            return value_text(stored).contains(needle);
        }
        let Some(ord) = compare_values(stored, typed) else {
            return false;
        };
        match self.operator {
            FilterOperator::Eq => ord == Ordering::Equal,
            FilterOperator::Ne => ord != Ordering::Equal,
            FilterOperator::Gt => ord == Ordering::Greater,
            FilterOperator::Lt => ord == Ordering::Less,
            FilterOperator::Ge => ord != Ordering::Less,
            FilterOperator::Le => ord != Ordering::Greater,
            FilterOperator::Contains => false,
        }
    }
}

/// Text form matching `CAST(col AS TEXT)`. Whole doubles print without a
/// fractional part, as PostgreSQL prints them below 1e15.
pub(crate) fn value_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Number(n) if n.is_f64() => match n.as_f64() {
            Some(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
            _ => n.to_string(),
        },
        other => other.to_string(),
    }
}

/// Ordering between two values of the same field type; `None` when incomparable.
pub(crate) fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => Some(x.cmp(&y)),
            _ => x.as_f64()?.partial_cmp(&y.as_f64()?),
        },
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// Parse a filter expression. Empty input yields no predicates.
pub fn parse_filters(resource: &ResourceSchema, input: &str) -> Result<Vec<Predicate>, AppError> {
    if input.trim().is_empty() {
        return Ok(Vec::new());
    }
    input
        .split(',')
        .map(|clause| parse_clause(resource, clause))
        .collect()
}

fn parse_clause(resource: &ResourceSchema, clause: &str) -> Result<Predicate, AppError> {
    let (start, end, operator) = find_operator(clause)?.ok_or_else(|| {
        AppError::BadRequest(format!("invalid filter '{}': no comparison operator", clause))
    })?;
    let field = clause[..start].trim();
    let value = clause[end..].trim();
    if field.is_empty() {
        return Err(AppError::BadRequest(format!(
            "invalid filter '{}': missing field name",
            clause
        )));
    }
    let declared = resource
        .queryable_field(field)
        .ok_or_else(|| AppError::BadRequest(format!("unknown filter field '{}'", field)))?;
    Ok(Predicate {
        field: declared.name.clone(),
        operator,
        value: value.to_string(),
    })
}

/// Byte range of the first operator token in `clause`.
fn find_operator(clause: &str) -> Result<Option<(usize, usize, FilterOperator)>, AppError> {
    for (i, c) in clause.char_indices() {
        let rest = &clause[i..];
        if let Some((token, op)) = SYMBOL_TOKENS.iter().find(|(t, _)| rest.starts_with(t)) {
            return Ok(Some((i, i + token.len(), *op)));
        }
        if c == NAMED_DELIMITER {
            let after = i + c.len_utf8();
            let close = clause[after..].find(NAMED_DELIMITER).ok_or_else(|| {
                AppError::BadRequest(format!("invalid filter '{}': unterminated operator", clause))
            })?;
            let name = &clause[after..after + close];
            let op = FilterOperator::from_name(name).ok_or_else(|| {
                AppError::BadRequest(format!("unknown filter operator '{}'", name))
            })?;
            return Ok(Some((i, after + close + 1, op)));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{builtin_resources, resolve, ResourceConfig};
    use serde_json::json;
    use std::sync::Arc;

    fn people() -> Arc<ResourceSchema> {
        let cfg: ResourceConfig = serde_json::from_value(json!({
            "name": "people",
            "fields": [
                { "name": "name", "type": "string" },
                { "name": "age", "type": "integer" },
                { "name": "token", "type": "string", "secret": true }
            ],
            "render_fields": ["id", "name", "age"]
        }))
        .unwrap();
        resolve(&[cfg]).unwrap().get("people").unwrap().clone()
    }

    fn pred(field: &str, operator: FilterOperator, value: &str) -> Predicate {
        Predicate {
            field: field.into(),
            operator,
            value: value.into(),
        }
    }

    #[test]
    fn empty_input_is_no_filter() {
        assert!(parse_filters(&people(), "").unwrap().is_empty());
        assert!(parse_filters(&people(), "  ").unwrap().is_empty());
    }

    #[test]
    fn parses_every_operator() {
        let r = people();
        let cases = [
            ("age>=18", FilterOperator::Ge, "18"),
            ("age<=18", FilterOperator::Le, "18"),
            ("age==18", FilterOperator::Eq, "18"),
            ("age!=18", FilterOperator::Ne, "18"),
            ("age>18", FilterOperator::Gt, "18"),
            ("age<18", FilterOperator::Lt, "18"),
            ("name~contains~bob", FilterOperator::Contains, "bob"),
        ];
        for (input, op, value) in cases {
            assert_eq!(parse_filters(&r, input).unwrap(), vec![pred(
                if op == FilterOperator::Contains { "name" } else { "age" },
                op,
                value
            )]);
        }
    }

    #[test]
    fn first_operator_position_wins() {
        let r = people();
        assert_eq!(
            parse_filters(&r, "name==a>b").unwrap(),
            vec![pred("name", FilterOperator::Eq, "a>b")]
        );
        assert_eq!(
            parse_filters(&r, "name~contains~x>=y").unwrap(),
            vec![pred("name", FilterOperator::Contains, "x>=y")]
        );
    }

    #[test]
    fn clauses_parse_independently() {
        let r = people();
        let joined = parse_filters(&r, "age>1,name<2").unwrap();
        let mut separate = parse_filters(&r, "age>1").unwrap();
        separate.extend(parse_filters(&r, "name<2").unwrap());
        assert_eq!(joined, separate);
        assert_eq!(joined.len(), 2);
    }

    #[test]
    fn malformed_clauses_are_client_errors() {
        let r = people();
        for input in ["age=18", "unknown>1", ">5", "age>1,", "name~like~x", "name~contains"] {
            assert!(
                matches!(parse_filters(&r, input), Err(AppError::BadRequest(_))),
                "{input}"
            );
        }
    }

    #[test]
    fn secret_fields_do_not_resolve() {
        assert!(matches!(
            parse_filters(&people(), "token~contains~a"),
            Err(AppError::BadRequest(_))
        ));
        let users = resolve(&builtin_resources()).unwrap().get("users").unwrap().clone();
        assert!(parse_filters(&users, "password==x").is_err());
    }

    #[test]
    fn typed_values_follow_field_kind() {
        let p = pred("age", FilterOperator::Ge, "18");
        assert_eq!(p.typed_value(FieldKind::Integer).unwrap(), json!(18));
        assert!(pred("age", FilterOperator::Gt, "old")
            .typed_value(FieldKind::Integer)
            .is_err());
        let c = pred("age", FilterOperator::Contains, "1");
        assert_eq!(c.typed_value(FieldKind::Integer).unwrap(), json!("1"));
    }

    #[test]
    fn matching_semantics() {
        let ge = pred("age", FilterOperator::Ge, "18");
        assert!(ge.matches(&json!(18), &json!(18)));
        assert!(!ge.matches(&json!(17), &json!(18)));
        assert!(!ge.matches(&Value::Null, &json!(18)));
        let ne = pred("name", FilterOperator::Ne, "bob");
        assert!(ne.matches(&json!("alice"), &json!("bob")));
        assert!(!ne.matches(&Value::Null, &json!("bob")));
        let contains = pred("name", FilterOperator::Contains, "ob");
        assert!(contains.matches(&json!("bobby"), &json!("ob")));
        assert!(contains.matches(&json!(1077), &json!("07")));
    }

    #[test]
    fn float_text_matches_database_cast() {
        assert_eq!(value_text(&json!(1.0)), "1");
        assert_eq!(value_text(&json!(-40.0)), "-40");
        assert_eq!(value_text(&json!(2.5)), "2.5");
        assert_eq!(value_text(&json!(7)), "7");
        let contains = pred("score", FilterOperator::Contains, "1");
        assert!(contains.matches(&json!(10.0), &json!("1")));
        assert!(!contains.matches(&json!(10.0), &json!(".0")));
    }
}
