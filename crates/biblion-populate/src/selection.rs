//! Row selection conditions.
//!
//! A [`Condition`] compares one source column with a literal, written as
//! `column op literal`:
//!
//! ```text
//! published_year >= 2020
//! type = 'journal-article'
//! doi ^= 10.1000/
//! orcid is not null
//! ```
//!
//! Operators are `=`, `!=`, `<`, `<=`, `>`, `>=` and `^=` (text prefix),
//! plus the `is null` and `is not null` tests. An unquoted literal that
//! parses as a number is numeric; single quotes force text. A null column
//! value satisfies only `is null`.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use biblion_core::Value;

use crate::error::PopulateError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Prefix,
    IsNull,
    NotNull,
}

impl Comparison {
    fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Prefix => "^=",
            Self::IsNull => "is null",
            Self::NotNull => "is not null",
        }
    }

    fn from_symbol(s: &str) -> Option<Self> {
        Some(match s {
            "=" | "==" => Self::Eq,
            "!=" | "<>" => Self::Ne,
            "<" => Self::Lt,
            "<=" => Self::Le,
            ">" => Self::Gt,
            ">=" => Self::Ge,
            "^=" => Self::Prefix,
            _ => return None,
        })
    }
}

/// `column op literal`, tested against each scanned row.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub column: String,
    pub op: Comparison,
    pub value: Value,
}

impl Condition {
    pub fn new(column: &str, op: Comparison, value: impl Into<Value>) -> Self {
        Self {
            column: column.to_string(),
            op,
            value: value.into(),
        }
    }

    pub fn is_null(column: &str) -> Self {
        Self::new(column, Comparison::IsNull, Value::Null)
    }

    pub fn not_null(column: &str) -> Self {
        Self::new(column, Comparison::NotNull, Value::Null)
    }

    pub fn matches(&self, v: &Value) -> bool {
        match self.op {
            Comparison::IsNull => v.is_null(),
            Comparison::NotNull => !v.is_null(),
            Comparison::Prefix => match (v.key_text(), self.value.key_text()) {
                (Some(s), Some(p)) => s.starts_with(&p),
                _ => false,
            },
            op => {
                let Some(ord) = compare(v, &self.value) else {
                    return false;
                };
                match op {
                    Comparison::Eq => ord == Ordering::Equal,
                    Comparison::Ne => ord != Ordering::Equal,
                    Comparison::Lt => ord == Ordering::Less,
                    Comparison::Le => ord != Ordering::Greater,
                    Comparison::Gt => ord == Ordering::Greater,
                    _ => ord != Ordering::Less,
                }
            }
        }
    }
}

/// Text columns compare as text, numeric columns numerically. A numeric
/// column against a text literal never compares.
fn compare(column: &Value, literal: &Value) -> Option<Ordering> {
    match column {
        Value::Null => None,
        Value::Text(s) => Some(s.as_str().cmp(literal.key_text()?.as_str())),
        n => n.as_f64()?.partial_cmp(&literal.as_f64()?),
    }
}

fn literal(s: &str) -> Value {
    if let Some(quoted) = s.strip_prefix('\'').and_then(|q| q.strip_suffix('\'')) {
        return Value::Text(quoted.to_string());
    }
    if let Ok(n) = s.parse::<i64>() {
        return Value::Integer(n);
    }
    if let Ok(x) = s.parse::<f64>() {
        return Value::Real(x);
    }
    Value::Text(s.to_string())
}

fn valid_column(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl FromStr for Condition {
    type Err = PopulateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || PopulateError::BadCondition(s.to_string());
        let text = s.trim();
        let lower = text.to_ascii_lowercase();

        for (suffix, op) in [(" is not null", Comparison::NotNull), (" is null", Comparison::IsNull)] {
            if lower.ends_with(suffix) {
                let column = text[..text.len() - suffix.len()].trim();
                if !valid_column(column) {
                    return Err(bad());
                }
                return Ok(Self::new(column, op, Value::Null));
            }
        }

        let start = text.find(['=', '!', '<', '>', '^']).ok_or_else(bad)?;
        let end = text[start..]
            .find(|c: char| !matches!(c, '=' | '!' | '<' | '>' | '^'))
            .map_or(text.len(), |n| start + n);
        let op = Comparison::from_symbol(&text[start..end]).ok_or_else(bad)?;
        let column = text[..start].trim();
        let value = text[end..].trim();
        if !valid_column(column) || value.is_empty() {
            return Err(bad());
        }
        Ok(Self::new(column, op, literal(value)))
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.op, &self.value) {
            (Comparison::IsNull | Comparison::NotNull, _) => {
                write!(f, "{} {}", self.column, self.op.symbol())
            }
            (op, Value::Text(s)) => write!(f, "{} {} '{s}'", self.column, op.symbol()),
            (op, v) => write!(f, "{} {} {v}", self.column, op.symbol()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cond(s: &str) -> Condition {
        s.parse().unwrap()
    }

    #[test]
    fn parses_operators_and_literals() {
        assert_eq!(
            cond("published_year >= 2020"),
            Condition::new("published_year", Comparison::Ge, 2020i64)
        );
        assert_eq!(
            cond("type='journal-article'"),
            Condition::new("type", Comparison::Eq, "journal-article")
        );
        assert_eq!(cond("doi ^= 10.1000/"), Condition::new("doi", Comparison::Prefix, "10.1000/"));
        assert_eq!(cond("score < 1.5").value, Value::Real(1.5));
        assert_eq!(cond("orcid IS NOT NULL"), Condition::not_null("orcid"));
        assert_eq!(cond("  orcid is null "), Condition::is_null("orcid"));
    }

    #[test]
    fn rejects_malformed() {
        for s in ["", "year", "= 3", "year >", "year => 3", "bad col = 1", "x is null-ish"] {
            assert!(
                matches!(s.parse::<Condition>(), Err(PopulateError::BadCondition(_))),
                "{s:?}"
            );
        }
    }

    #[test]
    fn null_only_matches_null_tests() {
        for s in ["n = 1", "n != 1", "n < 1", "n ^= 1"] {
            assert!(!cond(s).matches(&Value::Null), "{s}");
        }
        assert!(cond("n is null").matches(&Value::Null));
        assert!(!cond("n is not null").matches(&Value::Null));
    }

    #[test]
    fn compares_by_column_type() {
        assert!(cond("year >= 2020").matches(&Value::Integer(2021)));
        assert!(!cond("year >= 2020").matches(&Value::Integer(2019)));
        assert!(cond("year = 2020").matches(&Value::Real(2020.0)));
        // text columns compare as text, even against a numeric literal
        assert!(cond("year = 2020").matches(&Value::text("2020")));
        assert!(cond("name < 'b'").matches(&Value::text("alpha")));
        assert!(!cond("year > 'x'").matches(&Value::Integer(5)));
        assert!(cond("doi ^= 10.1").matches(&Value::text("10.1000/a")));
        assert!(cond("n ^= 12").matches(&Value::Integer(123)));
    }

    #[test]
    fn display_parses_back() {
        for s in ["year >= 2020", "type = 'x y'", "orcid is not null"] {
            assert_eq!(cond(&cond(s).to_string()), cond(s));
        }
    }
}
