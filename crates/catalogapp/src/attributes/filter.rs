//! Keyword filtering over projected attribute fields.
//!
//! Search hints carry a small keyword language:
//!
//! - `\` on its own matches an empty field
//! - `a|b` matches either alternative, `a&b` requires both terms
//! - `<2024-01-01` / `>2024-01-01` are strict date ranges, a bare date matches that day
//! - anything else is a case-insensitive substring of the value or the named key
//!
//! All terms of one alternative must hold for the same field, so for arrays a
//! single element has to satisfy the whole conjunction.

use chrono::NaiveDate;

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];

/// Parse a `YYYY-MM-DD` or `YYYY/MM/DD` literal.
pub fn parse_date_literal(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}

/// The projected shape a keyword is tested against.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldRef<'a> {
    pub value: &'a str,
    pub key: &'a str,
    pub date: Option<NaiveDate>,
}

impl<'a> FieldRef<'a> {
    pub fn text(value: &'a str) -> Self {
        Self {
            value,
            ..Default::default()
        }
    }

    fn is_blank(&self) -> bool {
        self.value.is_empty() && self.key.is_empty() && self.date.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterOp {
    /// Field holds nothing.
    Empty,
    /// Case-insensitive substring of value or key.
    Contains(String),
    /// Exact value or key.
    Equals(String),
    OnDate(NaiveDate),
    Before(NaiveDate),
    After(NaiveDate),
}

impl FilterOp {
    fn parse(term: &str, exact: bool) -> Option<Self> {
        let term = term.trim();
        if term.is_empty() {
            return None;
        }
        if term == "\\" {
            return Some(FilterOp::Empty);
        }
        if let Some(rest) = term.strip_prefix('<') {
            if let Some(date) = parse_date_literal(rest) {
                return Some(FilterOp::Before(date));
            }
        }
        if let Some(rest) = term.strip_prefix('>') {
            if let Some(date) = parse_date_literal(rest) {
                return Some(FilterOp::After(date));
            }
        }
        if exact {
            return Some(FilterOp::Equals(term.to_string()));
        }
        if let Some(date) = parse_date_literal(term) {
            return Some(FilterOp::OnDate(date));
        }
        Some(FilterOp::Contains(term.to_lowercase()))
    }

    pub fn matches(&self, field: &FieldRef<'_>) -> bool {
        match self {
            FilterOp::Empty => field.is_blank(),
            FilterOp::Contains(needle) => {
                field.value.to_lowercase().contains(needle.as_str())
                    || field.key.to_lowercase().contains(needle.as_str())
            }
            FilterOp::Equals(expected) => {
                field.value == expected.as_str() || field.key == expected.as_str()
            }
            FilterOp::OnDate(date) => field.date == Some(*date),
            FilterOp::Before(date) => field.date.is_some_and(|d| d < *date),
            FilterOp::After(date) => field.date.is_some_and(|d| d > *date),
        }
    }
}

/// A parsed keyword: OR of AND-groups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordFilter {
    alternatives: Vec<Vec<FilterOp>>,
}

impl KeywordFilter {
    /// Parse a raw keyword. Returns `None` when it carries no condition.
    pub fn parse(raw: &str, exact: bool) -> Option<Self> {
        let alternatives: Vec<Vec<FilterOp>> = raw
            .split('|')
            .map(|alt| {
                alt.split('&')
                    .filter_map(|term| FilterOp::parse(term, exact))
                    .collect::<Vec<_>>()
            })
            .filter(|terms| !terms.is_empty())
            .collect();
        if alternatives.is_empty() {
            None
        } else {
            Some(Self { alternatives })
        }
    }

    pub fn alternatives(&self) -> &[Vec<FilterOp>] {
        &self.alternatives
    }

    /// True when one field satisfies every term of some alternative.
    pub fn matches(&self, field: &FieldRef<'_>) -> bool {
        self.alternatives
            .iter()
            .any(|terms| terms.iter().all(|op| op.matches(field)))
    }

    /// True when any of the fields matches.
    pub fn matches_any<'a, I>(&self, fields: I) -> bool
    where
        I: IntoIterator<Item = FieldRef<'a>>,
    {
        fields.into_iter().any(|field| self.matches(&field))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        parse_date_literal(s).unwrap()
    }

    #[test]
    fn blank_keyword_has_no_condition() {
        assert!(KeywordFilter::parse("", false).is_none());
        assert!(KeywordFilter::parse(" | & ", false).is_none());
    }

    #[test]
    fn substring_is_case_insensitive() {
        let filter = KeywordFilter::parse("WEB", false).unwrap();
        assert!(filter.matches(&FieldRef::text("prod-web-01")));
        assert!(!filter.matches(&FieldRef::text("db-01")));
    }

    #[test]
    fn substring_also_checks_named_key() {
        let filter = KeywordFilter::parse("primary", false).unwrap();
        let field = FieldRef {
            value: "db-01",
            key: "Primary",
            date: None,
        };
        assert!(filter.matches(&field));
    }

    #[test]
    fn or_and_grammar() {
        let filter = KeywordFilter::parse("web&01|db", false).unwrap();
        assert!(filter.matches(&FieldRef::text("web-01")));
        assert!(!filter.matches(&FieldRef::text("web-02")));
        assert!(filter.matches(&FieldRef::text("db-99")));
    }

    #[test]
    fn backslash_matches_empty_only() {
        let filter = KeywordFilter::parse("\\", false).unwrap();
        assert!(filter.matches(&FieldRef::default()));
        assert!(!filter.matches(&FieldRef::text("x")));
    }

    #[test]
    fn date_ranges_are_strict() {
        let before = KeywordFilter::parse("<2024-02-01", false).unwrap();
        let after = KeywordFilter::parse(">2024/01/01", false).unwrap();
        let field = FieldRef {
            value: "2024-01-15",
            key: "",
            date: Some(date("2024-01-15")),
        };
        assert!(before.matches(&field));
        assert!(after.matches(&field));

        let edge = FieldRef {
            date: Some(date("2024-02-01")),
            ..field
        };
        assert!(!before.matches(&edge));
        assert!(!before.matches(&FieldRef::text("2024-01-15")));
    }

    #[test]
    fn bare_date_matches_the_day() {
        let filter = KeywordFilter::parse("2024-01-15", false).unwrap();
        let field = FieldRef {
            value: "2024-01-15",
            key: "",
            date: Some(date("2024-01-15")),
        };
        assert!(filter.matches(&field));
    }

    #[test]
    fn exact_requires_full_equality() {
        let filter = KeywordFilter::parse("web", true).unwrap();
        assert!(filter.matches(&FieldRef::text("web")));
        assert!(!filter.matches(&FieldRef::text("web-01")));
    }

    #[test]
    fn matches_any_over_array_elements() {
        let filter = KeywordFilter::parse("b&2", false).unwrap();
        let fields = [FieldRef::text("b1"), FieldRef::text("a2"), FieldRef::text("b2")];
        assert!(filter.matches_any(fields));
        let split = [FieldRef::text("b1"), FieldRef::text("a2")];
        assert!(!filter.matches_any(split));
    }
}
