//! Filter predicates
//!
//! Predicates are plain values: a small expression tree of field conditions
//! joined by logical AND. The same tree is evaluated in memory through the
//! [`Record`] trait and rendered to SQL by database-backed sources, so a
//! specification never needs to know which store will run it.
//!
//! There is no OR node; clauses only ever narrow the result.
//!
//! # Example
//!
//! ```rust
//! use suite_query::predicate::{and, FilterCondition, Predicate};
//!
//! let predicate = and([
//!     Predicate::from(FilterCondition::eq("parent_id", "A")),
//!     Predicate::from(FilterCondition::eq("active", true)),
//! ]);
//! assert_eq!(predicate.conditions().count(), 2);
//! ```

use std::cmp::Ordering;
use std::fmt;

use crate::soft_delete::Auditable;

/// Comparison operators for filter conditions
///
/// # Example
///
/// ```rust
/// use suite_query::predicate::FilterOperator;
///
/// assert_eq!(format!("{}", FilterOperator::Equal), "=");
/// assert_eq!(format!("{}", FilterOperator::Like), "LIKE");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterOperator {
    /// Equal to (=)
    Equal,
    /// Not equal to (!=)
    NotEqual,
    /// Greater than (>)
    GreaterThan,
    /// Greater than or equal to (>=)
    GreaterThanOrEqual,
    /// Less than (<)
    LessThan,
    /// Less than or equal to (<=)
    LessThanOrEqual,
    /// Pattern matching (LIKE) with `%` and `_` wildcards
    Like,
    /// Case-insensitive substring match
    Contains,
    /// Value is in a list (IN)
    In,
    /// Value is null (IS NULL)
    IsNull,
    /// Value is not null (IS NOT NULL)
    IsNotNull,
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Equal => write!(f, "="),
            Self::NotEqual => write!(f, "!="),
            Self::GreaterThan => write!(f, ">"),
            Self::GreaterThanOrEqual => write!(f, ">="),
            Self::LessThan => write!(f, "<"),
            Self::LessThanOrEqual => write!(f, "<="),
            Self::Like => write!(f, "LIKE"),
            Self::Contains => write!(f, "CONTAINS"),
            Self::In => write!(f, "IN"),
            Self::IsNull => write!(f, "IS NULL"),
            Self::IsNotNull => write!(f, "IS NOT NULL"),
        }
    }
}

/// A value that can be used in filter conditions
///
/// # Example
///
/// ```rust
/// use suite_query::predicate::FilterValue;
///
/// let string_val: FilterValue = "active".into();
/// let int_val: FilterValue = 42_i64.into();
/// let bool_val: FilterValue = true.into();
/// assert!(!bool_val.is_null());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    /// String value
    String(String),
    /// 64-bit integer value
    Integer(i64),
    /// 64-bit floating point value
    Float(f64),
    /// Boolean value
    Boolean(bool),
    /// List of string values (for IN operator)
    StringList(Vec<String>),
    /// List of integer values (for IN operator)
    IntegerList(Vec<i64>),
    /// Null value (for IS NULL / IS NOT NULL)
    Null,
}

impl FilterValue {
    /// Whether this value is SQL-style null
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Compare two scalar values. Integers and floats compare numerically;
    /// mismatched or list types are incomparable.
    pub fn compare(&self, other: &FilterValue) -> Option<Ordering> {
        match (self, other) {
            (Self::String(a), Self::String(b)) => Some(a.cmp(b)),
            (Self::Integer(a), Self::Integer(b)) => Some(a.cmp(b)),
            (Self::Float(a), Self::Float(b)) => a.partial_cmp(b),
            (Self::Integer(a), Self::Float(b)) => (*a as f64).partial_cmp(b),
            (Self::Float(a), Self::Integer(b)) => a.partial_cmp(&(*b as f64)),
            (Self::Boolean(a), Self::Boolean(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl From<&str> for FilterValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for FilterValue {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<i32> for FilterValue {
    fn from(n: i32) -> Self {
        Self::Integer(i64::from(n))
    }
}

impl From<f64> for FilterValue {
    fn from(n: f64) -> Self {
        Self::Float(n)
    }
}

impl From<bool> for FilterValue {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<Vec<String>> for FilterValue {
    fn from(list: Vec<String>) -> Self {
        Self::StringList(list)
    }
}

impl From<Vec<i64>> for FilterValue {
    fn from(list: Vec<i64>) -> Self {
        Self::IntegerList(list)
    }
}

impl<V: Into<FilterValue>> From<Option<V>> for FilterValue {
    fn from(value: Option<V>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// A single field comparison
///
/// # Example
///
/// ```rust
/// use suite_query::predicate::{FilterCondition, FilterOperator};
///
/// let filter = FilterCondition::contains("name", "spa");
/// assert_eq!(filter.operator, FilterOperator::Contains);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct FilterCondition {
    /// The field name to filter on
    pub field: String,
    /// The comparison operator
    pub operator: FilterOperator,
    /// The value to compare against
    pub value: FilterValue,
}

impl FilterCondition {
    /// Create a new filter condition
    pub fn new(field: impl Into<String>, operator: FilterOperator, value: FilterValue) -> Self {
        Self {
            field: field.into(),
            operator,
            value,
        }
    }

    /// Create an equality filter (field = value)
    pub fn eq(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, FilterOperator::Equal, value.into())
    }

    /// Create a not-equal filter (field != value)
    pub fn ne(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, FilterOperator::NotEqual, value.into())
    }

    /// Create a greater-than filter (field > value)
    pub fn gt(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, FilterOperator::GreaterThan, value.into())
    }

    /// Create a greater-than-or-equal filter (field >= value)
    pub fn gte(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, FilterOperator::GreaterThanOrEqual, value.into())
    }

    /// Create a less-than filter (field < value)
    pub fn lt(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, FilterOperator::LessThan, value.into())
    }

    /// Create a less-than-or-equal filter (field <= value)
    pub fn lte(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, FilterOperator::LessThanOrEqual, value.into())
    }

    /// Create a LIKE pattern filter
    pub fn like(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::new(field, FilterOperator::Like, FilterValue::String(pattern.into()))
    }

    /// Create a case-insensitive substring filter
    pub fn contains(field: impl Into<String>, needle: impl Into<String>) -> Self {
        Self::new(
            field,
            FilterOperator::Contains,
            FilterValue::String(needle.into()),
        )
    }

    /// Create an IN list filter for strings
    pub fn in_strings(field: impl Into<String>, values: Vec<String>) -> Self {
        Self::new(field, FilterOperator::In, FilterValue::StringList(values))
    }

    /// Create an IN list filter for integers
    pub fn in_integers(field: impl Into<String>, values: Vec<i64>) -> Self {
        Self::new(field, FilterOperator::In, FilterValue::IntegerList(values))
    }

    /// Create an IS NULL filter
    pub fn is_null(field: impl Into<String>) -> Self {
        Self::new(field, FilterOperator::IsNull, FilterValue::Null)
    }

    /// Create an IS NOT NULL filter
    pub fn is_not_null(field: impl Into<String>) -> Self {
        Self::new(field, FilterOperator::IsNotNull, FilterValue::Null)
    }

    /// Evaluate the condition against a field value read from a record
    ///
    /// A missing field behaves like SQL null: only `IS NULL` matches it.
    pub fn matches(&self, actual: Option<&FilterValue>) -> bool {
        let actual = match actual {
            Some(value) if !value.is_null() => value,
            _ => return self.operator == FilterOperator::IsNull,
        };

        match self.operator {
            FilterOperator::IsNull => false,
            FilterOperator::IsNotNull => true,
            FilterOperator::Equal => actual.compare(&self.value) == Some(Ordering::Equal),
            FilterOperator::NotEqual => {
                matches!(actual.compare(&self.value), Some(o) if o != Ordering::Equal)
            }
            FilterOperator::GreaterThan => actual.compare(&self.value) == Some(Ordering::Greater),
            FilterOperator::GreaterThanOrEqual => matches!(
                actual.compare(&self.value),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            FilterOperator::LessThan => actual.compare(&self.value) == Some(Ordering::Less),
            FilterOperator::LessThanOrEqual => matches!(
                actual.compare(&self.value),
                Some(Ordering::Less | Ordering::Equal)
            ),
            FilterOperator::Like => match (actual, &self.value) {
                (FilterValue::String(text), FilterValue::String(pattern)) => {
                    like_match(text, pattern)
                }
                _ => false,
            },
            FilterOperator::Contains => match (actual, &self.value) {
                (FilterValue::String(text), FilterValue::String(needle)) => text
                    .to_lowercase()
                    .contains(needle.to_lowercase().as_str()),
                _ => false,
            },
            FilterOperator::In => match (actual, &self.value) {
                (FilterValue::String(s), FilterValue::StringList(list)) => list.contains(s),
                (FilterValue::Integer(n), FilterValue::IntegerList(list)) => list.contains(n),
                _ => false,
            },
        }
    }
}

/// SQL LIKE semantics: `%` matches any run, `_` matches one character.
///
/// Greedy scan that backtracks only to the most recent `%`, so the cost is
/// bounded by `text.len() * pattern.len()`.
fn like_match(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();

    let (mut t, mut p) = (0, 0);
    // Pattern index after the last `%`, and the text index it was tried at
    let mut star: Option<(usize, usize)> = None;

    while t < text.len() {
        match pattern.get(p) {
            Some('%') => {
                star = Some((p + 1, t));
                p += 1;
            }
            Some('_') => {
                t += 1;
                p += 1;
            }
            Some(c) if *c == text[t] => {
                t += 1;
                p += 1;
            }
            _ => match star {
                Some((after, tried)) => {
                    p = after;
                    t = tried + 1;
                    star = Some((after, tried + 1));
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|c| *c == '%')
}

/// Field access used by in-memory evaluation
///
/// Implemented by entity types so predicates and ordering keys can read their
/// fields by name. Returning `None` for an unknown field makes conditions on it
/// behave like conditions on a null column.
pub trait Record {
    /// Read a field by its column name
    fn field(&self, name: &str) -> Option<FilterValue>;
}

/// A filter predicate
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// A single field comparison
    Condition(FilterCondition),
    /// Excludes soft-deleted records; `column` is the backing flag for SQL stores
    NotDeleted {
        /// Column holding the deletion flag
        column: &'static str,
    },
    /// Logical AND of all members; empty means "match everything"
    All(Vec<Predicate>),
}

impl Predicate {
    /// The identity filter
    pub fn always() -> Self {
        Self::All(Vec::new())
    }

    /// Conjoin another predicate, flattening nested conjunctions
    #[must_use]
    pub fn and(self, other: Predicate) -> Self {
        and([self, other])
    }

    /// Whether this predicate matches every record
    pub fn is_always(&self) -> bool {
        matches!(self, Self::All(members) if members.iter().all(Predicate::is_always))
    }

    /// Iterate over the field conditions in this predicate, depth-first
    pub fn conditions(&self) -> Box<dyn Iterator<Item = &FilterCondition> + '_> {
        match self {
            Self::Condition(condition) => Box::new(std::iter::once(condition)),
            Self::NotDeleted { .. } => Box::new(std::iter::empty()),
            Self::All(members) => Box::new(members.iter().flat_map(Predicate::conditions)),
        }
    }

    /// Whether the predicate contains a soft-delete guard
    pub fn excludes_deleted(&self) -> bool {
        match self {
            Self::NotDeleted { .. } => true,
            Self::Condition(_) => false,
            Self::All(members) => members.iter().any(Predicate::excludes_deleted),
        }
    }

    /// Evaluate against a record in memory
    pub fn matches<T>(&self, record: &T) -> bool
    where
        T: Record + Auditable,
    {
        match self {
            Self::Condition(condition) => condition.matches(record.field(&condition.field).as_ref()),
            Self::NotDeleted { .. } => !record.is_deleted(),
            Self::All(members) => members.iter().all(|p| p.matches(record)),
        }
    }
}

impl From<FilterCondition> for Predicate {
    fn from(condition: FilterCondition) -> Self {
        Self::Condition(condition)
    }
}

/// Conjoin predicates with logical AND
///
/// Nested conjunctions are flattened and identity members dropped, so the
/// result is stable regardless of how the caller grouped its clauses.
pub fn and(predicates: impl IntoIterator<Item = Predicate>) -> Predicate {
    let mut members = Vec::new();
    for predicate in predicates {
        match predicate {
            Predicate::All(inner) => {
                if let Predicate::All(flat) = and(inner) {
                    members.extend(flat);
                }
            }
            other => members.push(other),
        }
    }
    Predicate::All(members)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Row {
        name: &'static str,
        rank: i64,
        parent: Option<&'static str>,
        deleted: bool,
    }

    impl Record for Row {
        fn field(&self, name: &str) -> Option<FilterValue> {
            match name {
                "name" => Some(self.name.into()),
                "rank" => Some(self.rank.into()),
                "parent_id" => Some(self.parent.into()),
                _ => None,
            }
        }
    }

    impl Auditable for Row {
        fn is_deleted(&self) -> bool {
            self.deleted
        }
    }

    fn row() -> Row {
        Row {
            name: "Spa Weekend",
            rank: 3,
            parent: Some("A"),
            deleted: false,
        }
    }

    #[test]
    fn test_filter_operator_display() {
        assert_eq!(format!("{}", FilterOperator::NotEqual), "!=");
        assert_eq!(format!("{}", FilterOperator::Contains), "CONTAINS");
        assert_eq!(format!("{}", FilterOperator::IsNotNull), "IS NOT NULL");
    }

    #[test]
    fn test_filter_value_from_option() {
        let none: FilterValue = Option::<&str>::None.into();
        assert_eq!(none, FilterValue::Null);
        let some: FilterValue = Some(7_i64).into();
        assert_eq!(some, FilterValue::Integer(7));
    }

    #[test]
    fn test_compare_mixed_numeric() {
        let int = FilterValue::Integer(2);
        let float = FilterValue::Float(2.5);
        assert_eq!(int.compare(&float), Some(Ordering::Less));
        assert_eq!(float.compare(&int), Some(Ordering::Greater));
        assert_eq!(int.compare(&FilterValue::String("2".into())), None);
    }

    #[test]
    fn test_condition_comparisons() {
        let row = row();
        assert!(Predicate::from(FilterCondition::eq("parent_id", "A")).matches(&row));
        assert!(!Predicate::from(FilterCondition::eq("parent_id", "B")).matches(&row));
        assert!(Predicate::from(FilterCondition::ne("parent_id", "B")).matches(&row));
        assert!(Predicate::from(FilterCondition::gt("rank", 2_i64)).matches(&row));
        assert!(Predicate::from(FilterCondition::gte("rank", 3_i64)).matches(&row));
        assert!(!Predicate::from(FilterCondition::lt("rank", 3_i64)).matches(&row));
        assert!(Predicate::from(FilterCondition::lte("rank", 3_i64)).matches(&row));
    }

    #[test]
    fn test_missing_field_behaves_like_null() {
        let row = row();
        assert!(Predicate::from(FilterCondition::is_null("unknown")).matches(&row));
        assert!(!Predicate::from(FilterCondition::eq("unknown", "x")).matches(&row));
        assert!(!Predicate::from(FilterCondition::ne("unknown", "x")).matches(&row));
    }

    #[test]
    fn test_null_parent() {
        let orphan = Row { parent: None, ..row() };
        assert!(Predicate::from(FilterCondition::is_null("parent_id")).matches(&orphan));
        assert!(!Predicate::from(FilterCondition::is_not_null("parent_id")).matches(&orphan));
    }

    #[test]
    fn test_like_and_contains() {
        let row = row();
        assert!(Predicate::from(FilterCondition::like("name", "Spa%")).matches(&row));
        assert!(Predicate::from(FilterCondition::like("name", "_pa Weekend")).matches(&row));
        assert!(!Predicate::from(FilterCondition::like("name", "spa%")).matches(&row));
        assert!(Predicate::from(FilterCondition::contains("name", "WEEK")).matches(&row));
    }

    #[test]
    fn test_like_wildcards() {
        assert!(like_match("", ""));
        assert!(like_match("", "%"));
        assert!(!like_match("", "_"));
        assert!(like_match("abc", "a%c"));
        assert!(like_match("abc", "%b%"));
        assert!(like_match("abcbc", "a%bc"));
        assert!(!like_match("abcbd", "a%bc"));
        assert!(like_match("mississippi", "%iss%ppi"));
        assert!(!like_match("abc", "ab"));
        assert!(like_match("café", "caf_"));
    }

    #[test]
    fn test_like_many_wildcards_stay_linear() {
        let text = "a".repeat(200);
        let pattern = format!("{}b", "%a".repeat(20));
        let started = std::time::Instant::now();
        assert!(!like_match(&text, &pattern));
        assert!(like_match(&format!("{text}b"), &pattern));
        assert!(started.elapsed() < std::time::Duration::from_secs(1));
    }

    #[test]
    fn test_in_lists() {
        let row = row();
        assert!(Predicate::from(FilterCondition::in_integers("rank", vec![1, 3])).matches(&row));
        assert!(!Predicate::from(FilterCondition::in_strings(
            "parent_id",
            vec!["B".to_string(), "C".to_string()]
        ))
        .matches(&row));
    }

    #[test]
    fn test_not_deleted() {
        let guard = Predicate::NotDeleted {
            column: "is_deleted",
        };
        assert!(guard.matches(&row()));
        assert!(!guard.matches(&Row {
            deleted: true,
            ..row()
        }));
    }

    #[test]
    fn test_and_flattens_and_drops_identity() {
        let nested = and([
            Predicate::always(),
            and([
                FilterCondition::eq("a", 1_i64).into(),
                FilterCondition::eq("b", 2_i64).into(),
            ]),
            FilterCondition::eq("c", 3_i64).into(),
        ]);
        match &nested {
            Predicate::All(members) => assert_eq!(members.len(), 3),
            other => panic!("expected conjunction, got {:?}", other),
        }
        let fields: Vec<_> = nested.conditions().map(|c| c.field.as_str()).collect();
        assert_eq!(fields, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_always() {
        assert!(Predicate::always().is_always());
        assert!(and([Predicate::always(), Predicate::always()]).is_always());
        assert!(Predicate::always().matches(&row()));
        assert!(!Predicate::from(FilterCondition::eq("a", 1_i64)).is_always());
    }

    #[test]
    fn test_excludes_deleted() {
        let predicate = Predicate::NotDeleted { column: "is_deleted" }
            .and(FilterCondition::eq("a", 1_i64).into());
        assert!(predicate.excludes_deleted());
        assert!(!Predicate::always().excludes_deleted());
    }
}
