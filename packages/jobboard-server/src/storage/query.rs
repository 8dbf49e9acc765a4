//! Query-string driven listing: filter, sort, field selection and pagination.
//!
//! `ListQuery::parse` turns raw URL parameters into a query description
//! checked against an entity's field schema. The description is then either
//! rendered into SQL (`push_sql`) or evaluated over an in-memory collection
//! (`apply`). Nothing is executed here.
//!
//! Parameter forms:
//! - `role=employer` equality
//! - `createdAt[gte]=2024-01-01` comparison (`gt`, `gte`, `lt`, `lte`)
//! - `role[in]=user,employer` set membership
//! - `sort=-createdAt,name`, `fields=name,email`, `page=2`, `limit=20`

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;
use sqlx::{Postgres, QueryBuilder};
use std::cmp::Ordering;

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 10;
pub const MAX_LIMIT: u32 = 100;

const RESERVED: [&str; 4] = ["sort", "fields", "page", "limit"];

/// Type of a filterable field, which decides how values are parsed
#[derive(Debug, Clone, Copy)]
pub enum FieldKind {
    Text,
    Timestamp,
    /// Text restricted to a fixed set of values
    Choice(&'static [&'static str]),
}

/// A field clients may filter and sort on
#[derive(Debug)]
pub struct FieldSpec {
    /// Name used in query strings and JSON
    pub name: &'static str,
    /// Database column
    pub column: &'static str,
    pub kind: FieldKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
}

impl FilterOp {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "gt" => Some(FilterOp::Gt),
            "gte" => Some(FilterOp::Gte),
            "lt" => Some(FilterOp::Lt),
            "lte" => Some(FilterOp::Lte),
            "in" => Some(FilterOp::In),
            _ => None,
        }
    }

    fn sql(&self) -> &'static str {
        match self {
            FilterOp::Eq => " = ",
            FilterOp::Gt => " > ",
            FilterOp::Gte => " >= ",
            FilterOp::Lt => " < ",
            FilterOp::Lte => " <= ",
            FilterOp::In => " = ANY(",
        }
    }
}

#[derive(Debug, Clone, PartialEq, PartialOrd)]
pub enum FilterValue {
    Text(String),
    Timestamp(DateTime<Utc>),
}

#[derive(Debug)]
pub struct Filter {
    pub field: &'static FieldSpec,
    pub op: FilterOp,
    pub values: Vec<FilterValue>,
}

#[derive(Debug)]
pub struct SortKey {
    pub field: &'static FieldSpec,
    pub descending: bool,
}

/// Errors from malformed filter parameters
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("Unknown filter field: {0}")]
    UnknownField(String),

    #[error("Unsupported filter operator: {0}")]
    UnknownOperator(String),

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },
}

/// Records that can be filtered and sorted in memory
pub trait Filterable {
    fn field_value(&self, name: &str) -> Option<FilterValue>;
}

/// A composed, unexecuted listing query
#[derive(Debug)]
pub struct ListQuery {
    pub filters: Vec<Filter>,
    pub sort: Vec<SortKey>,
    /// Selected output fields; `None` selects everything
    pub fields: Option<Vec<String>>,
    pub page: u32,
    pub limit: u32,
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn parse_value(field: &FieldSpec, raw: &str) -> Result<FilterValue, QueryError> {
    let invalid = || QueryError::InvalidValue {
        field: field.name.to_string(),
        value: raw.to_string(),
    };
    match field.kind {
        FieldKind::Text => Ok(FilterValue::Text(raw.to_string())),
        FieldKind::Choice(allowed) => {
            if allowed.contains(&raw) {
                Ok(FilterValue::Text(raw.to_string()))
            } else {
                Err(invalid())
            }
        }
        FieldKind::Timestamp => parse_timestamp(raw)
            .map(FilterValue::Timestamp)
            .ok_or_else(invalid),
    }
}

/// Split `name[op]` into its parts; a bare `name` is equality
fn split_key(key: &str) -> Result<(&str, FilterOp), QueryError> {
    match key.split_once('[') {
        Some((name, rest)) => {
            let op = rest
                .strip_suffix(']')
                .and_then(FilterOp::parse)
                .ok_or_else(|| QueryError::UnknownOperator(key.to_string()))?;
            Ok((name, op))
        }
        None => Ok((key, FilterOp::Eq)),
    }
}

fn parse_bounded(raw: Option<&str>, default: u32, max: u32) -> u32 {
    raw.and_then(|v| v.trim().parse::<u32>().ok())
        .filter(|v| *v >= 1)
        .map(|v| v.min(max))
        .unwrap_or(default)
}

fn lookup(schema: &'static [FieldSpec], name: &str) -> Option<&'static FieldSpec> {
    schema.iter().find(|spec| spec.name == name)
}

impl ListQuery {
    /// Build a query from URL parameters. `default_sort` uses the same
    /// syntax as the `sort` parameter.
    pub fn parse(
        params: &[(String, String)],
        schema: &'static [FieldSpec],
        default_sort: &str,
    ) -> Result<Self, QueryError> {
        let param = |name: &str| {
            params
                .iter()
                .rev()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str())
        };

        let mut filters = Vec::new();
        for (key, raw) in params {
            if RESERVED.contains(&key.as_str()) {
                continue;
            }
            let (name, op) = split_key(key)?;
            let field =
                lookup(schema, name).ok_or_else(|| QueryError::UnknownField(name.to_string()))?;
            let values = if op == FilterOp::In {
                raw.split(',')
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(|v| parse_value(field, v))
                    .collect::<Result<Vec<_>, _>>()?
            } else {
                vec![parse_value(field, raw)?]
            };
            filters.push(Filter { field, op, values });
        }

        let mut sort = Self::parse_sort(param("sort").unwrap_or(""), schema);
        if sort.is_empty() {
            sort = Self::parse_sort(default_sort, schema);
        }

        let fields = param("fields")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|f| !f.is_empty())
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .filter(|fields| !fields.is_empty());

        Ok(Self {
            filters,
            sort,
            fields,
            page: parse_bounded(param("page"), DEFAULT_PAGE, u32::MAX),
            limit: parse_bounded(param("limit"), DEFAULT_LIMIT, MAX_LIMIT),
        })
    }

    /// Unknown sort fields are dropped
    fn parse_sort(raw: &str, schema: &'static [FieldSpec]) -> Vec<SortKey> {
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .filter_map(|s| {
                let (name, descending) = match s.strip_prefix('-') {
                    Some(name) => (name, true),
                    None => (s, false),
                };
                lookup(schema, name).map(|field| SortKey { field, descending })
            })
            .collect()
    }

    pub fn offset(&self) -> u64 {
        (self.page as u64 - 1) * self.limit as u64
    }

    /// Append `WHERE`, `ORDER BY`, `LIMIT` and `OFFSET` clauses
    pub fn push_sql(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        for (i, filter) in self.filters.iter().enumerate() {
            qb.push(if i == 0 { " WHERE " } else { " AND " });
            qb.push(filter.field.column);
            qb.push(filter.op.sql());
            match filter.op {
                FilterOp::In => {
                    match filter.field.kind {
                        FieldKind::Timestamp => {
                            let values: Vec<DateTime<Utc>> = filter
                                .values
                                .iter()
                                .filter_map(|v| match v {
                                    FilterValue::Timestamp(ts) => Some(*ts),
                                    FilterValue::Text(_) => None,
                                })
                                .collect();
                            qb.push_bind(values);
                        }
                        FieldKind::Text | FieldKind::Choice(_) => {
                            let values: Vec<String> = filter
                                .values
                                .iter()
                                .filter_map(|v| match v {
                                    FilterValue::Text(s) => Some(s.clone()),
                                    FilterValue::Timestamp(_) => None,
                                })
                                .collect();
                            qb.push_bind(values);
                        }
                    }
                    qb.push(")");
                }
                _ => match &filter.values[0] {
                    FilterValue::Text(s) => {
                        qb.push_bind(s.clone());
                    }
                    FilterValue::Timestamp(ts) => {
                        qb.push_bind(*ts);
                    }
                },
            }
        }

        for (i, key) in self.sort.iter().enumerate() {
            qb.push(if i == 0 { " ORDER BY " } else { ", " });
            qb.push(key.field.column);
            qb.push(if key.descending { " DESC" } else { " ASC" });
        }

        qb.push(" LIMIT ");
        qb.push_bind(self.limit as i64);
        qb.push(" OFFSET ");
        qb.push_bind(self.offset() as i64);
    }

    fn matches<T: Filterable>(&self, item: &T) -> bool {
        self.filters.iter().all(|filter| {
            let Some(actual) = item.field_value(filter.field.name) else {
                return false;
            };
            let expected = &filter.values;
            match filter.op {
                FilterOp::Eq => actual == expected[0],
                FilterOp::Gt => actual > expected[0],
                FilterOp::Gte => actual >= expected[0],
                FilterOp::Lt => actual < expected[0],
                FilterOp::Lte => actual <= expected[0],
                FilterOp::In => expected.contains(&actual),
            }
        })
    }

    fn compare<T: Filterable>(&self, a: &T, b: &T) -> Ordering {
        for key in &self.sort {
            let left = a.field_value(key.field.name);
            let right = b.field_value(key.field.name);
            let ord = left.partial_cmp(&right).unwrap_or(Ordering::Equal);
            let ord = if key.descending { ord.reverse() } else { ord };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }

    /// Evaluate the query over an in-memory collection
    pub fn apply<T: Filterable>(&self, items: Vec<T>) -> Vec<T> {
        let mut matched: Vec<T> = items.into_iter().filter(|i| self.matches(i)).collect();
        matched.sort_by(|a, b| self.compare(a, b));
        matched
            .into_iter()
            .skip(self.offset() as usize)
            .take(self.limit as usize)
            .collect()
    }

    /// Keep only the selected fields of a serialized record. `id` is always kept.
    pub fn project(&self, value: Value) -> Value {
        match (&self.fields, value) {
            (Some(fields), Value::Object(map)) => Value::Object(
                map.into_iter()
                    .filter(|(k, _)| k.as_str() == "id" || fields.iter().any(|f| f == k))
                    .collect(),
            ),
            (_, value) => value,
        }
    }
}
