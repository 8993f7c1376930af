//! Search, sort and paging for grid listings.
//!
//! Records are serialized to JSON objects first, so search and sort work on
//! any field of any record type by its wire name.

use std::cmp::Ordering;
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::de::{lenient_int, lenient_string};

pub type Row = Map<String, Value>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// Anything other than `desc` (in any case) sorts ascending.
impl<'de> Deserialize<'de> for SortDirection {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(s) if s.trim().eq_ignore_ascii_case("desc") => Self::Desc,
            _ => Self::Asc,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchParams {
    /// 1-based page number.
    #[serde(deserialize_with = "lenient_int")]
    pub current: usize,
    /// Page size; zero or negative returns every row.
    #[serde(rename = "rowCount", deserialize_with = "lenient_int")]
    pub row_count: i64,
    #[serde(rename = "searchPhrase", deserialize_with = "lenient_string")]
    pub search_phrase: String,
    /// Field -> direction in request order. Only the first field is honoured.
    #[serde(deserialize_with = "sort_fields")]
    pub sort: Vec<(String, SortDirection)>,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            current: 1,
            row_count: -1,
            search_phrase: String::new(),
            sort: Vec::new(),
        }
    }
}

/// Decode the `sort` object keeping the order its keys were sent in.
fn sort_fields<'de, D>(deserializer: D) -> Result<Vec<(String, SortDirection)>, D::Error>
where
    D: Deserializer<'de>,
{
    struct SortFields;

    impl<'de> Visitor<'de> for SortFields {
        type Value = Vec<(String, SortDirection)>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("an object of field names to sort directions")
        }

        fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut fields = Vec::new();
            while let Some(entry) = map.next_entry::<String, SortDirection>()? {
                fields.push(entry);
            }
            Ok(fields)
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(Vec::new())
        }
    }

    deserializer.deserialize_any(SortFields)
}

impl SearchParams {
    fn sort_key<'a>(&'a self, default_field: &'a str) -> (&'a str, SortDirection) {
        self.sort
            .first()
            .map(|(field, dir)| (field.as_str(), *dir))
            .unwrap_or((default_field, SortDirection::Asc))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Recordset {
    /// Rows matching search and filter, before paging.
    pub total: usize,
    /// Rows on this page.
    #[serde(rename = "rowCount")]
    pub row_count: usize,
    pub current: usize,
    pub rows: Vec<Row>,
}

/// Filter, sort and page `records`.
///
/// `filter` runs on the typed record; the search phrase matches any field,
/// case-insensitively.
pub fn search<T, F>(records: &[T], params: &SearchParams, default_sort: &str, filter: F) -> Recordset
where
    T: Serialize,
    F: Fn(&T) -> bool,
{
    let phrase = params.search_phrase.trim().to_lowercase();

    let mut rows: Vec<Row> = records
        .iter()
        .filter(|record| filter(record))
        .filter_map(|record| match serde_json::to_value(record) {
            Ok(Value::Object(row)) => Some(row),
            _ => None,
        })
        .filter(|row| phrase.is_empty() || row_matches(row, &phrase))
        .collect();

    let (field, direction) = params.sort_key(default_sort);
    rows.sort_by(|a, b| {
        let ord = compare_values(a.get(field), b.get(field));
        match direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    });

    let total = rows.len();
    let current = params.current.max(1);
    let rows: Vec<Row> = match usize::try_from(params.row_count) {
        Ok(size) if size > 0 => rows
            .into_iter()
            .skip((current - 1).saturating_mul(size))
            .take(size)
            .collect(),
        _ => rows,
    };

    Recordset {
        total,
        row_count: rows.len(),
        current,
        rows,
    }
}

fn row_matches(row: &Row, phrase: &str) -> bool {
    row.values().any(|value| match value {
        Value::String(s) => s.to_lowercase().contains(phrase),
        Value::Number(n) => n.to_string().contains(phrase),
        Value::Bool(b) => b.to_string().contains(phrase),
        _ => false,
    })
}

fn sort_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

fn as_number(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|f| f.is_finite())
}

/// Numbers compare numerically and sort before text; text compares bytewise.
/// Missing fields compare as empty text.
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let (a, b) = (sort_text(a), sort_text(b));
    match (as_number(&a), as_number(&b)) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(&b),
    }
}
