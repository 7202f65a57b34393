//! In-memory filter, sort and pagination over an already loaded collection.

pub mod state;

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Serialize;
use serde_json::Value;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::collection::{FieldKind, FieldMap, ViewRow};

pub use state::{ListState, SortState};

/// How rows of type `T` are searched and compared
pub trait ViewSchema<T> {
    /// Concatenated searchable text of a row (not yet lowercased)
    fn search_text(&self, row: &T) -> String;

    /// Ascending comparison on a single key
    fn compare(&self, a: &T, b: &T, key: &str) -> Ordering;
}

/// Searchable fields and field kinds of a [`ViewRow`] collection
#[derive(Debug, Clone, Default)]
pub struct ViewSpec {
    pub searchable: Vec<String>,
    pub kinds: BTreeMap<String, FieldKind>,
}

impl ViewSpec {
    pub fn from_field_map(map: &FieldMap) -> Self {
        let kinds = map.fields().iter().map(|f| (f.name.clone(), f.kind)).collect();
        Self {
            searchable: map.searchable_fields(),
            kinds,
        }
    }
}

impl ViewSchema<ViewRow> for ViewSpec {
    fn search_text(&self, row: &ViewRow) -> String {
        self.searchable.iter().map(|f| row.text(f)).collect::<Vec<_>>().join(" ")
    }

    fn compare(&self, a: &ViewRow, b: &ViewRow, key: &str) -> Ordering {
        match self.kinds.get(key).copied().unwrap_or(FieldKind::Text) {
            FieldKind::Number => compare_numbers(a.number(key).unwrap_or(0.0), b.number(key).unwrap_or(0.0)),
            FieldKind::Date => timestamp_millis(a.get(key)).cmp(&timestamp_millis(b.get(key))),
            FieldKind::Bool => a.get(key).and_then(Value::as_bool).cmp(&b.get(key).and_then(Value::as_bool)),
            FieldKind::Text | FieldKind::Json => compare_text(&a.text(key), &b.text(key)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewQuery {
    pub query: String,
    pub sort_key: Option<String>,
    pub sort_asc: bool,
    pub page: usize,
    pub page_size: usize,
}

impl Default for ViewQuery {
    fn default() -> Self {
        Self {
            query: String::new(),
            sort_key: None,
            sort_asc: true,
            page: 1,
            page_size: 10,
        }
    }
}

/// One page of the derived collection
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewPage<T> {
    pub rows: Vec<T>,
    pub page: usize,
    pub page_count: usize,
    /// Rows matching the query across all pages
    pub total: usize,
}

/// Filter, sort, then slice out the requested page. The input is untouched.
pub fn transform<T: Clone, S: ViewSchema<T>>(rows: &[T], schema: &S, query: &ViewQuery) -> ViewPage<T> {
    let ordered = filter_and_sort(rows, schema, query);
    let page_size = query.page_size.max(1);
    let total = ordered.len();
    let page_count = page_count(total, page_size);
    let page = query.page.clamp(1, page_count);
    let rows = ordered
        .into_iter()
        .skip((page - 1) * page_size)
        .take(page_size)
        .collect();
    ViewPage { rows, page, page_count, total }
}

/// The filtered and sorted collection before pagination
pub fn filter_and_sort<T: Clone, S: ViewSchema<T>>(rows: &[T], schema: &S, query: &ViewQuery) -> Vec<T> {
    let mut out = filter_rows(rows, schema, &query.query);
    if let Some(key) = &query.sort_key {
        sort_rows(&mut out, schema, key, query.sort_asc);
    }
    out
}

/// Case-insensitive substring match. Surrounding whitespace of the query is
/// ignored, inner whitespace is matched as typed.
pub fn filter_rows<T: Clone, S: ViewSchema<T>>(rows: &[T], schema: &S, query: &str) -> Vec<T> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return rows.to_vec();
    }
    rows.iter()
        .filter(|row| schema.search_text(row).to_lowercase().contains(&needle))
        .cloned()
        .collect()
}

/// Stable sort; descending reverses the comparison so ties keep input order
pub fn sort_rows<T, S: ViewSchema<T>>(rows: &mut [T], schema: &S, key: &str, ascending: bool) {
    rows.sort_by(|a, b| {
        let cmp = schema.compare(a, b, key);
        if ascending { cmp } else { cmp.reverse() }
    });
}

pub fn page_count(total: usize, page_size: usize) -> usize {
    total.div_ceil(page_size.max(1)).max(1)
}

/// Every page of the filtered and sorted collection, in order
pub fn pages<T: Clone, S: ViewSchema<T>>(rows: &[T], schema: &S, query: &ViewQuery) -> Vec<Vec<T>> {
    filter_and_sort(rows, schema, query)
        .chunks(query.page_size.max(1))
        .map(|chunk| chunk.to_vec())
        .collect()
}

/// Three-level text collation: base letters, then accents, then case.
///
/// Letters with diacritics sort with their base letter (`Ç` beside `C`, not
/// after `z`). Only identical strings compare equal.
pub fn compare_text(a: &str, b: &str) -> Ordering {
    primary_key(a)
        .cmp(&primary_key(b))
        .then_with(|| secondary_key(a).cmp(&secondary_key(b)))
        .then_with(|| a.cmp(b))
}

fn primary_key(s: &str) -> String {
    let mut key = String::with_capacity(s.len());
    for c in s.nfd().filter(|c| !is_combining_mark(*c)).flat_map(char::to_lowercase) {
        // Letters with no canonical decomposition
        match c {
            'ı' => key.push('i'),
            'ß' => key.push_str("ss"),
            'æ' => key.push_str("ae"),
            'œ' => key.push_str("oe"),
            'ø' => key.push('o'),
            'ł' => key.push('l'),
            'đ' | 'ð' => key.push('d'),
            'þ' => key.push_str("th"),
            other => key.push(other),
        }
    }
    key
}

fn secondary_key(s: &str) -> String {
    s.nfd().flat_map(char::to_lowercase).collect()
}

fn compare_numbers(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

/// Milliseconds since the epoch; missing or unparseable dates are 0
pub fn timestamp_millis(value: Option<&Value>) -> i64 {
    match value {
        Some(Value::String(s)) => parse_timestamp(s).unwrap_or(0),
        Some(Value::Number(n)) => n.as_i64().unwrap_or(0),
        _ => 0,
    }
}

fn parse_timestamp(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.timestamp_millis());
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt.and_utc().timestamp_millis());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::FieldSpec;
    use serde_json::json;

    fn spec_and_rows() -> (ViewSpec, Vec<ViewRow>) {
        let map = FieldMap::new(
            1,
            vec![
                FieldSpec::id(&["id"]),
                FieldSpec::text("name", &["name"]).searchable(),
                FieldSpec::text("status", &["status"]).searchable(),
                FieldSpec::number("total", &["total"]),
                FieldSpec::date("placed", &["placed_at"]),
            ],
        )
        .unwrap();
        let rows = map.map_records(&[
            json!({ "id": "1", "name": "Bravo", "status": "Delivered", "total": 30, "placed_at": "2024-03-01T10:00:00Z" }),
            json!({ "id": "2", "name": "alpha", "status": "pending", "total": 5, "placed_at": "2024-01-15" }),
            json!({ "id": "3", "name": "Charlie", "status": "Pending", "total": 12.5, "placed_at": "not a date" }),
            json!({ "id": "4", "name": "Alpha", "status": "cancelled", "placed_at": "2024-02-01 08:30:00" }),
            json!({ "id": "5", "name": "delta", "status": "delivered", "total": 30 }),
        ]);
        (ViewSpec::from_field_map(&map), rows)
    }

    fn ids(rows: &[ViewRow]) -> Vec<&str> {
        rows.iter().map(|r| r.id.as_str()).collect()
    }

    fn sorted(rows: &[ViewRow], spec: &ViewSpec, key: &str, asc: bool) -> Vec<ViewRow> {
        let mut out = rows.to_vec();
        sort_rows(&mut out, spec, key, asc);
        out
    }

    #[test]
    fn filter_matches_every_searchable_field() {
        let (spec, rows) = spec_and_rows();
        let page = transform(&rows, &spec, &ViewQuery { query: "PEND".into(), ..ViewQuery::default() });
        assert_eq!(ids(&page.rows), vec!["2", "3"]);

        for q in ["alpha", "deliv", "a", "zzz", ""] {
            let matched = filter_rows(&rows, &spec, q);
            let expected: Vec<&ViewRow> = rows
                .iter()
                .filter(|r| spec.search_text(r).to_lowercase().contains(&q.to_lowercase()))
                .collect();
            assert_eq!(matched.len(), expected.len(), "query {:?}", q);
        }
    }

    #[test]
    fn empty_query_keeps_everything_in_order() {
        let (spec, rows) = spec_and_rows();
        let page = transform(&rows, &spec, &ViewQuery { page_size: 100, ..ViewQuery::default() });
        assert_eq!(ids(&page.rows), vec!["1", "2", "3", "4", "5"]);
    }

    #[test]
    fn text_sort_is_case_insensitive() {
        let (spec, rows) = spec_and_rows();
        assert_eq!(ids(&sorted(&rows, &spec, "name", true)), vec!["4", "2", "1", "3", "5"]);
    }

    #[test]
    fn accented_letters_sort_with_their_base_letter() {
        let mut names = vec!["Zonguldak", "Çorum", "Denizli", "Ürgüp", "Ankara", "Şanlıurfa", "Sivas", "Iğdır", "İzmir"];
        names.sort_by(|a, b| compare_text(a, b));
        assert_eq!(
            names,
            vec!["Ankara", "Çorum", "Denizli", "Iğdır", "İzmir", "Şanlıurfa", "Sivas", "Ürgüp", "Zonguldak"]
        );
    }

    #[test]
    fn accents_then_case_break_ties() {
        assert_eq!(compare_text("Corum", "Çorum"), Ordering::Less);
        // Uppercase first on an exact letter tie
        assert_eq!(compare_text("Çorum", "çorum"), Ordering::Less);
        assert_ne!(compare_text("Straße", "Strasse"), Ordering::Equal);
        assert_eq!(compare_text("Ürgüp", "Ürgüp"), Ordering::Equal);
        assert_eq!(compare_text("Oslo", "Øystese"), Ordering::Less);
    }

    #[test]
    fn query_whitespace_is_trimmed_but_not_collapsed() {
        let (spec, rows) = spec_and_rows();
        assert_eq!(ids(&filter_rows(&rows, &spec, "  charlie  ")), vec!["3"]);
        assert_eq!(filter_rows(&rows, &spec, "   ").len(), rows.len());
        // Searchable fields are joined by one space
        assert_eq!(ids(&filter_rows(&rows, &spec, "alpha pending")), vec!["2"]);
        assert!(filter_rows(&rows, &spec, "alpha  pending").is_empty());
    }

    #[test]
    fn numeric_sort_treats_missing_as_zero() {
        let (spec, rows) = spec_and_rows();
        assert_eq!(ids(&sorted(&rows, &spec, "total", true)), vec!["4", "2", "3", "1", "5"]);
    }

    #[test]
    fn invalid_dates_sort_first_ascending() {
        let (spec, rows) = spec_and_rows();
        assert_eq!(ids(&sorted(&rows, &spec, "placed", true)), vec!["3", "5", "2", "4", "1"]);
    }

    #[test]
    fn descending_reverses_ascending_apart_from_ties() {
        let (spec, rows) = spec_and_rows();
        for key in ["name", "status"] {
            let mut asc = sorted(&rows, &spec, key, true);
            asc.reverse();
            assert_eq!(ids(&asc), ids(&sorted(&rows, &spec, key, false)), "key {}", key);
        }
        // 1 and 5 tie on total; both directions keep their input order
        let desc = sorted(&rows, &spec, "total", false);
        assert_eq!(ids(&desc), vec!["1", "5", "3", "2", "4"]);
    }

    #[test]
    fn page_clamps_into_range() {
        let (spec, rows) = spec_and_rows();
        let query = ViewQuery { page_size: 2, page: 99, ..ViewQuery::default() };
        let page = transform(&rows, &spec, &query);
        assert_eq!(page.page, 3);
        assert_eq!(page.page_count, 3);
        assert_eq!(ids(&page.rows), vec!["5"]);

        let first = transform(&rows, &spec, &ViewQuery { page: 0, page_size: 2, ..ViewQuery::default() });
        assert_eq!(first.page, 1);

        let none = transform(&rows, &spec, &ViewQuery { query: "zzz".into(), page: 4, ..ViewQuery::default() });
        assert_eq!((none.page, none.page_count, none.total), (1, 1, 0));
    }

    #[test]
    fn concatenated_pages_reproduce_the_collection() {
        let (spec, rows) = spec_and_rows();
        let query = ViewQuery {
            query: "a".into(),
            sort_key: Some("total".into()),
            sort_asc: false,
            page: 1,
            page_size: 2,
        };
        let flat: Vec<ViewRow> = pages(&rows, &spec, &query).into_iter().flatten().collect();
        assert_eq!(flat, filter_and_sort(&rows, &spec, &query));
    }

    #[test]
    fn transform_leaves_input_untouched() {
        let (spec, rows) = spec_and_rows();
        let before = rows.clone();
        let query = ViewQuery { sort_key: Some("name".into()), sort_asc: false, ..ViewQuery::default() };
        let _ = transform(&rows, &spec, &query);
        assert_eq!(rows, before);
    }

    #[test]
    fn timestamp_formats() {
        assert_eq!(timestamp_millis(Some(&json!("1970-01-01T00:00:01Z"))), 1000);
        assert_eq!(timestamp_millis(Some(&json!("1970-01-02"))), 86_400_000);
        assert_eq!(timestamp_millis(Some(&json!("yesterday"))), 0);
        assert_eq!(timestamp_millis(None), 0);
    }
}
