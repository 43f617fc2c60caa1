//! In-process filter matching and result shaping.
//!
//! Filters are top-level equality only: a document matches when every
//! `(field, value)` pair in the filter equals the document's field.

use std::cmp::Ordering;

use serde_json::Value;

use muster_core::{QueryOptions, SortOrder};

/// Whether a document matches a top-level equality filter.
pub fn matches_filter(doc: &Value, filter: &serde_json::Map<String, Value>) -> bool {
    filter
        .iter()
        .all(|(field, expected)| doc.get(field) == Some(expected))
}

/// Apply sort, skip and limit in place.
pub fn apply_options(docs: &mut Vec<Value>, options: &QueryOptions) {
    if let Some(field) = &options.sort {
        docs.sort_by(|a, b| {
            let ord = compare_values(a.get(field), b.get(field));
            match options.order {
                SortOrder::Asc => ord,
                SortOrder::Desc => ord.reverse(),
            }
        });
    }

    if let Some(skip) = options.skip {
        if skip >= docs.len() {
            docs.clear();
        } else {
            docs.drain(..skip);
        }
    }

    if let Some(limit) = options.limit {
        docs.truncate(limit);
    }
}

/// Total order over scalar JSON values for sorting.
///
/// Null < Bool < Number < String; arrays/objects compare equal to each
/// other and sort last. Missing fields sort first.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let (a, b) = match (a, b) {
        (None, None) => return Ordering::Equal,
        (None, Some(_)) => return Ordering::Less,
        (Some(_), None) => return Ordering::Greater,
        (Some(a), Some(b)) => (a, b),
    };

    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

fn rank(v: &Value) -> u8 {
    match v {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) | Value::Object(_) => 4,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_matches_filter() {
        let doc = json!({"kind": "camp", "year": 2025});
        let mut filter = serde_json::Map::new();
        assert!(matches_filter(&doc, &filter));

        filter.insert("kind".into(), json!("camp"));
        assert!(matches_filter(&doc, &filter));

        filter.insert("year".into(), json!(2024));
        assert!(!matches_filter(&doc, &filter));

        filter.clear();
        filter.insert("missing".into(), json!("x"));
        assert!(!matches_filter(&doc, &filter));
    }

    #[test]
    fn test_sort_mixed_types() {
        let mut docs = vec![
            json!({"v": "b"}),
            json!({"v": 2}),
            json!({"w": 1}),
            json!({"v": true}),
            json!({"v": "a"}),
        ];
        apply_options(
            &mut docs,
            &QueryOptions {
                sort: Some("v".into()),
                ..Default::default()
            },
        );
        // missing < bool < number < strings
        assert_eq!(docs[0], json!({"w": 1}));
        assert_eq!(docs[1], json!({"v": true}));
        assert_eq!(docs[2], json!({"v": 2}));
        assert_eq!(docs[3], json!({"v": "a"}));
        assert_eq!(docs[4], json!({"v": "b"}));
    }

    #[test]
    fn test_skip_past_end_clears() {
        let mut docs = vec![json!({"id": 1}), json!({"id": 2})];
        apply_options(
            &mut docs,
            &QueryOptions {
                skip: Some(5),
                ..Default::default()
            },
        );
        assert!(docs.is_empty());
    }
}
