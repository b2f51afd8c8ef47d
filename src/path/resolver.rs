//! Path resolution with two named strategies
//!
//! [`ResolveStrategy::DirectWalk`] follows the segments literally.
//! [`ResolveStrategy::ArrayRecoveryWalk`] handles paths captured against an array that
//! now sits inside an object envelope: when the root is an object and the first segment
//! is an index, the object's array values are tried in enumeration order. The recovery
//! walk is a best-effort heuristic; it runs first and falls back to the direct walk.

use crate::path::FieldPath;
use crate::shape::parse_index;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

/// Which strategy produced a resolved value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "strategy", rename_all = "camelCase")]
pub enum ResolveStrategy {
    DirectWalk,
    /// Resolved through `root[key][index]`
    ArrayRecoveryWalk { key: String, index: usize },
}

/// A resolved node together with the strategy that reached it
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution<'a> {
    pub value: &'a Value,
    pub strategy: ResolveStrategy,
}

/// Resolve `path` against `root`; `None` means the field is absent
///
/// A present JSON `null` resolves to `Some(&Value::Null)`.
pub fn resolve<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    resolve_traced(root, path).map(|r| r.value)
}

/// Like [`resolve`], also reporting the strategy used
pub fn resolve_traced<'a>(root: &'a Value, path: &str) -> Option<Resolution<'a>> {
    resolve_path(root, &FieldPath::parse(path))
}

pub fn resolve_path<'a>(root: &'a Value, path: &FieldPath) -> Option<Resolution<'a>> {
    resolve_segments(root, path.segments())
}

fn resolve_segments<'a>(root: &'a Value, segments: &[String]) -> Option<Resolution<'a>> {
    if let Some(found) = array_recovery_walk(root, segments) {
        return Some(found);
    }
    direct_walk(root, segments).map(|value| Resolution {
        value,
        strategy: ResolveStrategy::DirectWalk,
    })
}

/// Recovery for index-first paths against an object root
///
/// Returns `None` when the root is not an object, the first segment is not an index,
/// or no array value of the object yields the remaining path.
pub fn array_recovery_walk<'a>(root: &'a Value, segments: &[String]) -> Option<Resolution<'a>> {
    let Value::Object(map) = root else {
        return None;
    };
    let (first, rest) = segments.split_first()?;
    let index = parse_index(first)?;

    for (key, value) in map {
        let Value::Array(items) = value else {
            continue;
        };
        let Some(element) = items.get(index) else {
            continue;
        };

        let found = if rest.is_empty() {
            Some(element)
        } else {
            resolve_segments(element, rest).map(|r| r.value)
        };

        if let Some(found) = found {
            debug!(key = %key, index, "resolved index-first path through object array");
            return Some(Resolution {
                value: found,
                strategy: ResolveStrategy::ArrayRecoveryWalk {
                    key: key.clone(),
                    index,
                },
            });
        }
    }

    debug!(index, "no array in object root matched index-first path");
    None
}

/// Follow the segments literally: indices into arrays, keys into objects
pub fn direct_walk<'a>(root: &'a Value, segments: &[String]) -> Option<&'a Value> {
    let mut current = root;

    for (step, segment) in segments.iter().enumerate() {
        current = match current {
            Value::Array(items) => match parse_index(segment) {
                Some(index) => match items.get(index) {
                    Some(item) => item,
                    None => {
                        debug!(step, index, len = items.len(), "array index out of bounds");
                        return None;
                    }
                },
                None => {
                    debug!(step, segment = %segment, "non-index segment on array");
                    return None;
                }
            },
            Value::Object(map) => match map.get(segment) {
                Some(value) => value,
                None => {
                    debug!(step, segment = %segment, "key not found in object");
                    return None;
                }
            },
            _ => {
                debug!(step, segment = %segment, "cannot descend into scalar");
                return None;
            }
        };
    }

    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn quote_response() -> Value {
        json!({
            "status": "ok",
            "data": [
                {"symbol": "AAPL", "price": 189.5, "meta": {"exchange": "NASDAQ"}},
                {"symbol": "MSFT", "price": 402.1, "meta": null}
            ]
        })
    }

    #[test]
    fn test_empty_path_returns_root() {
        let root = quote_response();
        assert_eq!(resolve(&root, ""), Some(&root));
        assert_eq!(resolve(&root, ".."), Some(&root));
    }

    #[test]
    fn test_dot_and_bracket_paths_agree() {
        let root = quote_response();
        assert_eq!(resolve(&root, "data[1].price"), Some(&json!(402.1)));
        assert_eq!(resolve(&root, "data.1.price"), Some(&json!(402.1)));
        assert_eq!(
            resolve(&root, "data[0].meta.exchange"),
            Some(&json!("NASDAQ"))
        );
    }

    #[test]
    fn test_null_is_found_not_missing() {
        let root = quote_response();
        assert_eq!(resolve(&root, "data[1].meta"), Some(&Value::Null));
        assert_eq!(resolve(&root, "data[1].meta.exchange"), None);
    }

    #[test]
    fn test_out_of_bounds_and_missing_keys() {
        let root = quote_response();
        assert_eq!(resolve(&root, "data[5].price"), None);
        assert_eq!(resolve(&root, "data[0].volume"), None);
        assert_eq!(resolve(&root, "status.length"), None);
        assert_eq!(resolve(&root, "data.first"), None);
    }

    #[test]
    fn test_numeric_keys_on_objects() {
        let root = json!({"series": {"0": "zero", "1": "one"}});
        assert_eq!(resolve(&root, "series.0"), Some(&json!("zero")));
        assert_eq!(resolve(&root, "series[1]"), Some(&json!("one")));
    }

    #[test]
    fn test_array_recovery_walk() {
        let root = quote_response();
        let resolution = resolve_traced(&root, "1.symbol").unwrap();
        assert_eq!(resolution.value, &json!("MSFT"));
        assert_eq!(
            resolution.strategy,
            ResolveStrategy::ArrayRecoveryWalk {
                key: "data".to_string(),
                index: 1
            }
        );

        // Index alone returns the element itself
        assert_eq!(resolve(&root, "[0]"), Some(&root["data"][0]));
    }

    #[test]
    fn test_recovery_skips_short_and_non_matching_arrays() {
        let root = json!({
            "tags": ["a"],
            "rows": [{"id": 1}, {"id": 2}],
            "other": [{"name": "x"}, {"name": "y"}]
        });
        // "tags" is too short, "rows" lacks "name", "other" matches
        let resolution = resolve_traced(&root, "1.name").unwrap();
        assert_eq!(resolution.value, &json!("y"));
        assert_eq!(
            resolution.strategy,
            ResolveStrategy::ArrayRecoveryWalk {
                key: "other".to_string(),
                index: 1
            }
        );
    }

    #[test]
    fn test_recovery_falls_back_to_direct_walk() {
        let root = json!({"0": {"price": 3}});
        let resolution = resolve_traced(&root, "0.price").unwrap();
        assert_eq!(resolution.value, &json!(3));
        assert_eq!(resolution.strategy, ResolveStrategy::DirectWalk);
    }

    #[test]
    fn test_strategies_independently() {
        let root = quote_response();
        let segments = FieldPath::parse("0.price");
        assert!(direct_walk(&root, segments.segments()).is_none());
        assert!(array_recovery_walk(&root, segments.segments()).is_some());

        let array_root = json!([[1, 2], [3, 4]]);
        assert!(array_recovery_walk(&array_root, segments.segments()).is_none());
        assert_eq!(
            direct_walk(&array_root, FieldPath::parse("[1][0]").segments()),
            Some(&json!(3))
        );
    }

    #[test]
    fn test_round_trip_along_recorded_walk() {
        let root = json!({
            "a": {"b": [10, {"c": [true, {"d": "deep"}]}]},
            "e": [[1], [2, [3]]]
        });

        // Record every walk and check the resolver reaches the same node
        fn walk(value: &Value, trail: &mut Vec<String>, root: &Value) {
            let path = FieldPath::from_segments(trail.clone());
            assert_eq!(direct_walk(root, path.segments()), Some(value));
            assert_eq!(resolve(root, &path.to_string()), Some(value));
            match value {
                Value::Array(items) => {
                    for (i, item) in items.iter().enumerate() {
                        trail.push(i.to_string());
                        walk(item, trail, root);
                        trail.pop();
                    }
                }
                Value::Object(map) => {
                    for (k, v) in map {
                        trail.push(k.clone());
                        walk(v, trail, root);
                        trail.pop();
                    }
                }
                _ => {}
            }
        }

        walk(&root, &mut Vec::new(), &root);
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let root = quote_response();
        let before = root.clone();
        let first = resolve(&root, "data[0].price").cloned();
        let second = resolve(&root, "data[0].price").cloned();
        assert_eq!(first, second);
        assert_eq!(root, before);
    }
}
