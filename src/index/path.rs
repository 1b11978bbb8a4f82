//! Dotted path resolution over JSON records

use serde_json::Value;

/// Resolve a dotted path to a single value.
///
/// Numeric segments index into arrays. Returns None if any segment is absent.
pub fn resolve_path<'v>(record: &'v Value, path: &str) -> Option<&'v Value> {
    let mut current = record;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Collect every value reachable at a dotted path.
///
/// Arrays met along the way fan out over their elements, and an array at the
/// end of the path contributes its elements as well as itself. Missing
/// segments contribute nothing.
pub fn collect_values<'v>(record: &'v Value, path: &str) -> Vec<&'v Value> {
    let segments: Vec<&str> = path.split('.').collect();
    let mut out = Vec::new();
    collect_into(record, &segments, &mut out);
    out
}

fn collect_into<'v>(current: &'v Value, segments: &[&str], out: &mut Vec<&'v Value>) {
    let Some((head, rest)) = segments.split_first() else {
        out.push(current);
        if let Value::Array(items) = current {
            out.extend(items.iter());
        }
        return;
    };

    match current {
        Value::Object(map) => {
            if let Some(next) = map.get(*head) {
                collect_into(next, rest, out);
            }
        }
        Value::Array(items) => {
            if let Ok(position) = head.parse::<usize>() {
                if let Some(next) = items.get(position) {
                    collect_into(next, rest, out);
                }
            }
            for item in items {
                if item.is_object() {
                    collect_into(item, segments, out);
                }
            }
        }
        _ => {}
    }
}
