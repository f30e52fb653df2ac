//! Filter conversion to Qdrant `Filter`.

use crate::record::RagFilter;
use qdrant_client::qdrant::{Condition, Filter};
use tracing::debug;

/// Converts [`RagFilter`] to a Qdrant `must` filter.
///
/// Supported value types:
/// - `String` → keyword match
/// - integer `Number` → integer match
/// - `Bool` → boolean match
///
/// Other values are skipped with a debug log.
pub fn to_qdrant_filter(f: &RagFilter) -> Filter {
    let mut must: Vec<Condition> = Vec::with_capacity(f.equals.len());

    for (field, val) in &f.equals {
        let cond = match val {
            serde_json::Value::String(s) => Condition::matches(field.as_str(), s.clone()),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Condition::matches(field.as_str(), i),
                None => {
                    debug!(field = %field, "skipping non-integer number in filter");
                    continue;
                }
            },
            serde_json::Value::Bool(b) => Condition::matches(field.as_str(), *b),
            _ => {
                debug!(field = %field, "skipping unsupported filter value");
                continue;
            }
        };
        must.push(cond);
    }

    Filter::must(must)
}
