//! Tool parameters and their canonical form.
//!
//! Cache keys must not depend on the order in which a caller inserted keys,
//! so parameters are rendered to a canonical JSON string (object keys sorted
//! recursively) before hashing. The explicit sort keeps this stable even if
//! `serde_json` is built with `preserve_order` somewhere in the dependency
//! graph.

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// Named parameters passed to a tool.
pub type ToolParams = Map<String, Value>;

/// Reserved field carrying the previous chain step's output.
pub const PREVIOUS_RESULT: &str = "previousResult";

/// Build [`ToolParams`] from a JSON value; non-objects yield `None`.
pub fn params_from_value(value: Value) -> Option<ToolParams> {
    match value {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

/// Render a JSON value with object keys sorted at every depth.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String((*key).clone()).to_string());
                out.push(':');
                write_canonical(&map[key.as_str()], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// SHA-256 hex digest of the canonical form of `params`.
pub fn params_digest(params: &ToolParams) -> String {
    let canonical = canonical_json(&Value::Object(params.clone()));
    let digest = Sha256::digest(canonical.as_bytes());
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}
