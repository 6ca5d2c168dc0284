//! JSON-Schema validation reported as plain error strings.
//!
//! Each error reads `"<dataVar><dataPath> <message>"`, with the path in
//! dotted form (`obj.spec.replicas`, `obj.items[0]`). Collects every error
//! rather than stopping at the first.

use serde_json::Value;

pub const DEFAULT_DATA_VAR: &str = "obj";

/// Validate `data` against `schema`. An empty list means valid.
///
/// A schema that does not compile produces a single error naming the
/// problem; it is never reported as "valid".
pub fn validate(schema: &Value, data: &Value, data_var: Option<&str>) -> Vec<String> {
    let data_var = data_var.unwrap_or(DEFAULT_DATA_VAR);
    let validator = match jsonschema::validator_for(schema) {
        Ok(validator) => validator,
        Err(e) => return vec![format!("{data_var} invalid schema: {e}")],
    };

    validator
        .iter_errors(data)
        .map(|error| {
            let path = dotted_path(&error.instance_path.to_string());
            format!("{data_var}{path} {error}")
        })
        .collect()
}

/// `/spec/containers/0/name` → `.spec.containers[0].name`
fn dotted_path(pointer: &str) -> String {
    pointer
        .split('/')
        .skip(1)
        .map(|segment| segment.replace("~1", "/").replace("~0", "~"))
        .map(|segment| {
            if !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()) {
                format!("[{segment}]")
            } else {
                format!(".{segment}")
            }
        })
        .collect()
}
