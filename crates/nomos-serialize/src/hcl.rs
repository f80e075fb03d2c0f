// SPDX-License-Identifier: MIT OR Apache-2.0
//! HCL-tfvars rendering (spec §4.13): top-level `key = value` lines,
//! nested mappings and sequences rendered inline.

/// Render a canonicalized, already key-validated root object as a
/// `.tfvars`-style assignment list: one sorted `key = value` line per
/// top-level entry, newline-terminated.
///
/// `root` must be a JSON object — the only shape `to_canonical` ever
/// produces at the top level (a `Snapshot.data` mapping, optionally
/// wrapped in `{data, metadata}`).
pub fn render(root: &serde_json::Value) -> String {
    let map = root.as_object().expect("tfvars root is always an object");
    let mut out = String::new();
    for (key, value) in map {
        out.push_str(key);
        out.push_str(" = ");
        out.push_str(&render_value(value));
        out.push('\n');
    }
    out
}

fn render_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => "null".to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::String(s) => render_string(s),
        serde_json::Value::Array(items) => render_sequence(items),
        serde_json::Value::Object(map) => render_mapping(map),
    }
}

fn render_string(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len() + 2);
    escaped.push('"');
    for c in s.chars() {
        match c {
            '"' => escaped.push_str("\\\""),
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            other => escaped.push(other),
        }
    }
    escaped.push('"');
    escaped
}

fn render_sequence(items: &[serde_json::Value]) -> String {
    if items.is_empty() {
        return "[]".to_string();
    }
    let rendered: Vec<String> = items.iter().map(render_value).collect();
    format!("[ {} ]", rendered.join(", "))
}

fn render_mapping(map: &serde_json::Map<String, serde_json::Value>) -> String {
    if map.is_empty() {
        return "{}".to_string();
    }
    let entries: Vec<String> = map
        .iter()
        .map(|(k, v)| format!("{k} = {}", render_value(v)))
        .collect();
    format!("{{ {} }}", entries.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scalars_render_unquoted_except_strings() {
        assert_eq!(render_value(&json!(1)), "1");
        assert_eq!(render_value(&json!(1.5)), "1.5");
        assert_eq!(render_value(&json!(true)), "true");
        assert_eq!(render_value(&json!(null)), "null");
        assert_eq!(render_value(&json!("x")), "\"x\"");
    }

    #[test]
    fn empty_sequence_and_mapping_have_no_interior_padding() {
        assert_eq!(render_value(&json!([])), "[]");
        assert_eq!(render_value(&json!({})), "{}");
    }

    #[test]
    fn non_empty_sequence_and_mapping_render_with_padding() {
        assert_eq!(render_value(&json!([1, 2])), "[ 1, 2 ]");
        assert_eq!(render_value(&json!({"a": 1})), "{ a = 1 }");
    }

    #[test]
    fn top_level_renders_one_assignment_per_key() {
        let root = json!({"a": 1, "b": "x"});
        assert_eq!(render(&root), "a = 1\nb = \"x\"\n");
    }
}
