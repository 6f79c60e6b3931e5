//! Template evaluation over a synthetic context.
//!
//! A string value is an expression iff it begins with `=`. Inside the
//! expression, `{{ ... }}` segments are evaluated against the synthetic
//! node's parameters; text outside segments is literal. When the whole
//! expression is exactly one segment the evaluated value keeps its type
//! (`={{ $parameter.port }}` yields a number); otherwise segment results
//! are stringified and concatenated with the literal text. Strings without
//! the `=` marker, and all non-string scalars, pass through unchanged.
//!
//! The only root accessor is `$parameter` — the field map being resolved.
//! References always read the original map, never partially-resolved
//! output, so field order cannot change the result.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::context::SyntheticGraph;
use crate::error::{ExpressionError, FieldError, Result};

/// Matches one `{{ ... }}` segment, non-greedy, newlines allowed.
fn segment_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)\{\{(.*?)\}\}").expect("segment regex is valid"))
}

/// Resolve every embedded expression in `data`.
///
/// Builds a throwaway [`SyntheticGraph`] from `data`, then walks the map
/// recursively (objects and arrays included), replacing expression strings
/// with their evaluated values.
///
/// # Errors
///
/// The first failing expression aborts the whole resolution; no partial
/// output is returned. The error names the top-level field that failed.
pub fn resolve_map(data: &Map<String, Value>) -> std::result::Result<Map<String, Value>, FieldError> {
    resolve_map_with_context(data, data)
}

/// Resolve every embedded expression in `data`, with references reading
/// from a separately supplied `context` map.
///
/// Lets the caller expose fields to `$parameter` lookups without resolving
/// them — reserved entries that must pass through untouched stay out of
/// `data` but remain referenceable via `context`.
pub fn resolve_map_with_context(
    data: &Map<String, Value>,
    context: &Map<String, Value>,
) -> std::result::Result<Map<String, Value>, FieldError> {
    let graph = SyntheticGraph::single_node(context.clone());

    let mut resolved = Map::with_capacity(data.len());
    for (key, value) in data {
        let value = resolve_value(value, &graph).map_err(|source| FieldError {
            field: key.clone(),
            source,
        })?;
        resolved.insert(key.clone(), value);
    }

    tracing::debug!(field_count = resolved.len(), "resolved credential expressions");
    Ok(resolved)
}

/// Resolve a single value, recursing into objects and arrays.
fn resolve_value(value: &Value, graph: &SyntheticGraph) -> Result<Value> {
    match value {
        Value::String(s) => match s.strip_prefix('=') {
            Some(expression) => evaluate(expression, graph),
            None => Ok(value.clone()),
        },
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (k, v) in map {
                out.insert(k.clone(), resolve_value(v, graph)?);
            }
            Ok(Value::Object(out))
        }
        Value::Array(items) => items
            .iter()
            .map(|item| resolve_value(item, graph))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
        _ => Ok(value.clone()),
    }
}

/// Evaluate an expression body (the text after the `=` marker).
fn evaluate(expression: &str, graph: &SyntheticGraph) -> Result<Value> {
    let re = segment_regex();

    // A single segment spanning the whole expression keeps its type.
    if let Some(m) = re.captures(expression) {
        let whole = m.get(0).expect("capture 0 always present");
        if whole.start() == 0 && whole.end() == expression.len() {
            return evaluate_segment(m[1].trim(), expression, graph);
        }
    }

    // Otherwise: stringify each segment and splice it between the literal
    // parts.
    let mut out = String::with_capacity(expression.len());
    let mut last_end = 0;
    for caps in re.captures_iter(expression) {
        let whole = caps.get(0).expect("capture 0 always present");
        out.push_str(&expression[last_end..whole.start()]);
        let value = evaluate_segment(caps[1].trim(), expression, graph)?;
        out.push_str(&stringify(&value));
        last_end = whole.end();
    }
    out.push_str(&expression[last_end..]);

    Ok(Value::String(out))
}

/// Evaluate one segment body: a `$parameter` accessor path.
fn evaluate_segment(segment: &str, expression: &str, graph: &SyntheticGraph) -> Result<Value> {
    if segment.is_empty() {
        return Err(ExpressionError::EmptySegment {
            expression: expression.to_string(),
        });
    }

    let path = parse_path(segment, expression)?;

    let mut current = Value::Object(graph.parameters().clone());
    for (index, key) in path.iter().enumerate() {
        match current.get(key) {
            Some(next) => current = next.clone(),
            None => {
                return Err(ExpressionError::UnknownReference {
                    expression: expression.to_string(),
                    path: path[..=index].join("."),
                });
            }
        }
    }

    Ok(current)
}

/// Parse `$parameter.a["b"]['c']` into `["a", "b", "c"]`.
fn parse_path(segment: &str, expression: &str) -> Result<Vec<String>> {
    const ROOT: &str = "$parameter";

    let Some(mut rest) = segment.strip_prefix(ROOT) else {
        // Unknown root: report the leading token as the dangling path.
        let root: String = segment
            .chars()
            .take_while(|c| c.is_alphanumeric() || *c == '$' || *c == '_')
            .collect();
        return Err(ExpressionError::UnknownReference {
            expression: expression.to_string(),
            path: if root.is_empty() { segment.to_string() } else { root },
        });
    };

    let mut path = Vec::new();
    while !rest.is_empty() {
        if let Some(after_dot) = rest.strip_prefix('.') {
            let end = after_dot
                .find(|c: char| !(c.is_alphanumeric() || c == '_'))
                .unwrap_or(after_dot.len());
            if end == 0 {
                return Err(invalid_accessor(rest, expression));
            }
            path.push(after_dot[..end].to_string());
            rest = &after_dot[end..];
        } else if let Some(after_bracket) = rest.strip_prefix('[') {
            let Some(quote) = after_bracket.chars().next().filter(|c| *c == '"' || *c == '\'')
            else {
                return Err(invalid_accessor(rest, expression));
            };
            let body = &after_bracket[1..];
            let Some(close) = body.find(quote) else {
                return Err(invalid_accessor(rest, expression));
            };
            if !body[close + 1..].starts_with(']') {
                return Err(invalid_accessor(rest, expression));
            }
            path.push(body[..close].to_string());
            rest = &body[close + 2..];
        } else {
            return Err(invalid_accessor(rest, expression));
        }
    }

    if path.is_empty() {
        // Bare `$parameter` with no accessor is not a usable field value.
        return Err(invalid_accessor(segment, expression));
    }

    Ok(path)
}

fn invalid_accessor(accessor: &str, expression: &str) -> ExpressionError {
    ExpressionError::InvalidAccessor {
        expression: expression.to_string(),
        accessor: accessor.to_string(),
    }
}

/// Stringify an evaluated segment for splicing into surrounding text.
fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(pairs: &[(&str, Value)]) -> Map<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn plain_values_pass_through() {
        let data = map(&[
            ("host", json!("api.example.com")),
            ("port", json!(443)),
            ("secure", json!(false)),
            ("note", json!(null)),
        ]);

        let resolved = resolve_map(&data).unwrap();
        assert_eq!(resolved, data);
    }

    #[test]
    fn equals_prefix_marks_expressions() {
        let data = map(&[
            ("host", json!("api.example.com")),
            ("url", json!("=https://{{ $parameter.host }}/v2")),
        ]);

        let resolved = resolve_map(&data).unwrap();
        assert_eq!(resolved["url"], "https://api.example.com/v2");
    }

    #[test]
    fn single_segment_preserves_type() {
        let data = map(&[
            ("port", json!(8443)),
            ("port_copy", json!("={{ $parameter.port }}")),
        ]);

        let resolved = resolve_map(&data).unwrap();
        assert_eq!(resolved["port_copy"], json!(8443));
    }

    #[test]
    fn mixed_template_stringifies_segments() {
        let data = map(&[
            ("host", json!("example.com")),
            ("port", json!(8443)),
            ("endpoint", json!("=https://{{ $parameter.host }}:{{ $parameter.port }}/api")),
        ]);

        let resolved = resolve_map(&data).unwrap();
        assert_eq!(resolved["endpoint"], "https://example.com:8443/api");
    }

    #[test]
    fn bracket_accessors_and_nested_paths() {
        let data = map(&[
            ("extra", json!({"region": "eu-west-1"})),
            ("zone", json!("={{ $parameter[\"extra\"]['region'] }}")),
        ]);

        let resolved = resolve_map(&data).unwrap();
        assert_eq!(resolved["zone"], "eu-west-1");
    }

    #[test]
    fn references_read_the_original_map() {
        // `a` references `b` while `b` is itself an expression: the
        // reference must see b's stored value, not its resolved output.
        let data = map(&[
            ("a", json!("={{ $parameter.b }}")),
            ("b", json!("=literal-{{ $parameter.c }}")),
            ("c", json!("x")),
        ]);

        let resolved = resolve_map(&data).unwrap();
        assert_eq!(resolved["a"], "=literal-{{ $parameter.c }}");
        assert_eq!(resolved["b"], "literal-x");
    }

    #[test]
    fn expressions_inside_nested_structures_resolve() {
        let data = map(&[
            ("host", json!("example.com")),
            (
                "headers",
                json!({"referer": "=https://{{ $parameter.host }}", "static": "keep"}),
            ),
            ("urls", json!(["=wss://{{ $parameter.host }}/ws", "plain"])),
        ]);

        let resolved = resolve_map(&data).unwrap();
        assert_eq!(resolved["headers"]["referer"], "https://example.com");
        assert_eq!(resolved["headers"]["static"], "keep");
        assert_eq!(resolved["urls"][0], "wss://example.com/ws");
        assert_eq!(resolved["urls"][1], "plain");
    }

    #[test]
    fn unknown_reference_errors_with_field_and_path() {
        let data = map(&[("url", json!("={{ $parameter.missing }}"))]);

        let err = resolve_map(&data).unwrap_err();
        assert_eq!(err.field, "url");
        assert!(matches!(
            err.source,
            ExpressionError::UnknownReference { path, .. } if path == "missing"
        ));
    }

    #[test]
    fn unknown_root_rejected() {
        let data = map(&[("url", json!("={{ $env.HOME }}"))]);

        let err = resolve_map(&data).unwrap_err();
        assert!(matches!(
            err.source,
            ExpressionError::UnknownReference { path, .. } if path == "$env"
        ));
    }

    #[test]
    fn empty_segment_rejected() {
        let data = map(&[("url", json!("=prefix-{{ }}"))]);

        let err = resolve_map(&data).unwrap_err();
        assert!(matches!(err.source, ExpressionError::EmptySegment { .. }));
    }

    #[test]
    fn bare_parameter_root_rejected() {
        let data = map(&[("all", json!("={{ $parameter }}"))]);

        let err = resolve_map(&data).unwrap_err();
        assert!(matches!(err.source, ExpressionError::InvalidAccessor { .. }));
    }

    #[test]
    fn malformed_bracket_rejected() {
        let data = map(&[("v", json!("={{ $parameter[host] }}"))]);

        let err = resolve_map(&data).unwrap_err();
        assert!(matches!(err.source, ExpressionError::InvalidAccessor { .. }));
    }

    #[test]
    fn nested_failure_reports_top_level_field() {
        let data = map(&[(
            "headers",
            json!({"referer": "={{ $parameter.missing }}"}),
        )]);

        let err = resolve_map(&data).unwrap_err();
        assert_eq!(err.field, "headers");
    }

    #[test]
    fn expression_with_no_segments_is_literal_text() {
        // `=` marks an expression, but without segments nothing evaluates;
        // the marker is consumed and the remainder passes through.
        let data = map(&[("v", json!("=just text"))]);

        let resolved = resolve_map(&data).unwrap();
        assert_eq!(resolved["v"], "just text");
    }

    #[test]
    fn null_segment_value_stringifies_to_empty() {
        let data = map(&[
            ("maybe", json!(null)),
            ("v", json!("=x{{ $parameter.maybe }}y")),
        ]);

        let resolved = resolve_map(&data).unwrap();
        assert_eq!(resolved["v"], "xy");
    }
}
