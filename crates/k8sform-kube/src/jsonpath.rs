//! Minimal JSONPath evaluation for wait conditions
//!
//! Supports the subset kubectl users write in `--for=jsonpath=...`: dotted fields, quoted
//! keys, list indices and equality filters, optionally wrapped in `{}` and prefixed with `$`.
//!
//! ```text
//! {.status.phase}
//! .status.conditions[?(@.type=="Ready")].status
//! $.metadata.annotations['hive.openshift.io/managed']
//! ```

use serde_json::Value as JsonValue;

use crate::error::{KubeError, Result};

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Field(String),
    Index(usize),
    /// `[?(@.a.b=="v")]`
    Filter { path: Vec<String>, value: String },
}

/// Parsed JSONPath expression
#[derive(Debug, Clone, PartialEq)]
pub struct JsonPath {
    expression: String,
    segments: Vec<Segment>,
}

impl JsonPath {
    pub fn parse(expression: &str) -> Result<Self> {
        let invalid = |message: &str| KubeError::InvalidJsonPath {
            expression: expression.to_string(),
            message: message.to_string(),
        };

        let mut body = expression.trim();
        if let Some(inner) = body.strip_prefix('{') {
            body = inner
                .strip_suffix('}')
                .ok_or_else(|| invalid("unbalanced braces"))?
                .trim();
        }
        body = body.strip_prefix('$').unwrap_or(body);
        if body.is_empty() {
            return Err(invalid("empty path"));
        }

        let chars: Vec<char> = body.chars().collect();
        let mut segments = Vec::new();
        let mut i = 0;

        // A bare leading field (`status.phase`) is accepted like `.status.phase`
        if chars[0] != '.' && chars[0] != '[' {
            let (field, next) = read_field(&chars, 0);
            segments.push(Segment::Field(field));
            i = next;
        }

        while i < chars.len() {
            match chars[i] {
                '.' => {
                    let (field, next) = read_field(&chars, i + 1);
                    if field.is_empty() {
                        return Err(invalid("empty field name"));
                    }
                    segments.push(Segment::Field(field));
                    i = next;
                }
                '[' => {
                    let close = find_bracket_end(&chars, i).ok_or_else(|| invalid("unclosed '['"))?;
                    let inner: String = chars[i + 1..close].iter().collect();
                    segments.push(parse_bracket(inner.trim()).map_err(|m| invalid(&m))?);
                    i = close + 1;
                }
                c => return Err(invalid(&format!("unexpected character '{}'", c))),
            }
        }

        Ok(Self {
            expression: expression.to_string(),
            segments,
        })
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Every value the path selects in `root`
    pub fn select<'a>(&self, root: &'a JsonValue) -> Vec<&'a JsonValue> {
        let mut current = vec![root];
        for segment in &self.segments {
            let mut next = Vec::new();
            for value in current {
                match segment {
                    Segment::Field(name) => {
                        if let Some(v) = value.get(name.as_str()) {
                            next.push(v);
                        }
                    }
                    Segment::Index(idx) => {
                        if let Some(v) = value.get(*idx) {
                            next.push(v);
                        }
                    }
                    Segment::Filter { path, value: expected } => {
                        if let JsonValue::Array(items) = value {
                            next.extend(items.iter().filter(|item| {
                                lookup(item, path).is_some_and(|v| render(v) == *expected)
                            }));
                        }
                    }
                }
            }
            current = next;
        }
        current
    }

    /// Whether the path selects something (equal to `expected` when given)
    ///
    /// Without an expected value any non-null selection counts.
    pub fn matches(&self, root: &JsonValue, expected: Option<&str>) -> bool {
        let selected = self.select(root);
        match expected {
            Some(expected) => selected.iter().any(|v| render(v) == expected),
            None => selected.iter().any(|v| !v.is_null()),
        }
    }
}

/// String form of a selected value as compared against the expected value
pub fn render(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        JsonValue::Null => String::new(),
        other => other.to_string(),
    }
}

fn read_field(chars: &[char], start: usize) -> (String, usize) {
    let mut end = start;
    while end < chars.len() && chars[end] != '.' && chars[end] != '[' {
        end += 1;
    }
    (chars[start..end].iter().collect(), end)
}

fn find_bracket_end(chars: &[char], open: usize) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (offset, c) in chars[open + 1..].iter().enumerate() {
        match (quote, *c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(*c),
            (None, ']') => return Some(open + 1 + offset),
            (None, _) => {}
        }
    }
    None
}

fn parse_bracket(inner: &str) -> std::result::Result<Segment, String> {
    if let Some(filter) = inner.strip_prefix('?') {
        let expr = filter
            .trim()
            .strip_prefix('(')
            .and_then(|s| s.strip_suffix(')'))
            .ok_or_else(|| "filter must be written as ?(...)".to_string())?;
        let (lhs, rhs) = expr
            .split_once("==")
            .ok_or_else(|| "only == filters are supported".to_string())?;
        let path: Vec<String> = lhs
            .trim()
            .strip_prefix("@.")
            .ok_or_else(|| "filter must start with @.".to_string())?
            .split('.')
            .map(str::to_string)
            .collect();
        if path.iter().any(String::is_empty) {
            return Err("empty field name in filter".to_string());
        }
        return Ok(Segment::Filter {
            path,
            value: unquote(rhs.trim()).to_string(),
        });
    }

    if inner.starts_with('\'') || inner.starts_with('"') {
        let key = unquote(inner);
        if key.len() == inner.len() {
            return Err("unterminated quoted key".to_string());
        }
        return Ok(Segment::Field(key.to_string()));
    }

    inner
        .parse::<usize>()
        .map(Segment::Index)
        .map_err(|_| format!("unsupported selector '[{}]'", inner))
}

fn unquote(s: &str) -> &str {
    for q in ['\'', '"'] {
        if let Some(inner) = s.strip_prefix(q).and_then(|r| r.strip_suffix(q)) {
            return inner;
        }
    }
    s
}

fn lookup<'a>(value: &'a JsonValue, path: &[String]) -> Option<&'a JsonValue> {
    path.iter().try_fold(value, |v, field| v.get(field.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object() -> JsonValue {
        json!({
            "metadata": {
                "name": "pool-a",
                "annotations": { "hive.openshift.io/managed": "true" }
            },
            "status": {
                "phase": "Ready",
                "replicas": 3,
                "conditions": [
                    { "type": "Progressing", "status": "False" },
                    { "type": "Ready", "status": "True" }
                ],
                "machineSets": [ { "name": "ms-0" }, { "name": "ms-1" } ]
            }
        })
    }

    #[test]
    fn test_dotted_paths_in_all_spellings() {
        for expr in ["{.status.phase}", ".status.phase", "$.status.phase", "status.phase"] {
            let path = JsonPath::parse(expr).unwrap();
            assert!(path.matches(&object(), Some("Ready")), "{}", expr);
        }
    }

    #[test]
    fn test_numbers_render_as_text() {
        let path = JsonPath::parse("{.status.replicas}").unwrap();
        assert!(path.matches(&object(), Some("3")));
        assert!(!path.matches(&object(), Some("4")));
    }

    #[test]
    fn test_index_and_quoted_key() {
        let path = JsonPath::parse(".status.machineSets[1].name").unwrap();
        assert_eq!(path.select(&object()), vec![&json!("ms-1")]);

        let path = JsonPath::parse(".metadata.annotations['hive.openshift.io/managed']").unwrap();
        assert!(path.matches(&object(), Some("true")));
    }

    #[test]
    fn test_filter() {
        let path = JsonPath::parse(r#"{.status.conditions[?(@.type=="Ready")].status}"#).unwrap();
        assert!(path.matches(&object(), Some("True")));

        let path = JsonPath::parse(".status.conditions[?(@.type=='Missing')].status").unwrap();
        assert!(!path.matches(&object(), None));
    }

    #[test]
    fn test_existence_without_value() {
        assert!(JsonPath::parse(".status.phase").unwrap().matches(&object(), None));
        assert!(!JsonPath::parse(".status.installed").unwrap().matches(&object(), None));
        assert!(!JsonPath::parse(".status.phase").unwrap().matches(&json!({}), None));
    }

    #[test]
    fn test_invalid_expressions() {
        for bad in ["", "{}", "{.status", ".status..phase", ".status[*]", ".status[?(@.a>1)]", ".a['b]"] {
            let err = JsonPath::parse(bad).unwrap_err();
            assert!(matches!(err, KubeError::InvalidJsonPath { .. }), "{}: {:?}", bad, err);
        }
    }
}
