use crate::error::{AppError, AppResult};
use colored::{ColoredString, Colorize};
use serde_json::Value;
use std::fmt::Write as _;

const INDENT: &str = "  ";

/// Parses `body` as JSON and pretty-prints it. Without color the result is
/// exactly `serde_json::to_string_pretty`.
pub fn render_json(body: &[u8], colorize: bool) -> AppResult<String> {
    let json = serde_json::from_slice::<Value>(body).map_err(|cause| AppError::NotJson {
        cause,
        raw: String::from_utf8_lossy(body).into_owned(),
    })?;

    if !colorize {
        return serde_json::to_string_pretty(&json)
            .map_err(|e| AppError::Output(anyhow::anyhow!("Failed to format JSON: {}", e)));
    }

    let mut out = String::with_capacity(body.len() * 2);
    write_colored(&mut out, &json, 0);
    Ok(out)
}

fn write_colored(out: &mut String, value: &Value, depth: usize) {
    match value {
        Value::Null => push(out, "null".black().bold()),
        Value::Bool(b) => push(out, b.to_string().yellow()),
        Value::Number(n) => push(out, n.to_string().cyan()),
        Value::String(s) => push(out, quoted(s).green()),
        Value::Array(items) if items.is_empty() => out.push_str("[]"),
        Value::Object(map) if map.is_empty() => out.push_str("{}"),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                separator(out, i, depth + 1);
                write_colored(out, item, depth + 1);
            }
            close(out, depth, ']');
        }
        Value::Object(map) => {
            out.push('{');
            for (i, (key, item)) in map.iter().enumerate() {
                separator(out, i, depth + 1);
                push(out, quoted(key).blue().bold());
                out.push_str(": ");
                write_colored(out, item, depth + 1);
            }
            close(out, depth, '}');
        }
    }
}

fn push(out: &mut String, piece: ColoredString) {
    let _ = write!(out, "{}", piece);
}

fn quoted(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| format!("\"{}\"", s))
}

fn separator(out: &mut String, index: usize, depth: usize) {
    if index > 0 {
        out.push(',');
    }
    out.push('\n');
    out.push_str(&INDENT.repeat(depth));
}

fn close(out: &mut String, depth: usize, bracket: char) {
    out.push('\n');
    out.push_str(&INDENT.repeat(depth));
    out.push(bracket);
}

#[cfg(test)]
mod tests {
    use super::*;

    const NESTED: &str = r#"{"b":[1,2.5,{"c":null}],"a":"x\"y","e":{},"f":[],"d":true}"#;

    fn strip_ansi(s: &str) -> String {
        let mut plain = String::new();
        let mut chars = s.chars();
        while let Some(c) = chars.next() {
            if c == '\u{1b}' {
                for c in chars.by_ref() {
                    if c == 'm' {
                        break;
                    }
                }
            } else {
                plain.push(c);
            }
        }
        plain
    }

    #[test]
    fn plain_output_is_indented_and_sorted() {
        let rendered = render_json(br#"{"ok":true,"a":1}"#, false).unwrap();
        assert_eq!(rendered, "{\n  \"a\": 1,\n  \"ok\": true\n}");
    }

    #[test]
    fn colored_output_matches_plain_layout() {
        colored::control::set_override(true);
        let colored = render_json(NESTED.as_bytes(), true).unwrap();
        let plain = render_json(NESTED.as_bytes(), false).unwrap();

        assert_ne!(colored, plain);
        assert_eq!(strip_ansi(&colored), plain);
    }

    #[test]
    fn scalars_render_on_their_own() {
        assert_eq!(render_json(b"42", false).unwrap(), "42");
        assert_eq!(render_json(b"\"hi\"", false).unwrap(), "\"hi\"");
    }

    #[test]
    fn non_json_reports_raw_body() {
        let err = render_json(b"not json", false).unwrap_err();
        match &err {
            AppError::NotJson { raw, .. } => assert_eq!(raw, "not json"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().contains("Result not a JSON => not json"));
    }

    #[test]
    fn empty_body_is_not_json() {
        assert!(matches!(
            render_json(b"", false),
            Err(AppError::NotJson { .. })
        ));
    }
}
