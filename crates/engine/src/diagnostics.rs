// Relic - Solidity Recompiler
// Copyright (C) 2024 Zhuo Zhang and Wuqi Zhang
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Human-readable rendering of compiler diagnostics.

use foundry_compilers::artifacts::Error as SolcDiagnostic;
use serde_json::Value;

/// Lines of source shown around a primary location.
const PRIMARY_CONTEXT_LINES: usize = 2;

/// Render `diagnostics` (raw entries of the output's `errors` array) for logs.
///
/// Source excerpts are taken from the `sources.<file>.content` fields of
/// `request` when present.
pub fn format_diagnostics(diagnostics: &[Value], request: &Value) -> String {
    let mut formatted = String::new();

    for raw in diagnostics {
        formatted.push_str("\n\n");

        let Ok(diagnostic) = serde_json::from_value::<SolcDiagnostic>(raw.clone()) else {
            let message = raw.get("message").and_then(Value::as_str).unwrap_or("unknown error");
            formatted.push_str(&format!("Error: {message}"));
            continue;
        };

        match diagnostic.error_code {
            Some(code) => formatted.push_str(&format!("Error [{code}]: ")),
            None => formatted.push_str("Error: "),
        }
        formatted.push_str(&diagnostic.message);

        if let Some(loc) = &diagnostic.source_location {
            formatted.push_str(&format!("\n  --> {}:{}:{}", loc.file, loc.start, loc.end));
            if let Some(context) =
                source_of(request, &loc.file).and_then(|source| {
                    excerpt(source, loc.start, loc.end, PRIMARY_CONTEXT_LINES)
                })
            {
                formatted.push_str("\n\n");
                formatted.push_str(&context);
            }
        }

        for secondary in &diagnostic.secondary_source_locations {
            if let Some(message) = &secondary.message {
                formatted.push_str(&format!("\n  Note: {message}"));
            }
            if let Some(file) = &secondary.file {
                let position = |p: Option<i32>| p.map_or_else(|| "?".to_string(), |p| p.to_string());
                formatted.push_str(&format!(
                    "\n    --> {file}:{}:{}",
                    position(secondary.start),
                    position(secondary.end)
                ));
            }
        }
    }

    if formatted.is_empty() {
        formatted.push_str("\nNo specific error details available");
    }

    formatted
}

fn source_of<'a>(request: &'a Value, file: &str) -> Option<&'a str> {
    request.get("sources")?.get(file)?.get("content")?.as_str()
}

/// The lines of `source` covering byte range `start..end`, with `context`
/// extra lines on each side and the first line underlined.
fn excerpt(source: &str, start: i32, end: i32, context: usize) -> Option<String> {
    let start = usize::try_from(start).ok()?;
    let end = usize::try_from(end).ok()?.max(start);
    if start > source.len() {
        return None;
    }

    let lines: Vec<&str> = source.lines().collect();
    let (mut start_line, mut start_col, mut end_line, mut end_col) = (0, 0, 0, 0);
    let mut offset = 0;
    for (index, line) in lines.iter().enumerate() {
        let next = offset + line.len() + 1;
        if (offset..next).contains(&start) {
            start_line = index;
            start_col = start - offset;
        }
        if (offset..=next).contains(&end) {
            end_line = index;
            end_col = end - offset;
        }
        offset = next;
    }
    let end_line = end_line.max(start_line);

    let mut rendered = String::new();
    let first = start_line.saturating_sub(context);
    let last = (end_line + context + 1).min(lines.len());
    for (index, line) in lines.iter().enumerate().take(last).skip(first) {
        let gutter = format!("  {} | ", index + 1);
        rendered.push_str(&format!("{gutter}{line}\n"));
        if index == start_line {
            let width = if start_line == end_line {
                end_col.saturating_sub(start_col).max(1)
            } else {
                line.len().saturating_sub(start_col).max(1)
            };
            rendered.push_str(&" ".repeat(gutter.len() + start_col));
            rendered.push_str(&"^".repeat(width));
            rendered.push('\n');
        }
    }

    Some(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_format_with_source_excerpt() {
        let source = "contract A {\n    function f() { x = 1; }\n}\n";
        let start = source.find("x = 1").unwrap() as i32;
        let request = json!({ "sources": { "A.sol": { "content": source } } });
        let diagnostics = vec![json!({
            "component": "general",
            "errorCode": "7576",
            "formattedMessage": "DeclarationError: Undeclared identifier.",
            "message": "Undeclared identifier.",
            "severity": "error",
            "sourceLocation": { "file": "A.sol", "start": start, "end": start + 1 },
            "type": "DeclarationError"
        })];

        let formatted = format_diagnostics(&diagnostics, &request);

        assert!(formatted.contains("Error [7576]: Undeclared identifier."), "{formatted}");
        assert!(formatted.contains("--> A.sol:"), "{formatted}");
        assert!(formatted.contains("  2 |     function f() { x = 1; }"), "{formatted}");
        assert!(formatted.contains("^"), "{formatted}");
    }

    #[test]
    fn test_format_unparseable_entry() {
        let diagnostics = vec![json!({ "severity": "error", "message": "boom" })];
        let formatted = format_diagnostics(&diagnostics, &json!({}));
        assert_eq!(formatted.trim(), "Error: boom");
    }

    #[test]
    fn test_format_nothing() {
        assert!(format_diagnostics(&[], &json!({})).contains("No specific error details"));
    }

    #[test]
    fn test_excerpt_out_of_range() {
        assert!(excerpt("abc", 10, 12, 1).is_none());
        assert!(excerpt("abc", -1, 2, 1).is_none());
    }
}
