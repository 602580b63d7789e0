//! Content line unfolding, folding, and name inspection (RFC 5545 §3.1).

/// Maximum line length in octets (not characters) per RFC 5545 §3.1.
const MAX_LINE_OCTETS: usize = 75;

/// Splits input into logical content lines, merging folded continuations.
///
/// Handles both CRLF and bare LF line endings. Lines starting with SP/HTAB
/// are continuations of the previous line; unfolding removes the line break
/// and the single whitespace character (no space is inserted). Empty lines
/// are skipped. Each logical line is paired with the 1-based physical line
/// number it started on, for error reporting.
#[must_use]
pub fn split_lines(input: &str) -> Vec<(usize, String)> {
    let mut lines: Vec<(usize, String)> = Vec::new();

    for (i, raw_line) in input.lines().enumerate() {
        let line = raw_line.trim_end_matches('\r');
        if line.is_empty() {
            continue;
        }

        if line.starts_with([' ', '\t']) {
            let continuation = &line[1..];
            if let Some((_, prev)) = lines.last_mut() {
                prev.push_str(continuation);
            } else {
                // Continuation with no preceding line; treat as a fresh line
                lines.push((i + 1, continuation.to_string()));
            }
        } else {
            lines.push((i + 1, line.to_string()));
        }
    }

    lines
}

/// Folds a line to the maximum length.
///
/// Lines longer than 75 octets are folded by inserting CRLF + space. Every
/// physical line, the fold space included, spans the full 75 octets before
/// the next fold. Folds only at UTF-8 character boundaries.
#[must_use]
pub fn fold_line(line: &str) -> String {
    if line.len() <= MAX_LINE_OCTETS {
        return line.to_string();
    }

    let mut result = String::with_capacity(line.len() + line.len() / MAX_LINE_OCTETS * 3);
    let mut budget = MAX_LINE_OCTETS;

    for c in line.chars() {
        let width = c.len_utf8();
        if width > budget {
            result.push_str("\r\n ");
            // The fold space takes one octet of the continuation line
            budget = MAX_LINE_OCTETS - 1;
        }
        result.push(c);
        budget -= width;
    }

    result
}

/// Returns the property name of a content line: everything before the first
/// `;` (parameter) or `:` (value) delimiter.
#[must_use]
pub fn property_name(line: &str) -> &str {
    let end = line
        .find([';', ':'])
        .unwrap_or(line.len());
    &line[..end]
}

/// Returns whether a content line carries the given property (case-insensitive).
#[must_use]
pub fn is_property(line: &str, name: &str) -> bool {
    property_name(line).eq_ignore_ascii_case(name)
}

/// Returns the value part of a content line (after the first `:`), if any.
#[must_use]
pub fn property_value(line: &str) -> Option<&str> {
    line.split_once(':').map(|(_, value)| value)
}
