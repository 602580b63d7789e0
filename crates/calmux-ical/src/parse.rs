//! Feed parser: envelope validation and event block extraction.

use crate::error::{IcalError, IcalResult};
use crate::feed::{EventBlock, ParsedFeed};
use crate::lines::{is_property, property_value, split_lines};

const VCALENDAR: &str = "VCALENDAR";
const VEVENT: &str = "VEVENT";

/// Parses a calendar payload into envelope metadata and ordered event blocks.
///
/// The payload must be UTF-8 and consist of exactly one balanced
/// `VCALENDAR` envelope. Events are collected at any nesting depth in
/// document order; their payloads (including nested components such as
/// `VALARM`) are preserved verbatim as unfolded logical lines.
///
/// ## Errors
///
/// Returns an error if the payload cannot be decoded or contains no
/// discernible, balanced envelope.
#[tracing::instrument(skip(bytes), fields(len = bytes.len()))]
pub fn parse_feed(bytes: &[u8]) -> IcalResult<ParsedFeed> {
    let input = std::str::from_utf8(bytes).map_err(|_utf8| IcalError::InvalidUtf8)?;

    let lines = split_lines(input);
    if lines.is_empty() {
        return Err(IcalError::Empty);
    }

    let (first_num, first) = &lines[0];
    if !is_begin_of(first, VCALENDAR) {
        return Err(IcalError::MissingEnvelope { line: *first_num });
    }

    let mut stack: Vec<String> = vec![VCALENDAR.to_string()];
    let mut display_name: Option<String> = None;
    let mut events: Vec<EventBlock> = Vec::new();
    let mut current_event: Option<Vec<String>> = None;

    for (line_num, line) in &lines[1..] {
        if stack.is_empty() {
            return Err(IcalError::TrailingContent { line: *line_num });
        }

        if let Some(name) = component_name(line, "BEGIN") {
            stack.push(name.clone());
            if let Some(event) = current_event.as_mut() {
                event.push(line.clone());
            } else if name == VEVENT {
                current_event = Some(vec![line.clone()]);
            }
        } else if let Some(name) = component_name(line, "END") {
            let Some(open) = stack.pop() else {
                return Err(IcalError::UnexpectedEnd { line: *line_num });
            };
            if open != name {
                return Err(IcalError::MismatchedComponent {
                    expected: open,
                    found: name,
                    line: *line_num,
                });
            }

            if let Some(event) = current_event.as_mut() {
                event.push(line.clone());
                if name == VEVENT && !stack_holds_event(&stack) {
                    events.push(EventBlock {
                        lines: current_event.take().unwrap_or_default(),
                    });
                }
            }
        } else if let Some(event) = current_event.as_mut() {
            event.push(line.clone());
        } else if stack.len() == 1
            && display_name.is_none()
            && is_property(line, "X-WR-CALNAME")
        {
            display_name = property_value(line).map(str::to_string);
        }
    }

    if let Some(open) = stack.pop() {
        return Err(IcalError::UnterminatedComponent { component: open });
    }

    tracing::debug!(events = events.len(), "Parsed calendar feed");

    Ok(ParsedFeed {
        display_name,
        events,
    })
}

/// Returns the component name if the line is a `BEGIN:`/`END:` marker.
fn component_name(line: &str, marker: &str) -> Option<String> {
    if !is_property(line, marker) {
        return None;
    }
    property_value(line).map(|v| v.trim().to_ascii_uppercase())
}

fn is_begin_of(line: &str, component: &str) -> bool {
    component_name(line, "BEGIN").is_some_and(|name| name == component)
}

/// Whether any open component on the stack is still a VEVENT (nested events).
fn stack_holds_event(stack: &[String]) -> bool {
    stack.iter().any(|open| open == VEVENT)
}
