//! Human-readable rendering of a [`ValidationResult`].

use crate::diagnostics::{Diagnostic, ValidationResult};
use itertools::Itertools;

/// One line per diagnostic, in scan order: `error[<kind>] at <position>: <message>`.
///
/// # Examples
///
/// ```rust
/// use rule_expression::{report, validate, FunctionRegistry};
///
/// let result = validate("NAV(1,2)", &FunctionRegistry::compliance());
///
/// assert_eq!(
///     vec!["error[arity-mismatch] at 0: `NAV` expects no arguments, found 2"],
///     report::format(&result)
/// );
/// ```
pub fn format(result: &ValidationResult) -> Vec<String> {
    result.errors.iter().map(ToString::to_string).collect()
}

/// Like [`format`], with the offending source line and a caret under the diagnostic position.
///
/// Each entry spans several lines:
///
/// ```text
/// error[unknown-function] at 8: unknown function `FOO`
///   |
/// 1 | NAV() + FOO(1)
///   |         ^
/// ```
pub fn render(source: &str, result: &ValidationResult) -> Vec<String> {
    result
        .errors
        .iter()
        .map(|diagnostic| render_diagnostic(source, diagnostic))
        .collect()
}

fn render_diagnostic(source: &str, diagnostic: &Diagnostic) -> String {
    let position = char_boundary(source, diagnostic.position);
    let line_start = source[..position].rfind('\n').map_or(0, |index| index + 1);
    let line_end = source[position..]
        .find('\n')
        .map_or(source.len(), |index| position + index);
    let line_number = source[..line_start].matches('\n').count() + 1;
    let column = source[line_start..position].chars().count();

    let gutter = " ".repeat(line_number.to_string().len());
    [
        diagnostic.to_string(),
        format!("{gutter} |"),
        format!(
            "{line_number} | {}",
            source[line_start..line_end].trim_end_matches('\r')
        ),
        format!("{gutter} | {}^", " ".repeat(column)),
    ]
    .iter()
    .join("\n")
}

/// Clamp `position` into `source` and back off to the start of the character it falls in.
fn char_boundary(source: &str, position: usize) -> usize {
    let mut position = position.min(source.len());
    while !source.is_char_boundary(position) {
        position -= 1;
    }
    position
}
