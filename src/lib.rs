//! A tokenizer and structural validator for compliance rule expressions.
//!
//! Rules such as `EXPOSURE(sector='Tech') / NAV() <= 0.10` are checked for balanced groups,
//! known functions called with the right number of arguments and well-placed operators. Every
//! problem is reported as a positioned [`Diagnostic`] inside a [`ValidationResult`], which
//! serializes to the JSON shape consumed by rule-authoring front ends.
//!
//! # Examples
//!
//! Validating a few rules against the built-in function library:
//!
//! ```
//! use rule_expression::{report, validate, DiagnosticKind, FunctionRegistry};
//!
//! let registry = FunctionRegistry::compliance();
//!
//! let result = validate("EXPOSURE(sector='Tech') / NAV() <= 10%", &registry);
//! assert!(result.valid);
//!
//! let result = validate("SUM(col1 > 100", &registry);
//! assert!(!result.valid);
//! assert_eq!(DiagnosticKind::UnbalancedParens, result.errors[0].kind);
//!
//! for line in report::format(&result) {
//!     println!("{line}");
//! }
//! ```
//!
//! Using a function library loaded from configuration and validating already tokenized input:
//!
//! ```
//! use rule_expression::{tokenize, FunctionRegistry, Validator};
//!
//! let registry = FunctionRegistry::from_catalog_json(r#"[
//!     { "name": "LIMIT", "category": "User Defined", "params": [
//!         { "name": "value", "type": "number", "required": true }
//!     ]}
//! ]"#).unwrap();
//!
//! let tokens = tokenize("LIMIT(position) AND NOT LIMIT()").unwrap();
//! let result = Validator::new(&registry).validate(&tokens);
//!
//! assert_eq!(1, result.errors.len());
//! println!("{}", result.to_json().unwrap());
//! ```
//!
//! # Expression language
//!
//! * Literals: numbers (`12`, `0.10`, `.5`, with an optional `%` suffix so that `10%` is `0.10`)
//!   and single-quoted strings with backslash escapes (`'O\'Neil'`);
//! * Identifiers: column names and function names, a letter followed by letters, digits or `_`;
//! * Arithmetic: `+`, `-`, `*`, `/`, `%`. A `-` with no operand before it is unary;
//! * Comparison: `<`, `<=`, `>`, `>=`, `==`, `!=` and `=` (also used by named arguments such as
//!   `sector='Tech'`);
//! * Logic: `AND`, `OR` and the unary `NOT`, written in uppercase (`and` is an identifier);
//! * Conditionals: `IF(condition, then, otherwise)` with an optional last argument, and
//!   `CASE WHEN condition THEN value [WHEN ... THEN ...] [ELSE value] END`;
//! * Grouping with `(` and `)`;
//! * Function calls, `NAV()`, `ROUND(value, 2)` or the bracketed form `ExposureByIssuer['Tesla']`.
//!   Function names are matched case-insensitively against a [`FunctionRegistry`].
//!
//! # Diagnostics
//!
//! Validation never stops at the first problem. The [`Validator`] scans the whole token stream
//! and reports, in order:
//!
//! * [`DiagnosticKind::UnbalancedParens`]: unmatched, mismatched or unclosed groups, calls and
//!   `CASE` blocks;
//! * [`DiagnosticKind::UnknownFunction`]: a call to a function the registry does not know;
//! * [`DiagnosticKind::ArityMismatch`]: a call with too few or too many arguments;
//! * [`DiagnosticKind::UnexpectedToken`]: misplaced operators, commas, operands or `CASE` clauses;
//! * [`DiagnosticKind::EmptyExpression`]: nothing to validate;
//! * [`DiagnosticKind::InvalidToken`]: the text could not be tokenized (only from [`validate`]).
mod catalog;
mod diagnostics;
mod error;
mod lexer;
mod registry;
pub mod report;
#[cfg(test)]
mod test_utils;
mod validator;

pub use crate::{
    catalog::{FunctionDefinition, ParameterDefinition},
    diagnostics::{Diagnostic, DiagnosticKind, ValidationResult},
    error::RegistryError,
    lexer::{tokenize, Lexer, LexicalError, Token, TokenKind},
    registry::{FunctionCategory, FunctionRegistry, FunctionSignature},
    validator::{validate, Validator},
};
