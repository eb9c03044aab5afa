use crate::{
    diagnostics::{Diagnostic, DiagnosticKind, ValidationResult},
    lexer::{tokenize, Token, TokenKind},
    registry::{describe_arity, FunctionRegistry},
};
use tracing::{debug, trace};

/// Arity of the built-in `IF(condition, then, otherwise)`; the last argument is optional.
const CONDITIONAL_ARITY: (usize, Option<usize>) = (2, Some(3));

/// What the previous token leaves the scan expecting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Role {
    /// Start of the expression, of a group, of an argument or of a clause: an operand is expected.
    Open,
    Operand,
    Operator,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Delimiter {
    Parenthesis,
    Bracket,
    Case,
}

impl Delimiter {
    fn of(token: &Token) -> Self {
        match token.kind() {
            TokenKind::LBracket | TokenKind::RBracket => Self::Bracket,
            _ => Self::Parenthesis,
        }
    }

    fn opening(self) -> &'static str {
        match self {
            Self::Parenthesis => "(",
            Self::Bracket => "[",
            Self::Case => "CASE",
        }
    }
}

/// The last keyword seen in a `CASE` block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Clause {
    Case,
    When,
    Then,
    Else,
}

impl Clause {
    fn keyword(self) -> &'static str {
        match self {
            Self::Case => "CASE",
            Self::When => "WHEN",
            Self::Then => "THEN",
            Self::Else => "ELSE",
        }
    }
}

#[derive(Debug)]
struct CallFrame<'source> {
    name: &'source str,
    position: usize,
    /// Unknown functions accept any arity.
    min_args: usize,
    max_args: Option<usize>,
    commas: usize,
    has_argument: bool,
}

impl CallFrame<'_> {
    #[inline]
    fn arguments(&self) -> usize {
        if self.commas == 0 && !self.has_argument {
            0
        } else {
            self.commas + 1
        }
    }

    #[inline]
    fn accepts(&self, count: usize) -> bool {
        count >= self.min_args && self.max_args.map_or(true, |max| count <= max)
    }
}

#[derive(Debug)]
enum Frame<'source> {
    Plain,
    Call(CallFrame<'source>),
    Case(Clause),
}

#[derive(Debug)]
struct Group<'source> {
    delimiter: Delimiter,
    position: usize,
    frame: Frame<'source>,
}

impl<'source> Group<'source> {
    fn call_mut(&mut self) -> Option<&mut CallFrame<'source>> {
        match &mut self.frame {
            Frame::Call(call) => Some(call),
            _ => None,
        }
    }
}

/// Checks the structure of tokenized rule expressions against a [`FunctionRegistry`].
///
/// The validator itself holds no state between runs: every call to [`Validator::validate`]
/// scans with fresh state, so a single validator can be shared freely.
#[derive(Clone, Copy, Debug)]
pub struct Validator<'registry> {
    registry: &'registry FunctionRegistry,
}

impl<'registry> Validator<'registry> {
    pub fn new(registry: &'registry FunctionRegistry) -> Self {
        Self { registry }
    }

    /// Validate a token stream as produced by [`crate::tokenize`].
    ///
    /// Every problem found is reported, in the order of the tokens that reveal it. Scanning
    /// stops at the first [`TokenKind::Eof`] token, or at the end of the slice when there is none.
    pub fn validate(&self, tokens: &[Token<'_>]) -> ValidationResult {
        let mut scan = Scan::new(self.registry);
        scan.run(tokens);
        let result = ValidationResult::from_diagnostics(scan.diagnostics);
        debug!(
            tokens = tokens.len(),
            errors = result.errors.len(),
            valid = result.valid,
            "validated expression"
        );
        result
    }
}

/// Tokenize and validate a rule expression.
///
/// A tokenization failure is reported as a single [`DiagnosticKind::InvalidToken`] diagnostic, so
/// this function always produces a [`ValidationResult`].
///
/// # Examples
///
/// ```rust
/// use rule_expression::{validate, DiagnosticKind, FunctionRegistry};
///
/// let registry = FunctionRegistry::compliance();
///
/// assert!(validate("EXPOSURE(sector='Tech') / NAV() <= 0.10", &registry).valid);
/// assert!(validate("CASE WHEN NAV() > 0 THEN 1 ELSE 0 END == 1", &registry).valid);
///
/// let result = validate("NAV(1, 2)", &registry);
/// assert!(!result.valid);
/// assert_eq!(DiagnosticKind::ArityMismatch, result.errors[0].kind);
/// ```
pub fn validate(expression: &str, registry: &FunctionRegistry) -> ValidationResult {
    match tokenize(expression) {
        Ok(tokens) => Validator::new(registry).validate(&tokens),
        Err(error) => {
            debug!(%error, "failed to tokenize expression");
            ValidationResult::from_diagnostics(vec![Diagnostic::new(
                DiagnosticKind::InvalidToken,
                error.position(),
                error.to_string(),
            )])
        }
    }
}

struct Scan<'registry, 'source> {
    registry: &'registry FunctionRegistry,
    groups: Vec<Group<'source>>,
    role: Role,
    /// Whether the current run of operators already produced a diagnostic.
    run_reported: bool,
    diagnostics: Vec<Diagnostic>,
}

impl<'registry, 'source> Scan<'registry, 'source> {
    fn new(registry: &'registry FunctionRegistry) -> Self {
        Self {
            registry,
            groups: Vec::new(),
            role: Role::Open,
            run_reported: false,
            diagnostics: Vec::new(),
        }
    }

    fn run(&mut self, tokens: &[Token<'source>]) {
        let length = tokens
            .iter()
            .position(|token| token.kind() == TokenKind::Eof)
            .unwrap_or(tokens.len());
        let end = match tokens.get(length) {
            Some(eof) => eof.position(),
            None => tokens
                .last()
                .map_or(0, |token| token.position() + token.text().len()),
        };
        let body = &tokens[..length];
        if body.is_empty() {
            self.report(DiagnosticKind::EmptyExpression, 0, "expression is empty");
            return;
        }

        let eof = Token::new(TokenKind::Eof, "", end);
        for (index, token) in body.iter().enumerate() {
            let previous = index.checked_sub(1).map(|index| &body[index]);
            let next = body.get(index + 1).unwrap_or(&eof);
            self.mark_argument(token);
            match token.kind() {
                _ if token.is_operand() => self.operand(token),
                TokenKind::Operator => self.operator(token, next),
                TokenKind::Keyword => self.keyword(token, next),
                TokenKind::LParen | TokenKind::LBracket => self.open(token, previous),
                TokenKind::RParen | TokenKind::RBracket => self.close(token, previous),
                TokenKind::Comma => self.comma(token),
                _ => {}
            }
        }
        self.finish(end);
    }

    fn mark_argument(&mut self, token: &Token) {
        if matches!(
            token.kind(),
            TokenKind::Comma | TokenKind::RParen | TokenKind::RBracket
        ) {
            return;
        }
        if let Some(call) = self.groups.last_mut().and_then(Group::call_mut) {
            call.has_argument = true;
        }
    }

    fn operand(&mut self, token: &Token) {
        if self.role == Role::Operand {
            self.report(
                DiagnosticKind::UnexpectedToken,
                token.position(),
                format!("expected an operator before {token}"),
            );
        }
        self.role = Role::Operand;
    }

    fn operator(&mut self, token: &Token, next: &Token) {
        let is_not = token.is_operator("NOT");
        let unary = is_not || (token.is_operator("-") && self.role != Role::Operand);
        if self.role != Role::Operator {
            self.run_reported = false;
        }

        match self.role {
            Role::Operand if is_not => {
                self.report(
                    DiagnosticKind::UnexpectedToken,
                    token.position(),
                    format!("{token} cannot follow an operand"),
                );
                self.run_reported = true;
            }
            Role::Operator if !unary => {
                self.report(
                    DiagnosticKind::UnexpectedToken,
                    token.position(),
                    format!("operator {token} cannot follow another operator"),
                );
                self.run_reported = true;
            }
            // A following binary operator reports the whole run.
            Role::Open if !unary && !is_binary_after_operator(next) => {
                self.report(
                    DiagnosticKind::UnexpectedToken,
                    token.position(),
                    format!("operator {token} is missing its left operand"),
                );
                self.run_reported = true;
            }
            _ => {}
        }

        if next.ends_group() && !self.run_reported {
            self.report(
                DiagnosticKind::UnexpectedToken,
                token.position(),
                format!("operator {token} is missing its right operand"),
            );
            self.run_reported = true;
        }
        self.role = Role::Operator;
    }

    fn keyword(&mut self, token: &Token, next: &Token) {
        match token.text() {
            "IF" => {
                self.operand(token);
                if next.kind() != TokenKind::LParen {
                    self.report(
                        DiagnosticKind::UnexpectedToken,
                        token.position(),
                        "`IF` must be followed by `(`",
                    );
                }
            }
            "CASE" => {
                self.operand(token);
                if !next.is_keyword("WHEN") {
                    self.report(
                        DiagnosticKind::UnexpectedToken,
                        next.position(),
                        format!("expected `WHEN` after `CASE`, found {next}"),
                    );
                }
                self.groups.push(Group {
                    delimiter: Delimiter::Case,
                    position: token.position(),
                    frame: Frame::Case(Clause::Case),
                });
                self.role = Role::Open;
            }
            _ => self.clause(token),
        }
    }

    fn clause(&mut self, token: &Token) {
        let current = match self.groups.last() {
            Some(Group {
                frame: Frame::Case(clause),
                ..
            }) => Some(*clause),
            _ => None,
        };
        let Some(current) = current else {
            self.report(
                DiagnosticKind::UnexpectedToken,
                token.position(),
                format!("{token} outside of a `CASE` block"),
            );
            self.role = if token.is_keyword("END") {
                Role::Operand
            } else {
                Role::Open
            };
            return;
        };

        // A `CASE` not followed by `WHEN` has already been reported.
        if current != Clause::Case {
            if self.role == Role::Open {
                self.report(
                    DiagnosticKind::UnexpectedToken,
                    token.position(),
                    format!("expected an expression before {token}"),
                );
            }
            let allowed = match token.text() {
                "WHEN" => current == Clause::Then,
                "THEN" => current == Clause::When,
                "ELSE" => current == Clause::Then,
                _ => matches!(current, Clause::Then | Clause::Else),
            };
            if !allowed {
                self.report(
                    DiagnosticKind::UnexpectedToken,
                    token.position(),
                    format!("{token} cannot follow `{}`", current.keyword()),
                );
            }
        }

        let clause = match token.text() {
            "WHEN" => Clause::When,
            "THEN" => Clause::Then,
            "ELSE" => Clause::Else,
            _ => {
                self.groups.pop();
                self.role = Role::Operand;
                return;
            }
        };
        if let Some(Group {
            frame: Frame::Case(current),
            ..
        }) = self.groups.last_mut()
        {
            *current = clause;
        }
        self.role = Role::Open;
    }

    fn open(&mut self, token: &Token<'source>, previous: Option<&Token<'source>>) {
        let delimiter = Delimiter::of(token);
        let frame = match previous {
            Some(name) if name.kind() == TokenKind::Identifier => Frame::Call(self.resolve(name)),
            Some(name) if name.is_keyword("IF") && delimiter == Delimiter::Parenthesis => {
                let (min_args, max_args) = CONDITIONAL_ARITY;
                Frame::Call(CallFrame {
                    name: name.text(),
                    position: name.position(),
                    min_args,
                    max_args,
                    commas: 0,
                    has_argument: false,
                })
            }
            _ => {
                if delimiter == Delimiter::Bracket {
                    self.report(
                        DiagnosticKind::UnexpectedToken,
                        token.position(),
                        "`[` must directly follow a function name",
                    );
                } else if self.role == Role::Operand {
                    self.report(
                        DiagnosticKind::UnexpectedToken,
                        token.position(),
                        format!("expected an operator before {token}"),
                    );
                }
                Frame::Plain
            }
        };

        self.groups.push(Group {
            delimiter,
            position: token.position(),
            frame,
        });
        self.role = Role::Open;
    }

    fn resolve(&mut self, name: &Token<'source>) -> CallFrame<'source> {
        let registry = self.registry;
        let (min_args, max_args) = match registry.lookup(name.text()) {
            Some(signature) => (signature.min_args(), signature.max_args()),
            None => {
                self.report(
                    DiagnosticKind::UnknownFunction,
                    name.position(),
                    format!("unknown function {name}"),
                );
                (0, None)
            }
        };

        CallFrame {
            name: name.text(),
            position: name.position(),
            min_args,
            max_args,
            commas: 0,
            has_argument: false,
        }
    }

    fn close(&mut self, token: &Token, previous: Option<&Token>) {
        let Some(group) = self.groups.pop() else {
            self.report(
                DiagnosticKind::UnbalancedParens,
                token.position(),
                format!("unmatched {token}"),
            );
            return;
        };

        if group.delimiter != Delimiter::of(token) {
            self.report(
                DiagnosticKind::UnbalancedParens,
                token.position(),
                format!(
                    "{token} does not match `{}` opened at position {}",
                    group.delimiter.opening(),
                    group.position
                ),
            );
        }

        if self.role == Role::Open {
            match previous.map(Token::kind) {
                Some(TokenKind::Comma) => self.report(
                    DiagnosticKind::UnexpectedToken,
                    token.position(),
                    format!("expected an argument before {token}"),
                ),
                _ if matches!(group.frame, Frame::Plain) => self.report(
                    DiagnosticKind::UnexpectedToken,
                    token.position(),
                    "groups cannot be empty",
                ),
                _ => {}
            }
        }

        if let Frame::Call(call) = &group.frame {
            self.check_arity(call);
        }
        self.role = Role::Operand;
    }

    fn comma(&mut self, token: &Token) {
        let in_call = match self.groups.last_mut().and_then(Group::call_mut) {
            Some(call) => {
                call.commas += 1;
                true
            }
            None => false,
        };

        if !in_call {
            self.report(
                DiagnosticKind::UnexpectedToken,
                token.position(),
                "`,` is only allowed between function arguments",
            );
        } else if self.role == Role::Open {
            self.report(
                DiagnosticKind::UnexpectedToken,
                token.position(),
                "expected an argument before `,`",
            );
        }
        self.role = Role::Open;
    }

    fn check_arity(&mut self, call: &CallFrame) {
        let count = call.arguments();
        if !call.accepts(count) {
            self.report(
                DiagnosticKind::ArityMismatch,
                call.position,
                format!(
                    "`{}` expects {}, found {count}",
                    call.name,
                    describe_arity(call.min_args, call.max_args)
                ),
            );
        }
    }

    fn finish(&mut self, end: usize) {
        let groups = std::mem::take(&mut self.groups);
        let unclosed = groups
            .iter()
            .filter(|group| matches!(group.frame, Frame::Plain))
            .count();
        match unclosed {
            0 => {}
            1 => self.report(DiagnosticKind::UnbalancedParens, end, "1 unclosed group"),
            count => self.report(
                DiagnosticKind::UnbalancedParens,
                end,
                format!("{count} unclosed groups"),
            ),
        }

        for group in &groups {
            match &group.frame {
                Frame::Plain => {}
                Frame::Call(call) => {
                    self.check_arity(call);
                    self.report(
                        DiagnosticKind::UnbalancedParens,
                        call.position,
                        format!(
                            "call to `{}` opened at position {} is never closed",
                            call.name, group.position
                        ),
                    );
                }
                Frame::Case(_) => self.report(
                    DiagnosticKind::UnbalancedParens,
                    group.position,
                    "`CASE` block is never closed with `END`",
                ),
            }
        }
    }

    fn report(&mut self, kind: DiagnosticKind, position: usize, message: impl Into<String>) {
        let diagnostic = Diagnostic::new(kind, position, message);
        trace!(
            kind = %diagnostic.kind,
            position = diagnostic.position,
            message = %diagnostic.message,
            "recorded diagnostic"
        );
        self.diagnostics.push(diagnostic);
    }
}

#[inline]
fn is_binary_after_operator(token: &Token) -> bool {
    token.kind() == TokenKind::Operator && !token.is_operator("NOT") && !token.is_operator("-")
}
