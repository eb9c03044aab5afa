use logos::{Logos, SpannedIter};
use rust_decimal::Decimal;
use serde::Serialize;
use std::{
    fmt::{Display, Formatter},
    str::FromStr,
};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LexicalError {
    #[error("unexpected character {character:?} at position {position}")]
    UnexpectedCharacter { character: char, position: usize },
    #[error("unterminated string literal starting at position {position}")]
    UnterminatedString { position: usize },
    #[error("invalid number literal {text:?} at position {position}")]
    InvalidNumber { text: String, position: usize },
}

impl LexicalError {
    pub fn position(&self) -> usize {
        match self {
            Self::UnexpectedCharacter { position, .. }
            | Self::UnterminatedString { position }
            | Self::InvalidNumber { position, .. } => *position,
        }
    }
}

#[derive(Clone, Copy, Debug, Logos, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
enum RawToken {
    #[regex(r"[0-9]+(\.[0-9]*)?%?")]
    #[regex(r"\.[0-9]+%?")]
    Number,
    #[regex(r"'([^'\\]|\\.)*'")]
    String,
    #[regex(r"'([^'\\]|\\.)*\\?")]
    UnterminatedString,
    #[regex(r"[A-Za-z][A-Za-z0-9_]*")]
    Identifier,
    #[token("+")]
    #[token("-")]
    #[token("*")]
    #[token("/")]
    #[token("%")]
    #[token("<")]
    #[token("<=")]
    #[token(">")]
    #[token(">=")]
    #[token("==")]
    #[token("!=")]
    #[token("=")]
    Operator,
    #[token("(")]
    LeftParenthesis,
    #[token(")")]
    RightParenthesis,
    #[token("[")]
    LeftSquareBracket,
    #[token("]")]
    RightSquareBracket,
    #[token(",")]
    Comma,
}

/// The syntactic class of a [`Token`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum TokenKind {
    Number,
    String,
    Identifier,
    Operator,
    /// One of the conditional keywords `IF`, `CASE`, `WHEN`, `THEN`, `ELSE` and `END`.
    Keyword,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Eof,
}

impl Display for TokenKind {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Number => "number",
            Self::String => "string",
            Self::Identifier => "identifier",
            Self::Operator => "operator",
            Self::Keyword => "keyword",
            Self::LParen => "`(`",
            Self::RParen => "`)`",
            Self::LBracket => "`[`",
            Self::RBracket => "`]`",
            Self::Comma => "`,`",
            Self::Eof => "end of expression",
        };
        formatter.write_str(name)
    }
}

/// A lexeme of a rule expression along with its byte offset in the source.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Token<'source> {
    kind: TokenKind,
    text: &'source str,
    position: usize,
}

impl<'source> Token<'source> {
    pub(crate) const fn new(kind: TokenKind, text: &'source str, position: usize) -> Self {
        Self {
            kind,
            text,
            position,
        }
    }

    #[inline]
    pub fn kind(&self) -> TokenKind {
        self.kind
    }

    #[inline]
    pub fn text(&self) -> &'source str {
        self.text
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.position
    }

    /// The value of a number literal, with a `%` suffix folded in (`10%` is `0.10`).
    ///
    /// Returns `None` for any other kind of token.
    pub fn numeric_value(&self) -> Option<Decimal> {
        match self.kind {
            TokenKind::Number => parse_number(self.text),
            _ => None,
        }
    }

    #[inline]
    pub fn is_operator(&self, operator: &str) -> bool {
        self.kind == TokenKind::Operator && self.text == operator
    }

    #[inline]
    pub fn is_keyword(&self, keyword: &str) -> bool {
        self.kind == TokenKind::Keyword && self.text == keyword
    }

    #[inline]
    pub(crate) fn is_operand(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::Number | TokenKind::String | TokenKind::Identifier
        )
    }

    /// Whether an operand must be complete before this token.
    #[inline]
    pub(crate) fn ends_group(&self) -> bool {
        match self.kind {
            TokenKind::RParen | TokenKind::RBracket | TokenKind::Comma | TokenKind::Eof => true,
            TokenKind::Keyword => CLAUSE_KEYWORDS.contains(&self.text),
            _ => false,
        }
    }
}

impl Display for Token<'_> {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            TokenKind::Eof => write!(formatter, "{}", self.kind),
            _ => write!(formatter, "`{}`", self.text),
        }
    }
}

const LOGICAL_OPERATORS: [&str; 3] = ["AND", "OR", "NOT"];
const CLAUSE_KEYWORDS: [&str; 4] = ["WHEN", "THEN", "ELSE", "END"];

fn is_keyword(text: &str) -> bool {
    matches!(text, "IF" | "CASE") || CLAUSE_KEYWORDS.contains(&text)
}

fn parse_number(text: &str) -> Option<Decimal> {
    let (digits, percent) = match text.strip_suffix('%') {
        Some(digits) => (digits, true),
        None => (text, false),
    };
    let digits = digits.strip_suffix('.').unwrap_or(digits);
    let value = if digits.starts_with('.') {
        Decimal::from_str(&format!("0{digits}"))
    } else {
        Decimal::from_str(digits)
    }
    .ok()?;

    if percent {
        value.checked_div(Decimal::ONE_HUNDRED)
    } else {
        Some(value)
    }
}

/// Streams the tokens of an expression, without the trailing [`TokenKind::Eof`].
pub struct Lexer<'source> {
    source: &'source str,
    token_stream: SpannedIter<'source, RawToken>,
}

impl<'source> Lexer<'source> {
    pub fn new(source: &'source str) -> Self {
        Self {
            source,
            token_stream: RawToken::lexer(source).spanned(),
        }
    }
}

impl<'source> Iterator for Lexer<'source> {
    type Item = Result<Token<'source>, LexicalError>;

    fn next(&mut self) -> Option<Self::Item> {
        let source = self.source;
        self.token_stream.next().map(|(token, span)| {
            let position = span.start;
            let text = &source[span];
            let kind = match token {
                Ok(RawToken::Number) => {
                    if parse_number(text).is_none() {
                        return Err(LexicalError::InvalidNumber {
                            text: text.to_owned(),
                            position,
                        });
                    }
                    TokenKind::Number
                }
                Ok(RawToken::String) => TokenKind::String,
                Ok(RawToken::UnterminatedString) => {
                    return Err(LexicalError::UnterminatedString { position });
                }
                Ok(RawToken::Identifier) if LOGICAL_OPERATORS.contains(&text) => {
                    TokenKind::Operator
                }
                Ok(RawToken::Identifier) if is_keyword(text) => TokenKind::Keyword,
                Ok(RawToken::Identifier) => TokenKind::Identifier,
                Ok(RawToken::Operator) => TokenKind::Operator,
                Ok(RawToken::LeftParenthesis) => TokenKind::LParen,
                Ok(RawToken::RightParenthesis) => TokenKind::RParen,
                Ok(RawToken::LeftSquareBracket) => TokenKind::LBracket,
                Ok(RawToken::RightSquareBracket) => TokenKind::RBracket,
                Ok(RawToken::Comma) => TokenKind::Comma,
                Err(()) => {
                    let character = source[position..]
                        .chars()
                        .next()
                        .unwrap_or(char::REPLACEMENT_CHARACTER);
                    return Err(LexicalError::UnexpectedCharacter {
                        character,
                        position,
                    });
                }
            };

            Ok(Token::new(kind, text, position))
        })
    }
}

/// Split an expression into tokens.
///
/// The returned sequence always ends with a [`TokenKind::Eof`] token positioned at the length of
/// the source. Scanning stops at the first [`LexicalError`].
///
/// # Examples
///
/// ```rust
/// use rule_expression::{tokenize, TokenKind};
///
/// let tokens = tokenize("NAV() <= 10%").unwrap();
/// let kinds: Vec<_> = tokens.iter().map(|token| token.kind()).collect();
/// assert_eq!(
///     vec![
///         TokenKind::Identifier,
///         TokenKind::LParen,
///         TokenKind::RParen,
///         TokenKind::Operator,
///         TokenKind::Number,
///         TokenKind::Eof,
///     ],
///     kinds
/// );
/// ```
pub fn tokenize(source: &str) -> Result<Vec<Token<'_>>, LexicalError> {
    let mut tokens = Lexer::new(source).collect::<Result<Vec<_>, _>>()?;
    tokens.push(Token::new(TokenKind::Eof, "", source.len()));
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex_kinds(input: &str) -> Result<Vec<TokenKind>, LexicalError> {
        tokenize(input).map(|tokens| tokens.iter().map(Token::kind).collect())
    }

    fn lex_texts(input: &str) -> Result<Vec<&str>, LexicalError> {
        tokenize(input).map(|tokens| tokens.iter().map(Token::text).collect())
    }

    #[test]
    fn always_end_with_an_eof_token() {
        let actual = tokenize("").unwrap();
        assert_eq!(vec![Token::new(TokenKind::Eof, "", 0)], actual);

        let actual = tokenize("   ").unwrap();
        assert_eq!(vec![Token::new(TokenKind::Eof, "", 3)], actual);
    }

    #[test]
    fn can_lex_integer() {
        let actual = tokenize("123").unwrap();
        assert_eq!(Token::new(TokenKind::Number, "123", 0), actual[0]);
        assert_eq!(Some(Decimal::new(123, 0)), actual[0].numeric_value());
    }

    #[test]
    fn can_lex_decimal() {
        let actual = tokenize("0.10").unwrap();
        assert_eq!(Token::new(TokenKind::Number, "0.10", 0), actual[0]);
        assert_eq!(Some(Decimal::new(10, 2)), actual[0].numeric_value());

        let other = tokenize("123.").unwrap();
        assert_eq!(Some(Decimal::new(123, 0)), other[0].numeric_value());

        let leading_dot = tokenize(".5").unwrap();
        assert_eq!(Some(Decimal::new(5, 1)), leading_dot[0].numeric_value());
    }

    #[test]
    fn fold_percent_suffix_into_the_number() {
        let actual = tokenize("<=10%").unwrap();
        assert_eq!(
            vec![
                Token::new(TokenKind::Operator, "<=", 0),
                Token::new(TokenKind::Number, "10%", 2),
                Token::new(TokenKind::Eof, "", 5),
            ],
            actual
        );
        assert_eq!(Some(Decimal::new(10, 2)), actual[1].numeric_value());
    }

    #[test]
    fn lex_modulo_when_percent_is_separated_from_the_number() {
        let actual = lex_texts("10 % 3").unwrap();
        assert_eq!(vec!["10", "%", "3", ""], actual);
    }

    #[test]
    fn can_lex_identifier() {
        let actual = tokenize("POSITION_MV").unwrap();
        assert_eq!(Token::new(TokenKind::Identifier, "POSITION_MV", 0), actual[0]);
        assert_eq!(None, actual[0].numeric_value());
    }

    #[test]
    fn preserve_identifier_case() {
        let actual = lex_texts("ExposureByIssuer").unwrap();
        assert_eq!(vec!["ExposureByIssuer", ""], actual);
    }

    #[test]
    fn can_lex_logical_operators() {
        let actual = lex_kinds("AND OR NOT").unwrap();
        assert_eq!(
            vec![
                TokenKind::Operator,
                TokenKind::Operator,
                TokenKind::Operator,
                TokenKind::Eof
            ],
            actual
        );
    }

    #[test]
    fn lex_lowercase_logical_words_as_identifiers() {
        let actual = lex_kinds("and or Not").unwrap();
        assert_eq!(
            vec![
                TokenKind::Identifier,
                TokenKind::Identifier,
                TokenKind::Identifier,
                TokenKind::Eof
            ],
            actual
        );
    }

    #[test]
    fn can_lex_conditional_keywords() {
        let actual = tokenize("CASE WHEN THEN ELSE END IF(").unwrap();
        assert_eq!(
            vec![
                Token::new(TokenKind::Keyword, "CASE", 0),
                Token::new(TokenKind::Keyword, "WHEN", 5),
                Token::new(TokenKind::Keyword, "THEN", 10),
                Token::new(TokenKind::Keyword, "ELSE", 15),
                Token::new(TokenKind::Keyword, "END", 20),
                Token::new(TokenKind::Keyword, "IF", 24),
                Token::new(TokenKind::LParen, "(", 26),
                Token::new(TokenKind::Eof, "", 27),
            ],
            actual
        );
    }

    #[test]
    fn lex_lowercase_conditional_words_as_identifiers() {
        let actual = lex_kinds("case when end").unwrap();
        assert_eq!(
            vec![
                TokenKind::Identifier,
                TokenKind::Identifier,
                TokenKind::Identifier,
                TokenKind::Eof
            ],
            actual
        );
    }

    #[test]
    fn end_an_operand_before_clause_keywords_only() {
        let actual = tokenize("IF CASE WHEN THEN ELSE END").unwrap();
        let ends = actual.iter().map(Token::ends_group).collect::<Vec<_>>();
        assert_eq!(vec![false, false, true, true, true, true, true], ends);
    }

    #[test]
    fn do_not_treat_identifiers_starting_with_keywords_as_operators() {
        let actual = lex_kinds("ANDROID notional").unwrap();
        assert_eq!(
            vec![TokenKind::Identifier, TokenKind::Identifier, TokenKind::Eof],
            actual
        );
    }

    #[test]
    fn can_lex_arithmetic_operators() {
        let actual = lex_texts("+ - * / %").unwrap();
        assert_eq!(vec!["+", "-", "*", "/", "%", ""], actual);
    }

    #[test]
    fn match_comparison_operators_greedily() {
        let actual = lex_texts("< <= > >= == != =").unwrap();
        assert_eq!(vec!["<", "<=", ">", ">=", "==", "!=", "=", ""], actual);

        let actual = lex_texts("a<=b").unwrap();
        assert_eq!(vec!["a", "<=", "b", ""], actual);
    }

    #[test]
    fn can_lex_punctuation() {
        let actual = lex_kinds("( ) [ ] ,").unwrap();
        assert_eq!(
            vec![
                TokenKind::LParen,
                TokenKind::RParen,
                TokenKind::LBracket,
                TokenKind::RBracket,
                TokenKind::Comma,
                TokenKind::Eof
            ],
            actual
        );
    }

    #[test]
    fn can_lex_string() {
        let actual = tokenize("'Tech'").unwrap();
        assert_eq!(Token::new(TokenKind::String, "'Tech'", 0), actual[0]);
    }

    #[test]
    fn can_lex_empty_string() {
        let actual = lex_kinds("''").unwrap();
        assert_eq!(vec![TokenKind::String, TokenKind::Eof], actual);
    }

    #[test]
    fn can_lex_string_with_escaped_quotes() {
        let actual = lex_texts(r"'O\'Neil' == x").unwrap();
        assert_eq!(vec![r"'O\'Neil'", "==", "x", ""], actual);
    }

    #[test]
    fn return_an_error_on_unterminated_string() {
        let actual = tokenize("EXPOSURE(sector='Tech)");
        assert_eq!(
            Err(LexicalError::UnterminatedString { position: 16 }),
            actual
        );
    }

    #[test]
    fn return_an_error_on_unterminated_string_ending_with_escape() {
        let actual = tokenize(r"x == 'abc\");
        assert_eq!(Err(LexicalError::UnterminatedString { position: 5 }), actual);
    }

    #[test]
    fn return_an_error_on_unexpected_character() {
        let actual = tokenize("NAV() # 2");
        assert_eq!(
            Err(LexicalError::UnexpectedCharacter {
                character: '#',
                position: 6
            }),
            actual
        );
    }

    #[test]
    fn return_an_error_on_lone_exclamation_mark() {
        let actual = tokenize("!x");
        assert!(matches!(
            actual,
            Err(LexicalError::UnexpectedCharacter { character: '!', .. })
        ));
    }

    #[test]
    fn return_an_error_on_number_that_does_not_fit() {
        let actual = tokenize("123456789012345678901234567890123456789");
        assert!(matches!(
            actual,
            Err(LexicalError::InvalidNumber { position: 0, .. })
        ));
    }

    #[test]
    fn can_lex_complex_expression() {
        let actual = tokenize("EXPOSURE(sector='Tech') / NAV() <= 0.10").unwrap();

        assert_eq!(
            vec![
                Token::new(TokenKind::Identifier, "EXPOSURE", 0),
                Token::new(TokenKind::LParen, "(", 8),
                Token::new(TokenKind::Identifier, "sector", 9),
                Token::new(TokenKind::Operator, "=", 15),
                Token::new(TokenKind::String, "'Tech'", 16),
                Token::new(TokenKind::RParen, ")", 22),
                Token::new(TokenKind::Operator, "/", 24),
                Token::new(TokenKind::Identifier, "NAV", 26),
                Token::new(TokenKind::LParen, "(", 29),
                Token::new(TokenKind::RParen, ")", 30),
                Token::new(TokenKind::Operator, "<=", 32),
                Token::new(TokenKind::Number, "0.10", 35),
                Token::new(TokenKind::Eof, "", 39),
            ],
            actual
        );
    }

    #[test]
    fn can_lex_bracketed_call() {
        let actual = lex_kinds("ExposureByIssuer['Tesla'] > 5%").unwrap();
        assert_eq!(
            vec![
                TokenKind::Identifier,
                TokenKind::LBracket,
                TokenKind::String,
                TokenKind::RBracket,
                TokenKind::Operator,
                TokenKind::Number,
                TokenKind::Eof,
            ],
            actual
        );
    }

    #[test]
    fn can_compare_operators_and_keywords() {
        let actual = tokenize("NOT END").unwrap();
        assert!(actual[0].is_operator("NOT"));
        assert!(!actual[0].is_operator("AND"));
        assert!(actual[1].is_keyword("END"));
        assert!(!actual[1].is_operator("END"));
    }
}
