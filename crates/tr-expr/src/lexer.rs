use std::iter::Peekable;
use std::str::CharIndices;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Number(f64),
    Identifier(String),
    /// Any single non-alphanumeric symbol; the parser decides whether it is a known operator.
    Operator(char),
    BraceOpen,
    BraceClose,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Byte offset of the first character.
    pub offset: usize,
}

/// Left-to-right lexer over a formula. Identifiers may contain `_-#.:` after
/// the first character so tag/field names such as `temperature.average` stay whole.
pub struct Tokenizer<'a> {
    input: &'a str,
    chars: Peekable<CharIndices<'a>>,
}

impl<'a> Tokenizer<'a> {
    #[must_use]
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.char_indices().peekable(),
        }
    }

    fn take_while(&mut self, start: usize, keep: impl Fn(char) -> bool) -> &'a str {
        let mut end = start;
        while let Some(&(idx, c)) = self.chars.peek() {
            if !keep(c) {
                break;
            }
            end = idx + c.len_utf8();
            self.chars.next();
        }
        &self.input[start..end]
    }

    fn number(&mut self, start: usize) -> f64 {
        let mut end = start + self.take_while(start, |c| c.is_ascii_digit()).len();

        // a single '.' only counts when a digit follows it
        let mut lookahead = self.input[end..].chars();
        if lookahead.next() == Some('.') && lookahead.next().is_some_and(|c| c.is_ascii_digit()) {
            self.chars.next();
            end += 1 + self.take_while(end + 1, |c| c.is_ascii_digit()).len();
        }

        // digit runs with at most one interior '.' always parse
        self.input[start..end].parse().unwrap_or(f64::NAN)
    }
}

fn is_identifier_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_identifier_part(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '#' | '.' | ':')
}

impl Iterator for Tokenizer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        while self.chars.next_if(|&(_, c)| c.is_whitespace()).is_some() {}

        let &(offset, c) = self.chars.peek()?;
        let kind = if c.is_ascii_digit() {
            TokenKind::Number(self.number(offset))
        } else if is_identifier_start(c) {
            TokenKind::Identifier(self.take_while(offset, is_identifier_part).to_owned())
        } else {
            self.chars.next();
            match c {
                '(' => TokenKind::BraceOpen,
                ')' => TokenKind::BraceClose,
                other => TokenKind::Operator(other),
            }
        };
        Some(Token { kind, offset })
    }
}

#[must_use]
pub fn tokenize(input: &str) -> Vec<Token> {
    Tokenizer::new(input).collect()
}
