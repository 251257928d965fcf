//! Tokenizer for ECMAScript source text.
//!
//! The lexer is hand-rolled (no `logos`/`lalrpop`): it walks the source
//! `Chars` iterator directly, tracking line/column, and produces [`Token`]s
//! with attached [`SourceRef`]s. Regex-vs-division disambiguation and
//! template-literal brace matching are resolved by the caller asking for a
//! token in "regex-allowed" or "template" position — the lexer itself is a
//! simple function of `(input position, mode)`.

use crate::diagnostics::{ParseError, ParseErrorKind};
use crate::source::{SourceHandle, SourceRef};
use crate::token::{Keyword, NumberKind, NumericLiteral, Punct, TemplatePart, Token, TokenKind};

/// Whether the lexer should treat a leading `/` as starting a regex literal
/// (true) or a division operator (false). The parser tracks this based on
/// what token preceded: after an identifier, number, `)`, `]`, or `this`, a
/// `/` is division; otherwise it can start a regex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RegexContext {
    Allowed,
    Disallowed,
}

/// Owns the source text via `handle`, so the lexer has no external lifetime
/// parameter and can be freely cloned for 1-2 token lookahead (arrow-function
/// disambiguation, labeled-statement detection).
#[derive(Clone)]
pub(crate) struct Lexer {
    handle: SourceHandle,
    offset: u32,
    line: u32,
    /// Column of `offset`, counted in UTF-16 code units to match the spec's
    /// "String: UTF-16 semantics" data model (surrogate pairs count as two).
    column: u32,
}

impl Lexer {
    pub fn new(handle: SourceHandle) -> Self {
        Self { handle, offset: 0, line: 1, column: 0 }
    }

    /// The unconsumed source text starting at an arbitrary byte offset.
    /// Used by the parser for raw-text lookahead (e.g. scanning for the `=>`
    /// that disambiguates arrow-function parameter lists).
    pub fn text_from(&self, offset: u32) -> &str {
        &self.handle.text[offset as usize..]
    }

    fn rest(&self) -> &str {
        &self.handle.text[self.offset as usize..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek2(&self) -> Option<char> {
        let mut it = self.rest().chars();
        it.next();
        it.next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.rest().chars().next()?;
        self.offset += c.len_utf8() as u32;
        if c == '\n' {
            self.line += 1;
            self.column = 0;
        } else {
            self.column += c.len_utf16() as u32;
        }
        Some(c)
    }

    fn mark(&self) -> (u32, u32, u32) {
        (self.offset, self.line, self.column)
    }

    fn span(&self, start: (u32, u32, u32)) -> SourceRef {
        SourceRef::new(self.handle.clone(), start.0, self.offset, start.1, start.2)
    }

    fn error(&self, kind: ParseErrorKind) -> ParseError {
        ParseError::new(kind, self.handle.clone(), self.line, self.column)
    }

    /// Skips whitespace and comments, returning whether a line terminator was
    /// crossed (used for automatic semicolon insertion upstream).
    fn skip_trivia(&mut self) -> bool {
        let mut saw_newline = false;
        loop {
            match self.peek() {
                Some(c) if c == '\n' || c == '\u{2028}' || c == '\u{2029}' => {
                    saw_newline = true;
                    self.bump();
                }
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('/') if self.peek2() == Some('/') => {
                    while !matches!(self.peek(), None | Some('\n')) {
                        self.bump();
                    }
                }
                Some('/') if self.peek2() == Some('*') => {
                    self.bump();
                    self.bump();
                    loop {
                        match self.peek() {
                            None => break,
                            Some('\n') => {
                                saw_newline = true;
                                self.bump();
                            }
                            Some('*') if self.peek2() == Some('/') => {
                                self.bump();
                                self.bump();
                                break;
                            }
                            _ => {
                                self.bump();
                            }
                        }
                    }
                }
                _ => break,
            }
        }
        saw_newline
    }

    /// Produces the next token. `regex_ctx` tells the lexer whether a leading
    /// `/` should start a regex literal.
    pub fn next_token(&mut self, regex_ctx: RegexContext) -> Result<Token, ParseError> {
        let preceded_by_newline = self.skip_trivia();
        let start = self.mark();
        let Some(c) = self.peek() else {
            return Ok(Token { kind: TokenKind::Eof, source_ref: self.span(start), preceded_by_newline });
        };

        let kind = if c == '#' && is_ident_start(self.peek2().unwrap_or(' ')) {
            self.bump();
            TokenKind::PrivateIdentifier(self.read_identifier_tail())
        } else if is_ident_start(c) {
            let ident = self.read_identifier_tail();
            match Keyword::from_str(&ident) {
                Some(kw) => TokenKind::Keyword(kw),
                None => TokenKind::Identifier(ident),
            }
        } else if c.is_ascii_digit() || (c == '.' && self.peek2().is_some_and(|d| d.is_ascii_digit())) {
            self.read_number()?
        } else if c == '"' || c == '\'' {
            TokenKind::String(self.read_string(c)?)
        } else if c == '`' {
            self.read_template_chunk(true)?
        } else if c == '/' && regex_ctx == RegexContext::Allowed {
            self.read_regex()?
        } else {
            self.read_punct()?
        };

        Ok(Token { kind, source_ref: self.span(start), preceded_by_newline })
    }

    /// Continues lexing a template literal after a `}` that closed a
    /// substitution expression. `is_head` is false for these continuations.
    pub fn next_template_chunk(&mut self) -> Result<Token, ParseError> {
        let start = self.mark();
        let kind = self.read_template_chunk(false)?;
        Ok(Token { kind, source_ref: self.span(start), preceded_by_newline: false })
    }

    fn read_identifier_tail(&mut self) -> String {
        let mut s = String::new();
        while let Some(c) = self.peek() {
            if is_ident_continue(c) {
                s.push(c);
                self.bump();
            } else {
                break;
            }
        }
        s
    }

    fn read_number(&mut self) -> Result<TokenKind, ParseError> {
        let (kind, digits) = if self.peek() == Some('0') && matches!(self.peek2(), Some('x' | 'X')) {
            self.bump();
            self.bump();
            (NumberKind::Hex, self.read_digits(|c| c.is_ascii_hexdigit()))
        } else if self.peek() == Some('0') && matches!(self.peek2(), Some('o' | 'O')) {
            self.bump();
            self.bump();
            (NumberKind::Octal, self.read_digits(|c| ('0'..='7').contains(&c)))
        } else if self.peek() == Some('0') && matches!(self.peek2(), Some('b' | 'B')) {
            self.bump();
            self.bump();
            (NumberKind::Binary, self.read_digits(|c| c == '0' || c == '1'))
        } else {
            let mut digits = self.read_digits(|c| c.is_ascii_digit());
            if self.peek() == Some('.') {
                digits.push('.');
                self.bump();
                digits.push_str(&self.read_digits(|c| c.is_ascii_digit()));
            }
            if matches!(self.peek(), Some('e' | 'E')) {
                digits.push('e');
                self.bump();
                if matches!(self.peek(), Some('+' | '-')) {
                    digits.push(self.peek().unwrap());
                    self.bump();
                }
                digits.push_str(&self.read_digits(|c| c.is_ascii_digit()));
            }
            (NumberKind::Decimal, digits)
        };

        let is_bigint = self.peek() == Some('n');
        if is_bigint {
            self.bump();
        }
        Ok(TokenKind::Number(NumericLiteral { kind, digits, is_bigint }))
    }

    fn read_digits(&mut self, pred: impl Fn(char) -> bool) -> String {
        let mut s = String::new();
        while let Some(c) = self.peek() {
            if c == '_' {
                self.bump();
            } else if pred(c) {
                s.push(c);
                self.bump();
            } else {
                break;
            }
        }
        s
    }

    fn read_string(&mut self, quote: char) -> Result<String, ParseError> {
        self.bump();
        let mut s = String::new();
        loop {
            match self.peek() {
                None => return Err(self.error(ParseErrorKind::UnterminatedString)),
                Some(c) if c == quote => {
                    self.bump();
                    break;
                }
                Some('\\') => {
                    self.bump();
                    self.read_escape(&mut s)?;
                }
                Some(c) => {
                    s.push(c);
                    self.bump();
                }
            }
        }
        Ok(s)
    }

    /// Handles the shared escape grammar for string and template literals:
    /// `\n \r \t \\ \" \' \xHH \uHHHH \u{...}` plus line-continuation (a
    /// backslash immediately followed by a line terminator yields nothing).
    fn read_escape(&mut self, out: &mut String) -> Result<(), ParseError> {
        match self.peek() {
            Some('n') => { out.push('\n'); self.bump(); }
            Some('r') => { out.push('\r'); self.bump(); }
            Some('t') => { out.push('\t'); self.bump(); }
            Some('b') => { out.push('\u{8}'); self.bump(); }
            Some('f') => { out.push('\u{c}'); self.bump(); }
            Some('v') => { out.push('\u{b}'); self.bump(); }
            Some('0') if !self.peek2().is_some_and(|c| c.is_ascii_digit()) => { out.push('\0'); self.bump(); }
            Some('\n') => { self.bump(); }
            Some('\r') => {
                self.bump();
                if self.peek() == Some('\n') {
                    self.bump();
                }
            }
            Some('\u{2028}' | '\u{2029}') => { self.bump(); }
            Some('x') => {
                self.bump();
                let hex = self.take_n_hex(2)?;
                out.push(char::from_u32(hex).unwrap_or('\u{fffd}'));
            }
            Some('u') => {
                self.bump();
                if self.peek() == Some('{') {
                    self.bump();
                    let mut hex = String::new();
                    while self.peek() != Some('}') {
                        match self.peek() {
                            Some(c) if c.is_ascii_hexdigit() => { hex.push(c); self.bump(); }
                            _ => return Err(self.error(ParseErrorKind::InvalidEscape)),
                        }
                    }
                    self.bump();
                    let code = u32::from_str_radix(&hex, 16).map_err(|_| self.error(ParseErrorKind::InvalidEscape))?;
                    out.push(char::from_u32(code).unwrap_or('\u{fffd}'));
                } else {
                    let code = self.take_n_hex(4)?;
                    out.push(char::from_u32(code).unwrap_or('\u{fffd}'));
                }
            }
            Some(c) => { out.push(c); self.bump(); }
            None => return Err(self.error(ParseErrorKind::UnterminatedString)),
        }
        Ok(())
    }

    fn take_n_hex(&mut self, n: usize) -> Result<u32, ParseError> {
        let mut hex = String::new();
        for _ in 0..n {
            match self.peek() {
                Some(c) if c.is_ascii_hexdigit() => { hex.push(c); self.bump(); }
                _ => return Err(self.error(ParseErrorKind::InvalidEscape)),
            }
        }
        u32::from_str_radix(&hex, 16).map_err(|_| self.error(ParseErrorKind::InvalidEscape))
    }

    /// Reads one chunk of a template literal: from `` ` `` or `}` up to the
    /// next `${` (producing a non-tail chunk) or the closing `` ` `` (tail).
    fn read_template_chunk(&mut self, is_head: bool) -> Result<TokenKind, ParseError> {
        self.bump(); // consume the opening backtick or `}`.
        let _ = is_head;
        let mut cooked = String::new();
        let mut raw = String::new();
        loop {
            match self.peek() {
                None => return Err(self.error(ParseErrorKind::UnterminatedTemplate)),
                Some('`') => {
                    self.bump();
                    return Ok(TokenKind::TemplateChunk { part: TemplatePart::Chunk { cooked, raw }, is_tail: true });
                }
                Some('$') if self.peek2() == Some('{') => {
                    self.bump();
                    self.bump();
                    return Ok(TokenKind::TemplateChunk { part: TemplatePart::Chunk { cooked, raw }, is_tail: false });
                }
                Some('\\') => {
                    let start_offset = self.offset;
                    self.bump();
                    self.read_escape(&mut cooked)?;
                    raw.push_str(&self.handle.text[start_offset as usize..self.offset as usize]);
                }
                Some(c) => {
                    cooked.push(c);
                    raw.push(c);
                    self.bump();
                }
            }
        }
    }

    fn read_regex(&mut self) -> Result<TokenKind, ParseError> {
        self.bump(); // leading '/'
        let mut pattern = String::new();
        let mut in_class = false;
        loop {
            match self.peek() {
                None | Some('\n') => return Err(self.error(ParseErrorKind::UnterminatedRegex)),
                Some('\\') => {
                    pattern.push('\\');
                    self.bump();
                    if let Some(c) = self.peek() {
                        pattern.push(c);
                        self.bump();
                    }
                }
                Some('[') => { in_class = true; pattern.push('['); self.bump(); }
                Some(']') => { in_class = false; pattern.push(']'); self.bump(); }
                Some('/') if !in_class => { self.bump(); break; }
                Some(c) => { pattern.push(c); self.bump(); }
            }
        }
        let flags = self.read_identifier_tail();
        Ok(TokenKind::Regex { pattern, flags })
    }

    fn read_punct(&mut self) -> Result<TokenKind, ParseError> {
        let c = self.bump().expect("checked by caller");
        macro_rules! two {
            ($second:expr, $then:expr, $else_:expr) => {
                if self.peek() == Some($second) { self.bump(); $then } else { $else_ }
            };
        }
        let p = match c {
            '(' => Punct::LParen, ')' => Punct::RParen,
            '{' => Punct::LBrace, '}' => Punct::RBrace,
            '[' => Punct::LBracket, ']' => Punct::RBracket,
            ';' => Punct::Semi, ',' => Punct::Comma, ':' => Punct::Colon, '~' => Punct::Tilde, '#' => Punct::Hash,
            '.' => {
                if self.peek() == Some('.') && self.peek2() == Some('.') {
                    self.bump();
                    self.bump();
                    Punct::DotDotDot
                } else {
                    Punct::Dot
                }
            }
            '?' => {
                if self.peek() == Some('.') && !self.peek2().is_some_and(|d| d.is_ascii_digit()) {
                    self.bump();
                    Punct::QuestionDot
                } else if self.peek() == Some('?') {
                    self.bump();
                    two!('=', Punct::QuestionQuestionEq, Punct::QuestionQuestion)
                } else {
                    Punct::QuestionMark
                }
            }
            '+' => {
                if self.peek() == Some('+') { self.bump(); Punct::PlusPlus }
                else { two!('=', Punct::PlusEq, Punct::Plus) }
            }
            '-' => {
                if self.peek() == Some('-') { self.bump(); Punct::MinusMinus }
                else { two!('=', Punct::MinusEq, Punct::Minus) }
            }
            '*' => {
                if self.peek() == Some('*') {
                    self.bump();
                    two!('=', Punct::StarStarEq, Punct::StarStar)
                } else {
                    two!('=', Punct::StarEq, Punct::Star)
                }
            }
            '/' => two!('=', Punct::SlashEq, Punct::Slash),
            '%' => two!('=', Punct::PercentEq, Punct::Percent),
            '^' => two!('=', Punct::CaretEq, Punct::Caret),
            '&' => {
                if self.peek() == Some('&') {
                    self.bump();
                    two!('=', Punct::AmpAmpEq, Punct::AmpAmp)
                } else {
                    two!('=', Punct::AmpEq, Punct::Amp)
                }
            }
            '|' => {
                if self.peek() == Some('|') {
                    self.bump();
                    two!('=', Punct::PipePipeEq, Punct::PipePipe)
                } else {
                    two!('=', Punct::PipeEq, Punct::Pipe)
                }
            }
            '!' => {
                if self.peek() == Some('=') {
                    self.bump();
                    two!('=', Punct::NotEqEq, Punct::NotEq)
                } else {
                    Punct::Not
                }
            }
            '=' => {
                if self.peek() == Some('=') {
                    self.bump();
                    two!('=', Punct::EqEqEq, Punct::EqEq)
                } else if self.peek() == Some('>') {
                    self.bump();
                    Punct::Arrow
                } else {
                    Punct::Eq
                }
            }
            '<' => {
                if self.peek() == Some('<') {
                    self.bump();
                    two!('=', Punct::LtLtEq, Punct::LtLt)
                } else {
                    two!('=', Punct::LtEq, Punct::Lt)
                }
            }
            '>' => {
                if self.peek() == Some('>') {
                    self.bump();
                    if self.peek() == Some('>') {
                        self.bump();
                        two!('=', Punct::GtGtGtEq, Punct::GtGtGt)
                    } else {
                        two!('=', Punct::GtGtEq, Punct::GtGt)
                    }
                } else {
                    two!('=', Punct::GtEq, Punct::Gt)
                }
            }
            other => return Err(self.error(ParseErrorKind::UnexpectedChar(other))),
        };
        Ok(TokenKind::Punct(p))
    }
}

fn is_ident_start(c: char) -> bool {
    c == '$' || c == '_' || c.is_alphabetic()
}

fn is_ident_continue(c: char) -> bool {
    is_ident_start(c) || c.is_ascii_digit()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(src: &str) -> Vec<TokenKind> {
        let handle = SourceHandle::new("t.js", src.to_owned());
        let mut lexer = Lexer::new(handle);
        let mut out = vec![];
        loop {
            let tok = lexer.next_token(RegexContext::Allowed).unwrap();
            if tok.kind == TokenKind::Eof {
                break;
            }
            out.push(tok.kind);
        }
        out
    }

    #[test]
    fn numbers() {
        let toks = tokens("0x1F 0o17 0b101 1.5e10 42n");
        assert!(matches!(&toks[0], TokenKind::Number(n) if n.kind == NumberKind::Hex && n.digits == "1F"));
        assert!(matches!(&toks[1], TokenKind::Number(n) if n.kind == NumberKind::Octal));
        assert!(matches!(&toks[2], TokenKind::Number(n) if n.kind == NumberKind::Binary));
        assert!(matches!(&toks[3], TokenKind::Number(n) if n.digits == "1.5e10"));
        assert!(matches!(&toks[4], TokenKind::Number(n) if n.is_bigint));
    }

    #[test]
    fn string_escapes() {
        let toks = tokens(r#""a\nbA\x42""#);
        assert_eq!(toks, vec![TokenKind::String("a\nbAB".to_owned())]);
    }

    #[test]
    fn line_continuation_yields_empty() {
        let toks = tokens("\"a\\\nb\"");
        assert_eq!(toks, vec![TokenKind::String("ab".to_owned())]);
    }

    #[test]
    fn identifiers_and_private_fields() {
        let toks = tokens("$foo _bar #priv async");
        assert_eq!(
            toks,
            vec![
                TokenKind::Identifier("$foo".to_owned()),
                TokenKind::Identifier("_bar".to_owned()),
                TokenKind::PrivateIdentifier("priv".to_owned()),
                TokenKind::Identifier("async".to_owned()),
            ]
        );
    }

    #[test]
    fn optional_chaining_and_nullish() {
        let toks = tokens("a?.b ?? c ??= d &&= e ||= f");
        assert!(matches!(toks[1], TokenKind::Punct(Punct::QuestionDot)));
        assert!(matches!(toks[3], TokenKind::Punct(Punct::QuestionQuestion)));
    }
}
