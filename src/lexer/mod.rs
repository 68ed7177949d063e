//! Lexical analysis for the nanoc source language.
//!
//! The lexer is on-demand: it holds exactly one token (the one under the
//! cursor) and produces the next on [`Lexer::advance`]. At end of input it
//! keeps yielding the EOF token.

mod token;

pub use token::*;

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::error::{CompileError, CompileResult};

static KEYWORDS: Lazy<HashMap<&'static str, TokenKind>> = Lazy::new(|| {
    HashMap::from_iter([
        ("int", TokenKind::Int),
        ("void", TokenKind::Void),
        ("if", TokenKind::If),
        ("else", TokenKind::Else),
        ("while", TokenKind::While),
        ("for", TokenKind::For),
        ("return", TokenKind::Return),
    ])
});

pub struct Lexer<'a> {
    input: &'a str,
    position: usize,
    line: usize,
    col: usize,
    current: Token,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> CompileResult<Self> {
        let mut lexer = Self {
            input,
            position: 0,
            line: 1,
            col: 1,
            current: Token::new(TokenKind::Eof, 1, 1),
        };
        lexer.advance()?;
        Ok(lexer)
    }

    /// The token under the cursor.
    pub fn current(&self) -> &Token {
        &self.current
    }

    /// Move the cursor one token forward. Idempotent at end of input.
    pub fn advance(&mut self) -> CompileResult<()> {
        self.eat_whitespace();

        let (line, col) = (self.line, self.col);

        let Some(next) = self.peek() else {
            self.current = Token::new(TokenKind::Eof, line, col);
            return Ok(());
        };

        self.current = match next {
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => self.lex_alphanumeric(),
            b'0'..=b'9' => self.lex_numeric(),
            b'"' => self.lex_string()?,
            _ => self.lex_special()?,
        };

        Ok(())
    }

    fn peek(&self) -> Option<u8> {
        self.input.as_bytes().get(self.position).copied()
    }

    fn peek_second(&self) -> Option<u8> {
        self.input.as_bytes().get(self.position + 1).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let next = self.peek()?;
        self.position += 1;
        if next == b'\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(next)
    }

    /// Skip whitespace and both comment forms. An unterminated block comment
    /// consumes the rest of the input without error.
    fn eat_whitespace(&mut self) {
        loop {
            match self.peek() {
                Some(b' ' | b'\t' | b'\r' | b'\n') => {
                    self.bump();
                }
                Some(b'/') if self.peek_second() == Some(b'/') => {
                    while let Some(next) = self.peek() {
                        if next == b'\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                Some(b'/') if self.peek_second() == Some(b'*') => {
                    self.bump();
                    self.bump();
                    while let Some(next) = self.bump() {
                        if next == b'*' && self.peek() == Some(b'/') {
                            self.bump();
                            break;
                        }
                    }
                }
                _ => return,
            }
        }
    }

    fn lex_alphanumeric(&mut self) -> Token {
        let (line, col) = (self.line, self.col);
        let start = self.position;

        while let Some(next) = self.peek() {
            if !(next.is_ascii_alphanumeric() || next == b'_') {
                break;
            }
            self.bump();
        }

        let lexeme = &self.input[start..self.position];

        match KEYWORDS.get(lexeme) {
            Some(kind) => Token::new(*kind, line, col),
            None => Token::ident(lexeme.to_owned(), line, col),
        }
    }

    fn lex_numeric(&mut self) -> Token {
        let (line, col) = (self.line, self.col);
        let mut value: i32 = 0;

        while let Some(next) = self.peek() {
            if !next.is_ascii_digit() {
                break;
            }
            // overflow wraps silently
            value = value.wrapping_mul(10).wrapping_add((next - b'0') as i32);
            self.bump();
        }

        Token::number(value, line, col)
    }

    /// String literals keep their inner text raw: a backslash and the
    /// character it escapes are both stored, so escape interpretation is
    /// left to the assembler's `.asciz`.
    fn lex_string(&mut self) -> CompileResult<Token> {
        let (line, col) = (self.line, self.col);
        self.bump();

        let mut value = String::new();
        loop {
            match self.bump() {
                Some(b'"') => break,
                Some(b'\\') => {
                    value.push('\\');
                    match self.bump() {
                        Some(escaped) => value.push(escaped as char),
                        None => {
                            return Err(CompileError::at(line, col, "unterminated string literal"))
                        }
                    }
                }
                Some(next) => value.push(next as char),
                None => return Err(CompileError::at(line, col, "unterminated string literal")),
            }
        }

        Ok(Token::string(value, line, col))
    }

    /// Operators and punctuation, matched greedily with one character of
    /// lookahead.
    fn lex_special(&mut self) -> CompileResult<Token> {
        let (line, col) = (self.line, self.col);
        let first = self.bump().expect("caller checked for a character");

        let kind = match first {
            b'+' => match self.peek() {
                Some(b'+') => {
                    self.bump();
                    TokenKind::PlusPlus
                }
                Some(b'=') => {
                    self.bump();
                    TokenKind::PlusAssign
                }
                _ => TokenKind::Plus,
            },
            b'-' => match self.peek() {
                Some(b'-') => {
                    self.bump();
                    TokenKind::MinusMinus
                }
                Some(b'=') => {
                    self.bump();
                    TokenKind::MinusAssign
                }
                _ => TokenKind::Minus,
            },
            b'=' => match self.peek() {
                Some(b'=') => {
                    self.bump();
                    TokenKind::Equal
                }
                _ => TokenKind::Assign,
            },
            b'!' => match self.peek() {
                Some(b'=') => {
                    self.bump();
                    TokenKind::NotEqual
                }
                _ => TokenKind::Bang,
            },
            b'<' => match self.peek() {
                Some(b'=') => {
                    self.bump();
                    TokenKind::LessOrEqual
                }
                _ => TokenKind::LessThan,
            },
            b'>' => match self.peek() {
                Some(b'=') => {
                    self.bump();
                    TokenKind::GreaterOrEqual
                }
                _ => TokenKind::GreaterThan,
            },
            b'&' => match self.peek() {
                Some(b'&') => {
                    self.bump();
                    TokenKind::AndAnd
                }
                _ => TokenKind::Ampersand,
            },
            b'|' => match self.peek() {
                Some(b'|') => {
                    self.bump();
                    TokenKind::OrOr
                }
                _ => return Err(CompileError::at(line, col, "expected `||`")),
            },
            b'*' => TokenKind::Star,
            b'/' => TokenKind::Slash,
            b'%' => TokenKind::Percent,
            b'(' => TokenKind::LParen,
            b')' => TokenKind::RParen,
            b'{' => TokenKind::LBrace,
            b'}' => TokenKind::RBrace,
            b'[' => TokenKind::LBracket,
            b']' => TokenKind::RBracket,
            b';' => TokenKind::Semicolon,
            b',' => TokenKind::Comma,
            other => {
                return Err(CompileError::at(
                    line,
                    col,
                    format!("unexpected character '{}'", other as char),
                ))
            }
        };

        Ok(Token::new(kind, line, col))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(input: &str) -> CompileResult<Vec<Token>> {
        let mut lexer = Lexer::new(input)?;
        let mut tokens = vec![];
        while lexer.current().kind != TokenKind::Eof {
            tokens.push(lexer.current().clone());
            lexer.advance()?;
        }
        Ok(tokens)
    }

    fn kinds(input: &str) -> Vec<TokenKind> {
        collect(input)
            .expect("lexing failed")
            .into_iter()
            .map(|token| token.kind)
            .collect()
    }

    #[test]
    fn test_lex_keywords_and_idents() {
        assert_eq!(
            kinds("int main void ifx"),
            vec![
                TokenKind::Int,
                TokenKind::Ident,
                TokenKind::Void,
                TokenKind::Ident
            ]
        );
    }

    #[test]
    fn test_lex_numeric() {
        let tokens = collect("1337").unwrap();
        assert_eq!(tokens[0].value, Some(1337));
        assert_eq!((tokens[0].line, tokens[0].col), (1, 1));
    }

    #[test]
    fn test_numeric_overflow_wraps() {
        let tokens = collect("99999999999999999999").unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Number);
    }

    #[test]
    fn test_greedy_operators() {
        assert_eq!(
            kinds("+ ++ += - -- -= = == ! != < <= > >= & && ||"),
            vec![
                TokenKind::Plus,
                TokenKind::PlusPlus,
                TokenKind::PlusAssign,
                TokenKind::Minus,
                TokenKind::MinusMinus,
                TokenKind::MinusAssign,
                TokenKind::Assign,
                TokenKind::Equal,
                TokenKind::Bang,
                TokenKind::NotEqual,
                TokenKind::LessThan,
                TokenKind::LessOrEqual,
                TokenKind::GreaterThan,
                TokenKind::GreaterOrEqual,
                TokenKind::Ampersand,
                TokenKind::AndAnd,
                TokenKind::OrOr,
            ]
        );
    }

    #[test]
    fn test_adjacent_plus_lexes_greedily() {
        // `+++` reads as `++` then `+`
        assert_eq!(kinds("+++"), vec![TokenKind::PlusPlus, TokenKind::Plus]);
    }

    #[test]
    fn test_lone_pipe_fails() {
        let result = collect("a | b");
        assert_eq!(result, Err(CompileError::at(1, 3, "expected `||`")));
    }

    #[test]
    fn test_unknown_character_fails() {
        let result = collect("a @ b");
        assert_eq!(result, Err(CompileError::at(1, 3, "unexpected character '@'")));
    }

    #[test]
    fn test_comments_are_whitespace() {
        assert_eq!(
            kinds("a // line comment\n b /* block\n comment */ c"),
            vec![TokenKind::Ident, TokenKind::Ident, TokenKind::Ident]
        );
    }

    #[test]
    fn test_unterminated_block_comment_runs_to_eof() {
        assert_eq!(kinds("a /* never closed"), vec![TokenKind::Ident]);
    }

    #[test]
    fn test_string_keeps_escapes_raw() {
        let tokens = collect(r#""fib(%d) = %d\n""#).unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Str);
        assert_eq!(tokens[0].text(), r"fib(%d) = %d\n");
    }

    #[test]
    fn test_string_escaped_quote() {
        let tokens = collect(r#""say \"hi\"""#).unwrap();
        assert_eq!(tokens[0].text(), r#"say \"hi\""#);
    }

    #[test]
    fn test_positions_track_lines() {
        let tokens = collect("int\n  main").unwrap();
        assert_eq!((tokens[0].line, tokens[0].col), (1, 1));
        assert_eq!((tokens[1].line, tokens[1].col), (2, 3));
    }

    #[test]
    fn test_eof_is_idempotent() {
        let mut lexer = Lexer::new("x").unwrap();
        lexer.advance().unwrap();
        assert_eq!(lexer.current().kind, TokenKind::Eof);
        lexer.advance().unwrap();
        lexer.advance().unwrap();
        assert_eq!(lexer.current().kind, TokenKind::Eof);
    }
}
