//! The Cmel scanner - turns raw source bytes into tokens.

mod comments;
mod identifiers;
mod numbers;
mod strings;

use super::token::Token;
use super::token_type::TokenType;

/// On-demand tokenizer over raw source bytes.
///
/// The scanner is UTF-8 naive: it operates on bytes and never decodes
/// characters. Problems (stray characters, unterminated strings, bad
/// escapes) become `Error` tokens whose lexeme is the message, so the
/// compiler can keep going and synchronize.
pub struct Scanner<'a> {
    source: &'a [u8],
    start: usize,
    current: usize,
    line: usize,
}

impl<'a> Scanner<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source: source.as_bytes(),
            start: 0,
            current: 0,
            line: 1,
        }
    }

    /// Scans and returns the next token, consuming input.
    pub fn scan_token(&mut self) -> Token {
        self.skip_ignorable();
        self.start = self.current;

        if self.is_at_end() {
            return self.make_token(TokenType::Eof);
        }

        let byte = self.advance();
        match byte {
            b'(' => self.make_token(TokenType::LeftParen),
            b')' => self.make_token(TokenType::RightParen),
            b'{' => self.make_token(TokenType::LeftBrace),
            b'}' => self.make_token(TokenType::RightBrace),
            b'[' => self.make_token(TokenType::LeftBracket),
            b']' => self.make_token(TokenType::RightBracket),
            b',' => self.make_token(TokenType::Comma),
            b'.' => self.make_token(TokenType::Dot),
            b'-' => self.make_token(TokenType::Minus),
            b'+' => self.make_token(TokenType::Plus),
            b';' => self.make_token(TokenType::Semicolon),
            b'/' => self.make_token(TokenType::Slash),
            b'*' => self.make_token(TokenType::Star),
            b'%' => self.make_token(TokenType::Percent),
            b':' => self.make_token(TokenType::Colon),
            b'!' => {
                if self.match_byte(b'=') {
                    self.make_token(TokenType::BangEqual)
                } else {
                    self.make_token(TokenType::Bang)
                }
            }
            b'=' => {
                if self.match_byte(b'=') {
                    self.make_token(TokenType::EqualEqual)
                } else {
                    self.make_token(TokenType::Equal)
                }
            }
            b'<' => {
                if self.match_byte(b'=') {
                    self.make_token(TokenType::LessEqual)
                } else {
                    self.make_token(TokenType::Less)
                }
            }
            b'>' => {
                if self.match_byte(b'=') {
                    self.make_token(TokenType::GreaterEqual)
                } else {
                    self.make_token(TokenType::Greater)
                }
            }
            b'"' => self.read_string(),
            byte if Self::is_digit(byte) => self.read_number(),
            byte if Self::is_alpha(byte) => self.read_identifier(),
            byte => self.error_token(format!("Unexpected character '{}'.", byte as char)),
        }
    }

    /// Tokenizes the remaining input, ending with `Eof`.
    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.scan_token();
            let done = token.token_type == TokenType::Eof;
            tokens.push(token);
            if done {
                break;
            }
        }
        tokens
    }

    fn make_token(&self, token_type: TokenType) -> Token {
        let lexeme = String::from_utf8_lossy(&self.source[self.start..self.current]).into_owned();
        Token::new(token_type, lexeme, self.line)
    }

    fn error_token(&self, message: impl Into<String>) -> Token {
        Token::new(TokenType::Error, message, self.line)
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }

    fn advance(&mut self) -> u8 {
        let byte = self.source[self.current];
        self.current += 1;
        byte
    }

    fn peek(&self) -> Option<u8> {
        self.source.get(self.current).copied()
    }

    fn peek_next(&self) -> Option<u8> {
        self.source.get(self.current + 1).copied()
    }

    fn match_byte(&mut self, expected: u8) -> bool {
        if self.peek() == Some(expected) {
            self.current += 1;
            true
        } else {
            false
        }
    }

    fn is_digit(byte: u8) -> bool {
        byte.is_ascii_digit()
    }

    fn is_alpha(byte: u8) -> bool {
        byte.is_ascii_alphabetic() || byte == b'_'
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_types(source: &str) -> Vec<TokenType> {
        Scanner::new(source)
            .tokenize()
            .into_iter()
            .map(|t| t.token_type)
            .collect()
    }

    #[test]
    fn test_single_and_double_char_operators() {
        assert_eq!(
            token_types("( ) { } [ ] , . - + ; / * % :"),
            vec![
                TokenType::LeftParen,
                TokenType::RightParen,
                TokenType::LeftBrace,
                TokenType::RightBrace,
                TokenType::LeftBracket,
                TokenType::RightBracket,
                TokenType::Comma,
                TokenType::Dot,
                TokenType::Minus,
                TokenType::Plus,
                TokenType::Semicolon,
                TokenType::Slash,
                TokenType::Star,
                TokenType::Percent,
                TokenType::Colon,
                TokenType::Eof,
            ]
        );
        assert_eq!(
            token_types("! != = == < <= > >="),
            vec![
                TokenType::Bang,
                TokenType::BangEqual,
                TokenType::Equal,
                TokenType::EqualEqual,
                TokenType::Less,
                TokenType::LessEqual,
                TokenType::Greater,
                TokenType::GreaterEqual,
                TokenType::Eof,
            ]
        );
    }

    #[test]
    fn test_keywords_and_identifiers() {
        let tokens = Scanner::new("var foo = nil;").tokenize();
        assert_eq!(tokens[0].token_type, TokenType::Var);
        assert_eq!(tokens[1].token_type, TokenType::Identifier);
        assert_eq!(tokens[1].lexeme, "foo");
        assert_eq!(tokens[3].token_type, TokenType::Nil);
    }

    #[test]
    fn test_all_keywords() {
        let source = "and or class else export false for from fun if import nil \
                      print return super this true var const while break";
        let types = token_types(source);
        assert_eq!(types.len(), 22);
        assert!(!types.contains(&TokenType::Identifier));
    }

    #[test]
    fn test_number_literals() {
        let tokens = Scanner::new("12 3.5 0.25").tokenize();
        assert_eq!(tokens[0].lexeme, "12");
        assert_eq!(tokens[1].lexeme, "3.5");
        assert_eq!(tokens[2].lexeme, "0.25");
        assert!(tokens[..3]
            .iter()
            .all(|t| t.token_type == TokenType::Number));
    }

    #[test]
    fn test_line_counting() {
        let tokens = Scanner::new("1\n2\n\n3").tokenize();
        assert_eq!(tokens[0].line, 1);
        assert_eq!(tokens[1].line, 2);
        assert_eq!(tokens[2].line, 4);
    }

    #[test]
    fn test_stray_character_is_error_token() {
        let tokens = Scanner::new("@").tokenize();
        assert_eq!(tokens[0].token_type, TokenType::Error);
        assert_eq!(tokens[0].lexeme, "Unexpected character '@'.");
        assert_eq!(tokens[1].token_type, TokenType::Eof);
    }
}
