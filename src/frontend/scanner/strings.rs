use super::Scanner;
use crate::frontend::token::Token;
use crate::frontend::token_type::TokenType;

impl Scanner<'_> {
    /// Reads a string literal, resolving escapes as it goes. The returned
    /// token's lexeme is the unescaped contents without the quotes.
    pub(super) fn read_string(&mut self) -> Token {
        let mut contents: Vec<u8> = Vec::new();

        loop {
            let byte = match self.peek() {
                Some(byte) => byte,
                None => return self.error_token("Unterminated string."),
            };
            self.current += 1;

            match byte {
                b'"' => break,
                b'\n' => {
                    self.line += 1;
                    contents.push(byte);
                }
                b'\\' => {
                    let escape = match self.peek() {
                        Some(escape) => escape,
                        None => return self.error_token("Unterminated string."),
                    };
                    self.current += 1;
                    match escape {
                        b'n' => contents.push(b'\n'),
                        b't' => contents.push(b'\t'),
                        b'r' => contents.push(b'\r'),
                        b'"' => contents.push(b'"'),
                        b'\\' => contents.push(b'\\'),
                        b'e' => contents.push(0x1b),
                        other => {
                            return self.error_token(format!(
                                "Invalid escape character '{}'.",
                                other as char
                            ));
                        }
                    }
                }
                other => contents.push(other),
            }
        }

        let lexeme = String::from_utf8_lossy(&contents).into_owned();
        Token::new(TokenType::String, lexeme, self.line)
    }
}

#[cfg(test)]
mod tests {
    use crate::frontend::scanner::Scanner;
    use crate::frontend::token_type::TokenType;

    #[test]
    fn test_plain_string() {
        let tokens = Scanner::new("\"hello\"").tokenize();
        assert_eq!(tokens[0].token_type, TokenType::String);
        assert_eq!(tokens[0].lexeme, "hello");
    }

    #[test]
    fn test_escapes_are_resolved() {
        let tokens = Scanner::new(r#""a\nb\tc\"d\\e""#).tokenize();
        assert_eq!(tokens[0].lexeme, "a\nb\tc\"d\\e");
    }

    #[test]
    fn test_escape_sequence_esc() {
        let tokens = Scanner::new(r#""\e[0m""#).tokenize();
        assert_eq!(tokens[0].lexeme, "\u{1b}[0m");
    }

    #[test]
    fn test_invalid_escape_is_error() {
        let tokens = Scanner::new(r#""\q""#).tokenize();
        assert_eq!(tokens[0].token_type, TokenType::Error);
        assert_eq!(tokens[0].lexeme, "Invalid escape character 'q'.");
    }

    #[test]
    fn test_unterminated_string_is_error() {
        let tokens = Scanner::new("\"abc").tokenize();
        assert_eq!(tokens[0].token_type, TokenType::Error);
        assert_eq!(tokens[0].lexeme, "Unterminated string.");
    }

    #[test]
    fn test_multiline_string_counts_lines() {
        let tokens = Scanner::new("\"a\nb\" x").tokenize();
        assert_eq!(tokens[0].lexeme, "a\nb");
        assert_eq!(tokens[1].line, 2);
    }
}
