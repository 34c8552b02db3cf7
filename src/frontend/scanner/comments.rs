use super::Scanner;

impl Scanner<'_> {
    /// Skips whitespace, `//` line comments, and non-nesting `/* ... */`
    /// block comments. An unterminated block comment simply runs to the end
    /// of input; the missing statement after it surfaces as a parse error.
    pub(super) fn skip_ignorable(&mut self) {
        loop {
            match self.peek() {
                Some(b' ') | Some(b'\r') | Some(b'\t') => {
                    self.current += 1;
                }
                Some(b'\n') => {
                    self.line += 1;
                    self.current += 1;
                }
                Some(b'/') if self.peek_next() == Some(b'/') => {
                    while let Some(byte) = self.peek() {
                        if byte == b'\n' {
                            break;
                        }
                        self.current += 1;
                    }
                }
                Some(b'/') if self.peek_next() == Some(b'*') => {
                    self.current += 2;
                    self.skip_block_comment();
                }
                _ => return,
            }
        }
    }

    fn skip_block_comment(&mut self) {
        while let Some(byte) = self.peek() {
            if byte == b'*' && self.peek_next() == Some(b'/') {
                self.current += 2;
                return;
            }
            if byte == b'\n' {
                self.line += 1;
            }
            self.current += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::frontend::scanner::Scanner;
    use crate::frontend::token_type::TokenType;

    #[test]
    fn test_line_comment_skipped() {
        let tokens = Scanner::new("1 // comment\n2").tokenize();
        assert_eq!(tokens[0].lexeme, "1");
        assert_eq!(tokens[1].lexeme, "2");
        assert_eq!(tokens[1].line, 2);
    }

    #[test]
    fn test_block_comment_skipped_and_lines_counted() {
        let tokens = Scanner::new("1 /* a\nb */ 2").tokenize();
        assert_eq!(tokens[0].lexeme, "1");
        assert_eq!(tokens[1].lexeme, "2");
        assert_eq!(tokens[1].line, 2);
    }

    #[test]
    fn test_block_comments_do_not_nest() {
        // The first */ ends the comment, so the trailing */ is stray input.
        let tokens = Scanner::new("/* /* */ 1 */").tokenize();
        assert_eq!(tokens[0].token_type, TokenType::Number);
        assert_eq!(tokens[1].token_type, TokenType::Star);
    }
}
