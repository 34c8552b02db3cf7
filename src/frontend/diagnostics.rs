use std::fmt;

use super::token::Token;
use super::token_type::TokenType;

/// A compile-time problem tied to a source line.
///
/// Rendering is fixed-format so the CLI, the REPL, and the test harness all
/// see the same text:
///
/// ```text
/// [line 3] Error at 'x': Expected ';' after value.
/// [line 7] Error at end: Expected '}' after block.
/// [line 1] Error: Unterminated string.
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub line: usize,
    pub location: Option<String>,
    pub message: String,
}

impl Diagnostic {
    pub fn new(line: usize, location: Option<String>, message: impl Into<String>) -> Self {
        Self {
            line,
            location,
            message: message.into(),
        }
    }

    /// Builds a diagnostic pointing at a token, following the token's kind:
    /// `Eof` renders as `at end`, scanner `Error` tokens render bare (their
    /// lexeme already is the message), everything else quotes the lexeme.
    pub fn at_token(token: &Token, message: impl Into<String>) -> Self {
        let location = match token.token_type {
            TokenType::Eof => Some("end".to_string()),
            TokenType::Error => None,
            _ => Some(format!("'{}'", token.lexeme)),
        };
        Self::new(token.line, location, message)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(location) => write!(
                f,
                "[line {}] Error at {}: {}",
                self.line, location, self.message
            ),
            None => write!(f, "[line {}] Error: {}", self.line, self.message),
        }
    }
}

/// Renders a batch of diagnostics, one per line.
pub fn render_diagnostics(diagnostics: &[Diagnostic]) -> String {
    let lines: Vec<String> = diagnostics.iter().map(|d| d.to_string()).collect();
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_display_with_location() {
        let diag = Diagnostic::new(3, Some("'x'".to_string()), "Expected ';' after value.");
        assert_eq!(
            diag.to_string(),
            "[line 3] Error at 'x': Expected ';' after value."
        );
    }

    #[test]
    fn test_diagnostic_display_without_location() {
        let diag = Diagnostic::new(1, None, "Unterminated string.");
        assert_eq!(diag.to_string(), "[line 1] Error: Unterminated string.");
    }

    #[test]
    fn test_diagnostic_at_eof_token() {
        let token = Token::new(TokenType::Eof, "", 7);
        let diag = Diagnostic::at_token(&token, "Expected '}' after block.");
        assert_eq!(
            diag.to_string(),
            "[line 7] Error at end: Expected '}' after block."
        );
    }

    #[test]
    fn test_render_batch() {
        let diags = vec![
            Diagnostic::new(1, None, "first"),
            Diagnostic::new(2, None, "second"),
        ];
        assert_eq!(
            render_diagnostics(&diags),
            "[line 1] Error: first\n[line 2] Error: second"
        );
    }
}
