//! Character-stream lexer.
//!
//! Produces one [`Token`] at a time with its starting offset. String
//! literals keep their delimiters in the token text (the parser un-doubles
//! embedded quotes); numeric tokens keep their full lexeme so constants can
//! later be re-lexed into a narrower target type.

use crate::ast::{Token, TokenKind};
use crate::error::{ErrorKind, ParseError};

pub struct Lexer {
    input: Vec<char>,
    position: usize,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Lexer { input: input.chars().collect(), position: 0 }
    }

    fn current_char(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_char(&self, offset: usize) -> Option<char> {
        self.input.get(self.position + offset).copied()
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current_char() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_identifier(&mut self) -> String {
        let mut result = String::new();
        if let Some(ch) = self.current_char() {
            // First character may also be '@'; it cannot continue a name
            result.push(ch);
            self.advance();
        }
        while let Some(ch) = self.current_char() {
            if ch.is_alphanumeric() || ch == '_' {
                result.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        result
    }

    /// Scan a string literal, keeping delimiters and doubled quotes raw.
    fn read_string(&mut self, quote: char) -> Result<String, ParseError> {
        let mut result = String::new();
        result.push(quote);
        self.advance();

        loop {
            match self.current_char() {
                None => {
                    return Err(ParseError::new(
                        ErrorKind::UnterminatedStringLiteral,
                        self.position,
                    ))
                }
                Some(c) if c == quote => {
                    result.push(c);
                    self.advance();
                    if self.current_char() == Some(quote) {
                        // Doubled delimiter: an escaped quote, keep scanning
                        result.push(quote);
                        self.advance();
                    } else {
                        return Ok(result);
                    }
                }
                Some(c) => {
                    result.push(c);
                    self.advance();
                }
            }
        }
    }

    /// Scan an integer literal, decaying to a real literal on a fraction,
    /// an exponent, or a trailing `F`/`f`.
    fn read_number(&mut self) -> Result<(TokenKind, String), ParseError> {
        let mut text = String::new();
        let mut kind = TokenKind::IntegerLiteral;

        while let Some(ch) = self.current_char() {
            if ch.is_ascii_digit() {
                text.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        if self.current_char() == Some('.')
            && self.peek_char(1).is_some_and(|c| c.is_ascii_digit())
        {
            kind = TokenKind::RealLiteral;
            text.push('.');
            self.advance();
            while let Some(ch) = self.current_char() {
                if ch.is_ascii_digit() {
                    text.push(ch);
                    self.advance();
                } else {
                    break;
                }
            }
        }

        if matches!(self.current_char(), Some('E') | Some('e')) {
            kind = TokenKind::RealLiteral;
            text.push(self.current_char().unwrap());
            self.advance();
            if matches!(self.current_char(), Some('+') | Some('-')) {
                text.push(self.current_char().unwrap());
                self.advance();
            }
            if !self.current_char().is_some_and(|c| c.is_ascii_digit()) {
                return Err(ParseError::new(ErrorKind::DigitExpected, self.position));
            }
            while let Some(ch) = self.current_char() {
                if ch.is_ascii_digit() {
                    text.push(ch);
                    self.advance();
                } else {
                    break;
                }
            }
        }

        if matches!(self.current_char(), Some('F') | Some('f')) {
            text.push(self.current_char().unwrap());
            self.advance();
        }

        Ok((kind, text))
    }

    pub fn next_token(&mut self) -> Result<Token, ParseError> {
        self.skip_whitespace();
        let start = self.position;

        let ch = match self.current_char() {
            None => return Ok(Token::new(TokenKind::End, "", start)),
            Some(ch) => ch,
        };

        let token = match ch {
            '!' => {
                self.advance();
                if self.current_char() == Some('=') {
                    self.advance();
                    Token::new(TokenKind::ExclamationEqual, "!=", start)
                } else {
                    Token::new(TokenKind::Bang, "!", start)
                }
            }
            '%' => {
                self.advance();
                Token::new(TokenKind::Percent, "%", start)
            }
            '&' => {
                self.advance();
                if self.current_char() == Some('&') {
                    self.advance();
                    Token::new(TokenKind::DoubleAmp, "&&", start)
                } else {
                    Token::new(TokenKind::Amp, "&", start)
                }
            }
            '(' => {
                self.advance();
                Token::new(TokenKind::OpenParen, "(", start)
            }
            ')' => {
                self.advance();
                Token::new(TokenKind::CloseParen, ")", start)
            }
            '*' => {
                self.advance();
                Token::new(TokenKind::Asterisk, "*", start)
            }
            '+' => {
                self.advance();
                Token::new(TokenKind::Plus, "+", start)
            }
            ',' => {
                self.advance();
                Token::new(TokenKind::Comma, ",", start)
            }
            '-' => {
                self.advance();
                Token::new(TokenKind::Minus, "-", start)
            }
            '.' => {
                self.advance();
                Token::new(TokenKind::Dot, ".", start)
            }
            '/' => {
                self.advance();
                Token::new(TokenKind::Slash, "/", start)
            }
            ':' => {
                self.advance();
                Token::new(TokenKind::Colon, ":", start)
            }
            '<' => {
                self.advance();
                match self.current_char() {
                    Some('=') => {
                        self.advance();
                        Token::new(TokenKind::LessThanEqual, "<=", start)
                    }
                    Some('>') => {
                        self.advance();
                        Token::new(TokenKind::LessGreater, "<>", start)
                    }
                    _ => Token::new(TokenKind::LessThan, "<", start),
                }
            }
            '=' => {
                self.advance();
                if self.current_char() == Some('=') {
                    self.advance();
                    Token::new(TokenKind::DoubleEqual, "==", start)
                } else {
                    Token::new(TokenKind::Equal, "=", start)
                }
            }
            '>' => {
                self.advance();
                if self.current_char() == Some('=') {
                    self.advance();
                    Token::new(TokenKind::GreaterThanEqual, ">=", start)
                } else {
                    Token::new(TokenKind::GreaterThan, ">", start)
                }
            }
            '?' => {
                self.advance();
                Token::new(TokenKind::Question, "?", start)
            }
            '[' => {
                self.advance();
                Token::new(TokenKind::OpenBracket, "[", start)
            }
            ']' => {
                self.advance();
                Token::new(TokenKind::CloseBracket, "]", start)
            }
            '|' => {
                self.advance();
                if self.current_char() == Some('|') {
                    self.advance();
                    Token::new(TokenKind::DoubleBar, "||", start)
                } else {
                    Token::new(TokenKind::Bar, "|", start)
                }
            }
            '"' | '\'' => {
                let text = self.read_string(ch)?;
                Token::new(TokenKind::StringLiteral, text, start)
            }
            c if c.is_alphabetic() || c == '@' || c == '_' => {
                let text = self.read_identifier();
                let kind = if text.eq_ignore_ascii_case("as") {
                    TokenKind::AsType
                } else if text.eq_ignore_ascii_case("is") {
                    TokenKind::IsType
                } else {
                    TokenKind::Identifier
                };
                Token::new(kind, text, start)
            }
            c if c.is_ascii_digit() => {
                let (kind, text) = self.read_number()?;
                Token::new(kind, text, start)
            }
            c => return Err(ParseError::new(ErrorKind::InvalidCharacter(c), start)),
        };

        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        let mut lexer = Lexer::new(input);
        let mut out = vec![];
        loop {
            let token = lexer.next_token().unwrap();
            if token.kind == TokenKind::End {
                break;
            }
            out.push(token.kind);
        }
        out
    }

    #[test]
    fn compound_punctuators() {
        assert_eq!(
            kinds("!= && <= <> == >= ||"),
            vec![
                TokenKind::ExclamationEqual,
                TokenKind::DoubleAmp,
                TokenKind::LessThanEqual,
                TokenKind::LessGreater,
                TokenKind::DoubleEqual,
                TokenKind::GreaterThanEqual,
                TokenKind::DoubleBar,
            ]
        );
    }

    #[test]
    fn as_and_is_are_retagged() {
        assert_eq!(kinds("x as y is z"), vec![
            TokenKind::Identifier,
            TokenKind::AsType,
            TokenKind::Identifier,
            TokenKind::IsType,
            TokenKind::Identifier,
        ]);
    }

    #[test]
    fn dot_only_decays_with_digit() {
        // `1.5` is one real literal, `1.Foo` is integer-dot-identifier
        assert_eq!(kinds("1.5"), vec![TokenKind::RealLiteral]);
        assert_eq!(
            kinds("1.Foo"),
            vec![TokenKind::IntegerLiteral, TokenKind::Dot, TokenKind::Identifier]
        );
    }
}
