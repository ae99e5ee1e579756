use crate::error::{Error, ErrorKind};
use crate::syntax::position::Position;
use crate::syntax::token::{Token, TokenKind, keyword_or_ident};

/// Single-pass scanner with one character of lookahead. The first failure
/// aborts the whole unit — no tokens, one error.
pub struct Lexer {
    chars: Vec<char>,
    pos: Position,
    current: Option<char>,
}

impl Lexer {
    pub fn new(source_name: &str, source: &str) -> Self {
        let chars: Vec<char> = source.chars().collect();
        let current = chars.first().copied();
        Self { chars, pos: Position::start(source_name.into(), source.into()), current }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, Error> {
        let mut tokens = Vec::new();

        while let Some(ch) = self.current {
            match ch {
                ' ' | '\t' => { self.advance(); }
                '#' => self.skip_comment(),
                '\n' | ';' => tokens.push(self.single(TokenKind::Newline)),
                '0'..='9' => tokens.push(self.read_number()),
                'a'..='z' | 'A'..='Z' => tokens.push(self.read_ident()),
                '"' => tokens.push(self.read_string()?),
                '+' => tokens.push(self.single(TokenKind::Plus)),
                '-' => tokens.push(self.read_pair('>', TokenKind::Arrow, TokenKind::Minus)),
                '*' => tokens.push(self.single(TokenKind::Star)),
                '/' => tokens.push(self.single(TokenKind::Slash)),
                '^' => tokens.push(self.single(TokenKind::Caret)),
                '(' => tokens.push(self.single(TokenKind::LParen)),
                ')' => tokens.push(self.single(TokenKind::RParen)),
                '[' => tokens.push(self.single(TokenKind::LBracket)),
                ']' => tokens.push(self.single(TokenKind::RBracket)),
                ',' => tokens.push(self.single(TokenKind::Comma)),
                '!' => tokens.push(self.read_not_equals()?),
                '=' => tokens.push(self.read_pair('=', TokenKind::EqEq, TokenKind::Eq)),
                '<' => tokens.push(self.read_pair('=', TokenKind::LtEq, TokenKind::Lt)),
                '>' => tokens.push(self.read_pair('=', TokenKind::GtEq, TokenKind::Gt)),
                other => {
                    let start = self.pos.clone();
                    self.advance();
                    return Err(Error::new(
                        ErrorKind::IllegalCharacter,
                        start,
                        self.pos.clone(),
                        format!("'{other}'"),
                    ));
                }
            }
        }

        tokens.push(Token::new(TokenKind::Eof, self.pos.clone(), self.pos.clone()));
        Ok(tokens)
    }

    // ─── Primitives ──────────────────────────────────────────────────────────

    fn advance(&mut self) {
        self.pos.advance(self.current);
        self.current = self.chars.get(self.pos.index).copied();
    }

    fn single(&mut self, kind: TokenKind) -> Token {
        let start = self.pos.clone();
        self.advance();
        Token::new(kind, start, self.pos.clone())
    }

    fn read_pair(&mut self, second: char, two: TokenKind, one: TokenKind) -> Token {
        let start = self.pos.clone();
        self.advance();
        if self.current == Some(second) {
            self.advance();
            Token::new(two, start, self.pos.clone())
        } else {
            Token::new(one, start, self.pos.clone())
        }
    }

    /// Skip to the end of the line. The newline itself is left for the main
    /// loop, so a trailing comment does not swallow the statement separator.
    fn skip_comment(&mut self) {
        while let Some(c) = self.current {
            if c == '\n' { break; }
            self.advance();
        }
    }

    // ─── Readers ─────────────────────────────────────────────────────────────

    fn read_number(&mut self) -> Token {
        let start = self.pos.clone();
        let mut text = String::new();
        let mut dots = 0;

        while let Some(c) = self.current {
            if c == '.' {
                // a second dot ends the literal, unconsumed
                if dots == 1 { break; }
                dots += 1;
            } else if !c.is_ascii_digit() {
                break;
            }
            text.push(c);
            self.advance();
        }

        let kind = if dots == 0 {
            match text.parse::<i64>() {
                Ok(n) => TokenKind::Int(n),
                Err(_) => TokenKind::Float(text.parse().unwrap_or(f64::MAX)),
            }
        } else {
            TokenKind::Float(text.parse().unwrap_or(0.0))
        };
        Token::new(kind, start, self.pos.clone())
    }

    fn read_string(&mut self) -> Result<Token, Error> {
        let start = self.pos.clone();
        self.advance(); // opening quote
        let mut text = String::new();

        loop {
            match self.current {
                None => {
                    return Err(Error::new(
                        ErrorKind::ExpectedCharacter,
                        start,
                        self.pos.clone(),
                        "'\"' (string was never closed)",
                    ));
                }
                Some('"') => break,
                Some('\\') => {
                    self.advance();
                    // an unrecognised escape passes the character through;
                    // a trailing backslash falls out to the EOF arm above
                    if let Some(esc) = self.current {
                        text.push(match esc {
                            'n' => '\n',
                            't' => '\t',
                            other => other,
                        });
                        self.advance();
                    }
                }
                Some(c) => {
                    text.push(c);
                    self.advance();
                }
            }
        }

        self.advance(); // closing quote
        Ok(Token::new(TokenKind::Str(text), start, self.pos.clone()))
    }

    fn read_ident(&mut self) -> Token {
        let start = self.pos.clone();
        let mut text = String::new();
        while let Some(c) = self.current {
            if !c.is_ascii_alphanumeric() && c != '_' { break; }
            text.push(c);
            self.advance();
        }
        Token::new(keyword_or_ident(text), start, self.pos.clone())
    }

    fn read_not_equals(&mut self) -> Result<Token, Error> {
        let start = self.pos.clone();
        self.advance();
        if self.current == Some('=') {
            self.advance();
            Ok(Token::new(TokenKind::BangEq, start, self.pos.clone()))
        } else {
            self.advance();
            Err(Error::new(
                ErrorKind::ExpectedCharacter,
                start,
                self.pos.clone(),
                "'=' (after '!')",
            ))
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(src: &str) -> Vec<TokenKind> {
        Lexer::new("<test>", src)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    fn lex_err(src: &str) -> Error {
        Lexer::new("<test>", src).tokenize().unwrap_err()
    }

    #[test]
    fn empty() {
        assert_eq!(lex(""), vec![TokenKind::Eof]);
    }

    #[test]
    fn integer_literal() {
        assert_eq!(lex("42"), vec![TokenKind::Int(42), TokenKind::Eof]);
    }

    #[test]
    fn float_literal() {
        assert_eq!(lex("3.14"), vec![TokenKind::Float(3.14), TokenKind::Eof]);
    }

    #[test]
    fn integer_iff_no_dot() {
        assert_eq!(lex("7"), vec![TokenKind::Int(7), TokenKind::Eof]);
        assert_eq!(lex("7.0"), vec![TokenKind::Float(7.0), TokenKind::Eof]);
        assert_eq!(lex("0.5"), vec![TokenKind::Float(0.5), TokenKind::Eof]);
    }

    #[test]
    fn second_dot_ends_the_literal() {
        // the scan stops before the second dot; the orphaned dot then fails
        // as an illegal character
        let err = lex_err("1.2.3");
        assert_eq!(err.kind, ErrorKind::IllegalCharacter);
        assert_eq!(err.details, "'.'");
    }

    #[test]
    fn keywords_are_uppercase() {
        assert_eq!(lex("VAR"), vec![TokenKind::Var, TokenKind::Eof]);
        assert_eq!(lex("WHILE"), vec![TokenKind::While, TokenKind::Eof]);
        assert_eq!(lex("FUN"), vec![TokenKind::Fun, TokenKind::Eof]);
        assert_eq!(lex("var"), vec![TokenKind::Ident("var".into()), TokenKind::Eof]);
    }

    #[test]
    fn identifier_with_digits_and_underscore() {
        assert_eq!(
            lex("my_var2"),
            vec![TokenKind::Ident("my_var2".into()), TokenKind::Eof]
        );
    }

    #[test]
    fn two_char_operators() {
        assert_eq!(lex("=="), vec![TokenKind::EqEq, TokenKind::Eof]);
        assert_eq!(lex("!="), vec![TokenKind::BangEq, TokenKind::Eof]);
        assert_eq!(lex("<="), vec![TokenKind::LtEq, TokenKind::Eof]);
        assert_eq!(lex(">="), vec![TokenKind::GtEq, TokenKind::Eof]);
        assert_eq!(lex("->"), vec![TokenKind::Arrow, TokenKind::Eof]);
        assert_eq!(lex("<"), vec![TokenKind::Lt, TokenKind::Eof]);
        assert_eq!(lex("="), vec![TokenKind::Eq, TokenKind::Eof]);
        assert_eq!(lex("-"), vec![TokenKind::Minus, TokenKind::Eof]);
    }

    #[test]
    fn bare_bang_is_an_error() {
        let err = lex_err("!");
        assert_eq!(err.kind, ErrorKind::ExpectedCharacter);
        assert_eq!(err.details, "'=' (after '!')");
    }

    #[test]
    fn illegal_character() {
        let err = lex_err("@");
        assert_eq!(err.kind, ErrorKind::IllegalCharacter);
        assert_eq!(err.details, "'@'");
    }

    #[test]
    fn newline_and_semicolon_are_separators() {
        assert_eq!(
            lex("1\n2;3"),
            vec![
                TokenKind::Int(1),
                TokenKind::Newline,
                TokenKind::Int(2),
                TokenKind::Newline,
                TokenKind::Int(3),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn comment_skipped_separator_kept() {
        assert_eq!(
            lex("1 # a comment\n2"),
            vec![TokenKind::Int(1), TokenKind::Newline, TokenKind::Int(2), TokenKind::Eof]
        );
    }

    #[test]
    fn comment_at_end_of_input() {
        assert_eq!(lex("1 # trailing"), vec![TokenKind::Int(1), TokenKind::Eof]);
    }

    #[test]
    fn string_literal() {
        assert_eq!(lex(r#""hello""#), vec![TokenKind::Str("hello".into()), TokenKind::Eof]);
    }

    #[test]
    fn string_escapes() {
        assert_eq!(lex(r#""a\nb""#), vec![TokenKind::Str("a\nb".into()), TokenKind::Eof]);
        assert_eq!(lex(r#""a\tb""#), vec![TokenKind::Str("a\tb".into()), TokenKind::Eof]);
        assert_eq!(lex(r#""a\"b""#), vec![TokenKind::Str("a\"b".into()), TokenKind::Eof]);
        // unknown escapes pass the character through
        assert_eq!(lex(r#""a\qb""#), vec![TokenKind::Str("aqb".into()), TokenKind::Eof]);
        assert_eq!(lex(r#""a\\b""#), vec![TokenKind::Str("a\\b".into()), TokenKind::Eof]);
    }

    #[test]
    fn unterminated_string_is_an_error() {
        let err = lex_err(r#""oops"#);
        assert_eq!(err.kind, ErrorKind::ExpectedCharacter);
    }

    #[test]
    fn position_tracking() {
        let tokens = Lexer::new("<test>", "a\nb").tokenize().unwrap();
        assert_eq!((tokens[0].start.line, tokens[0].start.column), (0, 0));
        assert_eq!((tokens[2].start.line, tokens[2].start.column), (1, 0));
    }

    #[test]
    fn span_covers_token() {
        let tokens = Lexer::new("<test>", "abc + 1").tokenize().unwrap();
        assert_eq!(tokens[0].start.index, 0);
        assert_eq!(tokens[0].end.index, 3);
        assert_eq!(tokens[1].start.index, 4);
    }

    #[test]
    fn eof_always_appended() {
        assert_eq!(lex("  "), vec![TokenKind::Eof]);
    }

    #[test]
    fn token_kind_helpers() {
        assert!(TokenKind::Int(1).is_literal());
        assert!(TokenKind::Str("s".into()).is_literal());
        assert!(TokenKind::Var.is_keyword());
        assert!(TokenKind::Break.is_keyword());
        assert!(!TokenKind::Ident("x".into()).is_keyword());
        assert!(!TokenKind::Plus.is_keyword());
    }
}
