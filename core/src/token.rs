use std::fmt;
use std::sync::OnceLock;

use fnv::FnvHashMap;

use crate::types::Literal;

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum TokenType {
    // Single character tokens
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    Comma,
    Dot,
    Minus,
    Plus,
    Semicolon,
    Slash,
    Star,

    // One or two character tokens
    Bang,
    BangEqual,
    Equal,
    EqualEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,

    // Literals
    Identifier,
    String,
    Number,

    // Keywords
    And,
    Class,
    Else,
    False,
    Fun,
    For,
    If,
    Nil,
    Or,
    Print,
    Return,
    Super,
    This,
    True,
    Var,
    While,

    // End of file marker
    Eof,
}

impl TokenType {
    pub fn is_keyword(&self) -> bool {
        KEYWORDS.iter().any(|(_, token_type)| token_type == self)
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::LeftParen => "LEFT_PAREN",
            Self::RightParen => "RIGHT_PAREN",
            Self::LeftBrace => "LEFT_BRACE",
            Self::RightBrace => "RIGHT_BRACE",
            Self::Comma => "COMMA",
            Self::Dot => "DOT",
            Self::Minus => "MINUS",
            Self::Plus => "PLUS",
            Self::Semicolon => "SEMICOLON",
            Self::Slash => "SLASH",
            Self::Star => "STAR",
            Self::Bang => "BANG",
            Self::BangEqual => "BANG_EQUAL",
            Self::Equal => "EQUAL",
            Self::EqualEqual => "EQUAL_EQUAL",
            Self::Greater => "GREATER",
            Self::GreaterEqual => "GREATER_EQUAL",
            Self::Less => "LESS",
            Self::LessEqual => "LESS_EQUAL",
            Self::Identifier => "IDENTIFIER",
            Self::String => "STRING",
            Self::Number => "NUMBER",
            Self::And => "AND",
            Self::Class => "CLASS",
            Self::Else => "ELSE",
            Self::False => "FALSE",
            Self::Fun => "FUN",
            Self::For => "FOR",
            Self::If => "IF",
            Self::Nil => "NIL",
            Self::Or => "OR",
            Self::Print => "PRINT",
            Self::Return => "RETURN",
            Self::Super => "SUPER",
            Self::This => "THIS",
            Self::True => "TRUE",
            Self::Var => "VAR",
            Self::While => "WHILE",
            Self::Eof => "EOF",
        };
        f.write_str(name)
    }
}

/// Reserved words of the language and the token type each one lexes to.
pub const KEYWORDS: [(&str, TokenType); 16] = [
    ("and", TokenType::And),
    ("class", TokenType::Class),
    ("else", TokenType::Else),
    ("false", TokenType::False),
    ("for", TokenType::For),
    ("fun", TokenType::Fun),
    ("if", TokenType::If),
    ("nil", TokenType::Nil),
    ("or", TokenType::Or),
    ("print", TokenType::Print),
    ("return", TokenType::Return),
    ("super", TokenType::Super),
    ("this", TokenType::This),
    ("true", TokenType::True),
    ("var", TokenType::Var),
    ("while", TokenType::While),
];

/// Looks up an identifier-shaped lexeme in the keyword table. Matching is exact and
/// case-sensitive.
pub fn keyword(text: &str) -> Option<TokenType> {
    static TABLE: OnceLock<FnvHashMap<&'static str, TokenType>> = OnceLock::new();
    TABLE
        .get_or_init(|| KEYWORDS.into_iter().collect())
        .get(text)
        .copied()
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub token_type: TokenType,
    pub lexeme: String,
    pub literal: Option<Literal>,
    pub line: u32,
}

impl Token {
    pub fn new(token_type: TokenType, lexeme: String, literal: Option<Literal>, line: u32) -> Self {
        Token {
            token_type,
            lexeme,
            literal,
            line,
        }
    }

    pub fn eof(line: u32) -> Self {
        Token::new(TokenType::Eof, String::new(), None, line)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.literal {
            Some(literal) => write!(f, "{} {} {}", self.token_type, self.lexeme, literal),
            None => write!(f, "{} {} null", self.token_type, self.lexeme),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_lookup() {
        for (text, token_type) in KEYWORDS {
            assert_eq!(keyword(text), Some(token_type));
            assert!(token_type.is_keyword());
        }
        assert_eq!(keyword("While"), None);
        assert_eq!(keyword("whiles"), None);
        assert_eq!(keyword("whi"), None);
        assert_eq!(keyword(""), None);
        assert!(!TokenType::Identifier.is_keyword());
    }

    #[test]
    fn test_display() {
        let token = Token::new(
            TokenType::Number,
            "10".to_string(),
            Some(Literal::Number(10.0)),
            1,
        );
        assert_eq!(token.to_string(), "NUMBER 10 10.0");

        let token = Token::new(
            TokenType::String,
            "\"hi\"".to_string(),
            Some(Literal::String("hi".to_string())),
            1,
        );
        assert_eq!(token.to_string(), "STRING \"hi\" hi");

        let token = Token::new(TokenType::BangEqual, "!=".to_string(), None, 3);
        assert_eq!(token.to_string(), "BANG_EQUAL != null");

        assert_eq!(Token::eof(7).to_string(), "EOF  null");
    }
}
