//! Tokenizer for the annotation-file language.

use crate::annot::DataType;

//===========================================================================//

/// The contents of a single lexical token.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TokenValue {
    /// End of input.
    Eoi,
    /// A line break.
    Newline,
    /// The `..` range operator.
    Range,
    /// A `(` symbol.
    LeftParen,
    /// A `)` symbol.
    RightParen,
    /// A `[` symbol.
    LeftBracket,
    /// A `]` symbol.
    RightBracket,
    /// A `+` symbol.
    Add,
    /// A `-` symbol.
    Subtract,
    /// A `*` symbol.
    Multiply,
    /// A `/` symbol.
    Divide,
    /// A `%` symbol followed by whitespace (as opposed to a binary
    /// literal prefix).
    Modulo,
    /// An identifier.
    Identifier(String),
    /// An integer literal, kept as text; the parser converts it.
    Literal(String),
    /// A double-quoted string, with escapes resolved.
    Str(String),
    /// The `include:` section keyword.
    Include,
    /// The `segments:` section keyword.
    Segments,
    /// The `labels:` section keyword.
    Labels,
    /// The `comments:` section keyword.
    Comments,
    /// A data-type keyword (`code`, `bytes`, `words`, `dwords`,
    /// `dwords_be`, `dwords_le`, `text`, `ret`).
    Type(DataType),
    /// Malformed input that matches no token.
    Error(String),
}

impl TokenValue {
    /// Returns the human-readable name for this kind of token.
    pub fn name(&self) -> &'static str {
        match self {
            TokenValue::Eoi => "end of input",
            TokenValue::Newline => "line break",
            TokenValue::Range => "'..'",
            TokenValue::LeftParen => "'('",
            TokenValue::RightParen => "')'",
            TokenValue::LeftBracket => "'['",
            TokenValue::RightBracket => "']'",
            TokenValue::Add => "'+'",
            TokenValue::Subtract => "'-'",
            TokenValue::Multiply => "'*'",
            TokenValue::Divide => "'/'",
            TokenValue::Modulo => "'%'",
            TokenValue::Identifier(_) => "identifier",
            TokenValue::Literal(_) => "literal",
            TokenValue::Str(_) => "string",
            TokenValue::Include => "'include:'",
            TokenValue::Segments => "'segments:'",
            TokenValue::Labels => "'labels:'",
            TokenValue::Comments => "'comments:'",
            TokenValue::Type(_) => "data type",
            TokenValue::Error(_) => "malformed input",
        }
    }
}

/// A single lexical token, tagged with the line it started on.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Token {
    /// The 1-based line number the token started on.
    pub line: u32,
    /// The contents of the token.
    pub value: TokenValue,
}

//===========================================================================//

fn is_whitespace(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t' | b'\r')
}

fn is_identifier_start(byte: u8) -> bool {
    byte.is_ascii_alphabetic() || byte == b'_'
}

fn is_identifier_body(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_'
}

fn is_literal_start(byte: u8) -> bool {
    matches!(byte, b'$' | b'&' | b'@') || byte.is_ascii_digit()
}

/// Bytes that may continue an integer literal: digits in any base plus the
/// base-suffix letters.  Validation against the selected base happens in
/// the parser, not here.
fn is_literal_body(byte: u8) -> bool {
    byte.is_ascii_hexdigit()
        || matches!(
            byte,
            b'h' | b'H' | b'o' | b'O' | b'q' | b'Q' | b'x' | b'X'
        )
}

fn keyword_value(word: &str) -> Option<TokenValue> {
    match word {
        "code" => Some(TokenValue::Type(DataType::Code)),
        "bytes" => Some(TokenValue::Type(DataType::Bytes)),
        // A machine word on the 8085 is 8 bits; 16-bit values are dwords.
        "words" => Some(TokenValue::Type(DataType::Bytes)),
        "dwords" => Some(TokenValue::Type(DataType::WordsLE)),
        "dwords_be" => Some(TokenValue::Type(DataType::WordsBE)),
        "dwords_le" => Some(TokenValue::Type(DataType::WordsLE)),
        "text" => Some(TokenValue::Type(DataType::Text)),
        "ret" => Some(TokenValue::Type(DataType::RetTable)),
        _ => None,
    }
}

fn section_value(word: &str) -> Option<TokenValue> {
    match word {
        "include" => Some(TokenValue::Include),
        "segments" => Some(TokenValue::Segments),
        "labels" => Some(TokenValue::Labels),
        "comments" => Some(TokenValue::Comments),
        _ => None,
    }
}

//===========================================================================//

/// A backtrack-free tokenizer over the raw bytes of an annotation file.
/// Only string contents and comments may contain non-ASCII bytes.
pub struct Lexer<'a> {
    input: &'a [u8],
    pos: usize,
    line: u32,
}

impl<'a> Lexer<'a> {
    /// Constructs a lexer over the given input bytes.
    pub fn new(input: &'a [u8]) -> Lexer<'a> {
        Lexer { input, pos: 0, line: 1 }
    }

    fn peek_byte(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let byte = self.peek_byte()?;
        self.pos += 1;
        Some(byte)
    }

    /// Yields the next token in the stream.  After the end of input this
    /// keeps returning `Eoi` tokens.
    pub fn next_token(&mut self) -> Token {
        loop {
            let line = self.line;
            let byte = match self.peek_byte() {
                Some(byte) => byte,
                None => return Token { line, value: TokenValue::Eoi },
            };
            if is_whitespace(byte) {
                self.pos += 1;
                continue;
            }
            if byte == b'#' {
                while let Some(byte) = self.peek_byte() {
                    if byte == b'\n' {
                        break;
                    }
                    self.pos += 1;
                }
                continue;
            }
            let value = match byte {
                b'\n' => {
                    self.pos += 1;
                    self.line += 1;
                    TokenValue::Newline
                }
                b'+' => self.single(TokenValue::Add),
                b'-' => self.single(TokenValue::Subtract),
                b'*' => self.single(TokenValue::Multiply),
                b'/' => self.single(TokenValue::Divide),
                b'(' => self.single(TokenValue::LeftParen),
                b')' => self.single(TokenValue::RightParen),
                b'[' => self.single(TokenValue::LeftBracket),
                b']' => self.single(TokenValue::RightBracket),
                b'.' => self.range(),
                b'%' => self.modulo_or_literal(),
                b'"' => self.string(),
                _ if is_literal_start(byte) => self.literal(),
                _ if is_identifier_start(byte) => self.word(),
                _ => {
                    self.pos += 1;
                    TokenValue::Error((byte as char).to_string())
                }
            };
            return Token { line, value };
        }
    }

    fn single(&mut self, value: TokenValue) -> TokenValue {
        self.pos += 1;
        value
    }

    fn range(&mut self) -> TokenValue {
        self.pos += 1;
        if self.peek_byte() == Some(b'.') {
            self.pos += 1;
            TokenValue::Range
        } else {
            TokenValue::Error(".".to_string())
        }
    }

    /// A `%` is the modulo operator when followed by whitespace (or a line
    /// or input end); otherwise it begins a binary literal.
    fn modulo_or_literal(&mut self) -> TokenValue {
        match self.input.get(self.pos + 1).copied() {
            None | Some(b'\n') => {
                self.pos += 1;
                TokenValue::Modulo
            }
            Some(byte) if is_whitespace(byte) => {
                self.pos += 1;
                TokenValue::Modulo
            }
            Some(_) => self.literal(),
        }
    }

    fn literal(&mut self) -> TokenValue {
        let start = self.pos;
        self.pos += 1; // prefix character or first digit
        while let Some(byte) = self.peek_byte() {
            if is_literal_body(byte) {
                self.pos += 1;
            } else {
                break;
            }
        }
        let text = String::from_utf8_lossy(&self.input[start..self.pos]);
        TokenValue::Literal(text.into_owned())
    }

    fn word(&mut self) -> TokenValue {
        let start = self.pos;
        self.pos += 1;
        while let Some(byte) = self.peek_byte() {
            if is_identifier_body(byte) {
                self.pos += 1;
            } else {
                break;
            }
        }
        let word = String::from_utf8_lossy(&self.input[start..self.pos])
            .into_owned();
        if self.peek_byte() == Some(b':')
            && let Some(value) = section_value(&word)
        {
            self.pos += 1;
            return value;
        }
        if let Some(value) = keyword_value(&word) {
            return value;
        }
        TokenValue::Identifier(word)
    }

    fn string(&mut self) -> TokenValue {
        self.pos += 1; // opening quote
        let mut text = Vec::new();
        loop {
            match self.bump() {
                None => {
                    return TokenValue::Error(
                        "unterminated string".to_string(),
                    );
                }
                Some(b'"') => break,
                Some(b'\\') => match self.bump() {
                    // The escape takes the next byte literally.
                    Some(byte) => {
                        if byte == b'\n' {
                            self.line += 1;
                        }
                        text.push(byte);
                    }
                    None => {
                        return TokenValue::Error(
                            "unterminated string".to_string(),
                        );
                    }
                },
                Some(byte) => {
                    if byte == b'\n' {
                        self.line += 1;
                    }
                    text.push(byte);
                }
            }
        }
        TokenValue::Str(String::from_utf8_lossy(&text).into_owned())
    }
}

//===========================================================================//


//===========================================================================//
