//! Recursive-descent parser for annotation files.

use crate::annot::{AnnotationMap, DataType};
use crate::error::{AnnotationError, AnnotationErrorKind};
use crate::literal::parse_int_literal;
use crate::parse::lex::{Lexer, Token, TokenValue};
use std::collections::HashMap;
use std::fs;

//===========================================================================//

/// The identifier bindings shared by a parse and all of its includes,
/// together with the stack of files currently being parsed.
///
/// Identifiers defined in an included file stay visible to the including
/// file after the include returns.  The include stack is pushed on entry
/// to each file and popped on exit, so diamond inclusions are fine while
/// true cycles are rejected.
#[derive(Default)]
pub struct SymbolTable {
    symbols: HashMap<String, i64>,
    include_stack: Vec<String>,
}

impl SymbolTable {
    /// Constructs an empty symbol table.
    pub fn new() -> SymbolTable {
        SymbolTable::default()
    }

    /// Binds `name` to `value`, replacing any earlier binding.
    pub fn define(&mut self, name: &str, value: i64) {
        self.symbols.insert(name.to_string(), value);
    }

    /// Looks up the value bound to `name`.
    pub fn lookup(&self, name: &str) -> Option<i64> {
        self.symbols.get(name).copied()
    }

    fn enter_file(&mut self, source: &str) {
        self.include_stack.push(source.to_string());
    }

    fn leave_file(&mut self) {
        self.include_stack.pop();
    }

    fn is_being_parsed(&self, source: &str) -> bool {
        self.include_stack.iter().any(|entry| entry == source)
    }
}

//===========================================================================//

/// Parses annotation text into `info`.  `source` names the input in error
/// messages; included files are read from disk relative to the process
/// working directory.
///
/// On failure the map must be treated as undefined: the parse aborts at
/// the first error and may have applied a prefix of the file.
pub fn parse_str(
    text: &str,
    source: &str,
    info: &mut AnnotationMap,
) -> Result<(), AnnotationError> {
    parse_bytes(text.as_bytes(), source, info)
}

/// Parses annotation bytes into `info` (the lexer is byte-level; see
/// [`parse_str`]).
pub fn parse_bytes(
    input: &[u8],
    source: &str,
    info: &mut AnnotationMap,
) -> Result<(), AnnotationError> {
    let mut symbols = SymbolTable::new();
    Parser::new(input, source, &mut symbols, info).file()
}

//===========================================================================//

struct Parser<'a> {
    source: String,
    lexer: Lexer<'a>,
    peek: Token,
    symbols: &'a mut SymbolTable,
    info: &'a mut AnnotationMap,
}

impl<'a> Parser<'a> {
    fn new(
        input: &'a [u8],
        source: &str,
        symbols: &'a mut SymbolTable,
        info: &'a mut AnnotationMap,
    ) -> Parser<'a> {
        let mut lexer = Lexer::new(input);
        let peek = lexer.next_token();
        Parser { source: source.to_string(), lexer, peek, symbols, info }
    }

    fn error(&self, kind: AnnotationErrorKind) -> AnnotationError {
        AnnotationError {
            file: self.source.clone(),
            line: self.peek.line,
            kind,
        }
    }

    fn error_at(
        &self,
        line: u32,
        kind: AnnotationErrorKind,
    ) -> AnnotationError {
        AnnotationError { file: self.source.clone(), line, kind }
    }

    fn parse_error(&self, message: impl Into<String>) -> AnnotationError {
        self.error(AnnotationErrorKind::Parse(message.into()))
    }

    /// Takes the lookahead token and advances.  A malformed token aborts
    /// the parse here, so the grammar methods never see one.
    fn consume(&mut self) -> Result<Token, AnnotationError> {
        if let TokenValue::Error(text) = &self.peek.value {
            return Err(self.error(AnnotationErrorKind::Lex(text.clone())));
        }
        let token =
            std::mem::replace(&mut self.peek, self.lexer.next_token());
        Ok(token)
    }

    fn match_newline(&mut self) -> Result<(), AnnotationError> {
        match self.peek.value {
            TokenValue::Newline => {
                self.consume()?;
                Ok(())
            }
            TokenValue::Eoi => Ok(()),
            _ => Err(self.parse_error("Line break expected.")),
        }
    }

    fn skip_blank_lines(&mut self) -> Result<(), AnnotationError> {
        while self.peek.value == TokenValue::Newline {
            self.consume()?;
        }
        Ok(())
    }

    /// True if the lookahead can begin an address expression entry.
    fn at_entry_start(&self) -> bool {
        matches!(
            self.peek.value,
            TokenValue::Literal(_)
                | TokenValue::LeftParen
                | TokenValue::Identifier(_)
        )
    }

    //-----------------------------------------------------------------------
    // Grammar

    fn file(&mut self) -> Result<(), AnnotationError> {
        self.symbols.enter_file(&self.source);
        self.skip_blank_lines()?;
        while self.peek.value != TokenValue::Eoi {
            self.section()?;
        }
        self.symbols.leave_file();
        Ok(())
    }

    fn section(&mut self) -> Result<(), AnnotationError> {
        let token = self.consume()?;
        match token.value {
            TokenValue::Include => {
                self.skip_blank_lines()?;
                self.include_section()
            }
            TokenValue::Segments => {
                self.skip_blank_lines()?;
                self.segments_section()
            }
            TokenValue::Labels => {
                self.skip_blank_lines()?;
                self.labels_section()
            }
            TokenValue::Comments => {
                self.skip_blank_lines()?;
                self.comments_section()
            }
            other => Err(self.error_at(
                token.line,
                AnnotationErrorKind::Parse(format!(
                    "Section keyword expected, found {}.",
                    other.name()
                )),
            )),
        }
    }

    fn include_section(&mut self) -> Result<(), AnnotationError> {
        while matches!(self.peek.value, TokenValue::Str(_)) {
            let line = self.peek.line;
            let filename = self.expect_string()?;
            if self.symbols.is_being_parsed(&filename) {
                return Err(self.error_at(
                    line,
                    AnnotationErrorKind::RecursiveInclusion(filename),
                ));
            }
            let input = fs::read(&filename).map_err(|_| {
                self.error_at(
                    line,
                    AnnotationErrorKind::Parse(format!(
                        "Cannot open file: {}",
                        filename
                    )),
                )
            })?;
            Parser::new(&input, &filename, self.symbols, self.info)
                .file()?;
            self.match_newline()?;
            self.skip_blank_lines()?;
        }
        Ok(())
    }

    fn segments_section(&mut self) -> Result<(), AnnotationError> {
        while self.at_entry_start() {
            let line = self.peek.line;
            let (start, end) = self.label_target()?;
            if start == end {
                return Err(self.error_at(
                    line,
                    AnnotationErrorKind::Parse(
                        "Segments can not be defined by a single address."
                            .to_string(),
                    ),
                ));
            }
            let data_type = match self.peek.value {
                TokenValue::Identifier(_) => DataType::Code,
                _ => self.read_data_type()?,
            };
            let name = self.expect_identifier()?;
            self.match_newline()?;
            self.skip_blank_lines()?;
            self.info
                .add_segment(&name, data_type, start, end)
                .map_err(|kind| self.error_at(line, kind))?;
            self.symbols.define(&name, i64::from(start));
        }
        Ok(())
    }

    fn labels_section(&mut self) -> Result<(), AnnotationError> {
        while self.at_entry_start() {
            let (start, end) = self.label_target()?;
            let data_type = match self.peek.value {
                TokenValue::Identifier(_) => DataType::Undefined,
                _ => self.read_data_type()?,
            };
            let name = self.expect_identifier()?;
            self.match_newline()?;
            self.skip_blank_lines()?;
            if start != end {
                self.info
                    .add_range_label(&name, start, end, data_type, false);
            } else {
                self.info.add_label(&name, start, data_type, true);
            }
            self.symbols.define(&name, i64::from(start));
        }
        Ok(())
    }

    fn comments_section(&mut self) -> Result<(), AnnotationError> {
        while self.at_entry_start() {
            let line = self.peek.line;
            let address = self.address_expr()?;
            if address < 0 {
                return Err(self
                    .error_at(line, AnnotationErrorKind::NegativeAddress));
            }
            let text = self.expect_string()?;
            self.match_newline()?;
            self.skip_blank_lines()?;
            self.info.add_comment(&text, address as u32);
        }
        Ok(())
    }

    /// Parses a single address, an inclusive `start..end` range, or a
    /// `start(length)` base-plus-length target.  Swapped bounds are
    /// normalized; negative bounds are rejected.
    fn label_target(&mut self) -> Result<(u32, u32), AnnotationError> {
        let line = self.peek.line;
        let mut start = self.address_expr()?;
        let mut end = start;
        match self.peek.value {
            TokenValue::Range => {
                self.consume()?;
                end = self.address_expr()?;
            }
            TokenValue::LeftParen => {
                self.consume()?;
                let length = self.address_expr()?;
                if length < 0 {
                    return Err(self.error_at(
                        line,
                        AnnotationErrorKind::Parse(
                            "Range length is negative.".to_string(),
                        ),
                    ));
                }
                end = start.wrapping_add(length).wrapping_sub(1);
                self.expect_right_paren()?;
            }
            _ => {}
        }
        if end < start {
            std::mem::swap(&mut start, &mut end);
        }
        if start < 0 || end < 0 {
            return Err(
                self.error_at(line, AnnotationErrorKind::NegativeAddress)
            );
        }
        Ok((start as u32, end as u32))
    }

    fn read_data_type(&mut self) -> Result<DataType, AnnotationError> {
        let token = self.consume()?;
        match token.value {
            TokenValue::Type(data_type) => Ok(data_type),
            other => Err(self.error_at(
                token.line,
                AnnotationErrorKind::Parse(format!(
                    "Data type expected, found {}.",
                    other.name()
                )),
            )),
        }
    }

    //-----------------------------------------------------------------------
    // Expressions

    fn address_expr(&mut self) -> Result<i64, AnnotationError> {
        let mut sum = self.address_product()?;
        loop {
            match self.peek.value {
                TokenValue::Add => {
                    self.consume()?;
                    sum = sum.wrapping_add(self.address_product()?);
                }
                TokenValue::Subtract => {
                    self.consume()?;
                    sum = sum.wrapping_sub(self.address_product()?);
                }
                _ => return Ok(sum),
            }
        }
    }

    fn address_product(&mut self) -> Result<i64, AnnotationError> {
        let mut product = self.single_address()?;
        loop {
            match self.peek.value {
                TokenValue::Multiply => {
                    self.consume()?;
                    product = product.wrapping_mul(self.single_address()?);
                }
                TokenValue::Divide => {
                    let line = self.peek.line;
                    self.consume()?;
                    let divisor = self.single_address()?;
                    if divisor == 0 {
                        return Err(self.error_at(
                            line,
                            AnnotationErrorKind::DivisionByZero,
                        ));
                    }
                    product = product.wrapping_div(divisor);
                }
                TokenValue::Modulo => {
                    let line = self.peek.line;
                    self.consume()?;
                    let divisor = self.single_address()?;
                    if divisor == 0 {
                        return Err(self.error_at(
                            line,
                            AnnotationErrorKind::DivisionByZero,
                        ));
                    }
                    product = product.wrapping_rem(divisor);
                }
                _ => return Ok(product),
            }
        }
    }

    fn single_address(&mut self) -> Result<i64, AnnotationError> {
        let token = self.consume()?;
        match token.value {
            TokenValue::Subtract => Ok(self.address_expr()?.wrapping_neg()),
            TokenValue::LeftParen => {
                let value = self.address_expr()?;
                self.expect_right_paren()?;
                Ok(value)
            }
            TokenValue::Literal(text) => parse_int_literal(&text)
                .map_err(|kind| self.error_at(token.line, kind)),
            TokenValue::Identifier(name) => {
                self.symbols.lookup(&name).ok_or_else(|| {
                    self.error_at(
                        token.line,
                        AnnotationErrorKind::UnknownSymbol(name),
                    )
                })
            }
            other => Err(self.error_at(
                token.line,
                AnnotationErrorKind::Parse(format!(
                    "Address literal or identifier expected, found {}.",
                    other.name()
                )),
            )),
        }
    }

    //-----------------------------------------------------------------------
    // Token matchers

    fn expect_string(&mut self) -> Result<String, AnnotationError> {
        let token = self.consume()?;
        match token.value {
            TokenValue::Str(text) => Ok(text),
            other => Err(self.error_at(
                token.line,
                AnnotationErrorKind::Parse(format!(
                    "String expected, found {}.",
                    other.name()
                )),
            )),
        }
    }

    fn expect_identifier(&mut self) -> Result<String, AnnotationError> {
        let token = self.consume()?;
        match token.value {
            TokenValue::Identifier(name) => Ok(name),
            other => Err(self.error_at(
                token.line,
                AnnotationErrorKind::Parse(format!(
                    "Identifier expected, found {}.",
                    other.name()
                )),
            )),
        }
    }

    fn expect_right_paren(&mut self) -> Result<(), AnnotationError> {
        let token = self.consume()?;
        match token.value {
            TokenValue::RightParen => Ok(()),
            _ => Err(self.error_at(
                token.line,
                AnnotationErrorKind::Parse(
                    "Unbalanced parentheses.".to_string(),
                ),
            )),
        }
    }
}

//===========================================================================//


//===========================================================================//
