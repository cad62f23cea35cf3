//! Facilities for parsing annotation files.

mod lex;
mod parser;

pub use lex::{Lexer, Token, TokenValue};
pub use parser::{SymbolTable, parse_bytes, parse_str};

//===========================================================================//
