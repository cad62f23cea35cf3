//! Integer-literal parsing and hex formatting.
//!
//! Annotation files accept integer literals in several assembler dialects;
//! the base is selected by the first matching rule:
//!
//! * Prefixes: `$nnn` hex, `&nnn` decimal, `@nnn` octal, `%nnn` binary.
//! * `0xnnn`/`0Xnnn` hex, `0bnnn`/`0Bnnn` binary.
//! * Suffixes: `h`/`H` hex, `d`/`D` decimal, `o`/`O`/`q`/`Q` octal,
//!   `b`/`B` binary.
//! * A remaining leading `0` selects octal (but a bare `0` is decimal).
//!
//! The suffix rules are checked before the leading-zero rule so that
//! zero-padded hex literals such as `00abh` parse as hex.

use crate::error::AnnotationErrorKind;

//===========================================================================//

/// Parses an integer literal, selecting the base from its prefix or suffix.
/// Fails with [`AnnotationErrorKind::InvalidLiteral`] if the digits do not
/// match the selected base.
pub fn parse_int_literal(text: &str) -> Result<i64, AnnotationErrorKind> {
    let invalid = || AnnotationErrorKind::InvalidLiteral(text.to_string());
    if text.is_empty() {
        return Err(invalid());
    }
    let (radix, digits) = match text.as_bytes()[0] {
        b'$' => (16, &text[1..]),
        b'&' => (10, &text[1..]),
        b'@' => (8, &text[1..]),
        b'%' => (2, &text[1..]),
        b'0' if text.len() >= 2
            && matches!(text.as_bytes()[1], b'x' | b'X') =>
        {
            (16, &text[2..])
        }
        b'0' if text.len() >= 2
            && matches!(text.as_bytes()[1], b'b' | b'B') =>
        {
            (2, &text[2..])
        }
        _ => match text.as_bytes()[text.len() - 1] {
            b'h' | b'H' => (16, &text[..text.len() - 1]),
            b'd' | b'D' => (10, &text[..text.len() - 1]),
            b'o' | b'O' | b'q' | b'Q' => (8, &text[..text.len() - 1]),
            b'b' | b'B' => (2, &text[..text.len() - 1]),
            _ if text.len() >= 2 && text.as_bytes()[0] == b'0' => {
                (8, &text[1..])
            }
            _ => (10, text),
        },
    };
    i64::from_str_radix(digits, radix).map_err(|_| invalid())
}

/// Formats a value as four lowercase hex digits (the low 16 bits).
pub fn hex16(value: u32) -> String {
    format!("{:04x}", value & 0xffff)
}

/// Formats a value as two lowercase hex digits (the low 8 bits).
pub fn hex8(value: u32) -> String {
    format!("{:02x}", value & 0xff)
}

//===========================================================================//


//===========================================================================//
