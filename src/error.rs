//! Error types shared across the crate.

use std::path::PathBuf;
use thiserror::Error;

//===========================================================================//

/// A top-level error from the disassembler.
#[derive(Debug, Error)]
pub enum Error {
    /// An input file could not be opened for reading.
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),
    /// The output listing could not be created or written.
    #[error("Cannot write output file: {}", .0.display())]
    OutputUnwritable(PathBuf),
    /// A command-line argument had an invalid value.
    #[error("Bad argument: {0}")]
    BadArgument(String),
    /// The annotation file (or one of its includes) was rejected.
    #[error(transparent)]
    Annotation(#[from] AnnotationError),
}

//===========================================================================//

/// A fatal error encountered while reading an annotation file.  Annotation
/// errors abort the whole parse; no partial results are kept.
#[derive(Debug, Error, Eq, PartialEq)]
#[error("Error in file {file}, at line {line}: {kind}")]
pub struct AnnotationError {
    /// The annotation file in which the error occurred.
    pub file: String,
    /// The line number within that file (starting at 1).
    pub line: u32,
    /// What went wrong.
    pub kind: AnnotationErrorKind,
}

/// The specific failure behind an [`AnnotationError`].
#[derive(Debug, Error, Eq, PartialEq)]
pub enum AnnotationErrorKind {
    /// The tokenizer hit a malformed token.
    #[error("Unexpected input: {0}")]
    Lex(String),
    /// The token stream did not match the grammar.
    #[error("{0}")]
    Parse(String),
    /// An integer literal's digits did not match its base.
    #[error("Invalid integer literal: {0}")]
    InvalidLiteral(String),
    /// An expression divided by zero.
    #[error("Division by zero.")]
    DivisionByZero,
    /// A label or segment target evaluated to a negative address.
    #[error("Address is negative.")]
    NegativeAddress,
    /// A file included itself, directly or through other includes.
    #[error("Recursive file inclusion: {0}")]
    RecursiveInclusion(String),
    /// An identifier was used before being defined.
    #[error("Cannot find symbol: {0}")]
    UnknownSymbol(String),
    /// A new segment intersected an existing one.
    #[error("Segments can not overlap: {0}")]
    OverlappingSegment(String),
}

//===========================================================================//

#[cfg(test)]
mod tests {
    use super::{AnnotationError, AnnotationErrorKind};

    #[test]
    fn annotation_error_display() {
        let error = AnnotationError {
            file: "rom.txt".to_string(),
            line: 12,
            kind: AnnotationErrorKind::DivisionByZero,
        };
        assert_eq!(
            error.to_string(),
            "Error in file rom.txt, at line 12: Division by zero."
        );
    }

    #[test]
    fn recursive_inclusion_display() {
        let error = AnnotationError {
            file: "b.txt".to_string(),
            line: 2,
            kind: AnnotationErrorKind::RecursiveInclusion(
                "a.txt".to_string(),
            ),
        };
        assert_eq!(
            error.to_string(),
            "Error in file b.txt, at line 2: \
             Recursive file inclusion: a.txt"
        );
    }
}

//===========================================================================//
