use super::Format;
use crate::perceive::SanitizeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O operation failed: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("failed to parse {format} data: {details} (at {position})")]
    Parse {
        format: Format,
        position: Position,
        details: String,
    },

    #[error("{format} structure is chemically invalid: {source}")]
    Sanitize {
        format: Format,
        #[source]
        source: SanitizeError,
    },
}

/// Where in the input a parse error was detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    /// 1-based line of a line-oriented format.
    Line(usize),
    /// 0-based character offset into a single-line notation.
    Column(usize),
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Position::Line(line) => write!(f, "line ~{line}"),
            Position::Column(col) => write!(f, "position {col}"),
        }
    }
}

impl Error {
    pub fn parse(format: Format, line: usize, details: impl Into<String>) -> Self {
        Self::Parse {
            format,
            position: Position::Line(line),
            details: details.into(),
        }
    }

    pub fn parse_at(format: Format, column: usize, details: impl Into<String>) -> Self {
        Self::Parse {
            format,
            position: Position::Column(column),
            details: details.into(),
        }
    }

    pub fn sanitize(format: Format, source: SanitizeError) -> Self {
        Self::Sanitize { format, source }
    }
}
