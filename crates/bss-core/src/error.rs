use std::fmt;
use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

/// Position inside a source file, 1-based.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Span {
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.line == 0 && self.column == 0 {
            write!(f, "<unknown>")
        } else {
            write!(f, "{}:{}", self.line, self.column)
        }
    }
}

/// Failures that halt a compile.
///
/// Everything recoverable (unknown `@extend` targets, unknown functions and
/// so on) is reported as a [`crate::Diagnostic`] instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A stylesheet could not be read.
    #[error("Cannot read file {name}: {source}")]
    Resolution {
        name: String,
        #[source]
        source: std::io::Error,
    },

    /// A stylesheet could not be parsed.
    #[error("{sheet}:{span}: {message}")]
    Parse {
        sheet: String,
        span: Span,
        message: String,
    },

    /// Output or configuration file I/O.
    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid configuration file.
    #[error("Invalid configuration in {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl Error {
    pub fn resolution(name: impl Into<String>, source: std::io::Error) -> Self {
        Self::Resolution {
            name: name.into(),
            source,
        }
    }

    pub fn parse(sheet: impl Into<String>, span: Span, message: impl Into<String>) -> Self {
        Self::Parse {
            sheet: sheet.into(),
            span,
            message: message.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_span_renders_placeholder() {
        assert_eq!(Span::default().to_string(), "<unknown>");
        assert_eq!(Span { line: 3, column: 7 }.to_string(), "3:7");
    }

    #[test]
    fn parse_error_names_sheet_and_position() {
        let err = Error::parse("main.bss", Span { line: 2, column: 5 }, "Expected '}'");
        assert_eq!(err.to_string(), "main.bss:2:5: Expected '}'");
    }
}
