use heck::ToKebabCase;
use std::{fmt, path::Path};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[remain::sorted]
pub enum ErrorKind {
    Emission,
    Parse,
    Synthesis,
}

impl ErrorKind {
    /// The process exit code surfaced to callers of the CLI. `1` is reserved
    /// for argument errors and never produced here.
    #[must_use]
    pub fn exit_code(self) -> i32 {
        match self {
            Self::Parse => 2,
            Self::Synthesis => 3,
            Self::Emission => 4,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", format!("{self:?}").to_kebab_case())
    }
}

#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    message: String,
}

impl Error {
    pub(crate) fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub(crate) fn parse(path: &Path, line: usize, column: usize) -> Self {
        Self::new(
            ErrorKind::Parse,
            format!("{}:{line}:{column}: syntax error", path.display()),
        )
    }

    pub(crate) fn synthesis(path: &Path, message: impl fmt::Display) -> Self {
        Self::new(
            ErrorKind::Synthesis,
            format!("{}: {message}", path.display()),
        )
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} error: {}", self.kind, self.message)
    }
}

impl std::error::Error for Error {}
