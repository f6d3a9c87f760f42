use std::fmt;

/// Build an `Error` variant carrying a formatted message.
///
/// ```ignore
/// return Err(err!(Storage, "page {} not resident", page_num));
/// ```
macro_rules! err {
    ($variant:ident, $($arg:tt)*) => {
        $crate::errors::Error::$variant(format!($($arg)*))
    };
}

#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    /// Engine-level failure: corrupt file, out-of-bounds page, flush of an
    /// unpopulated slot, internal-node overflow. The REPL treats these as
    /// fatal and terminates with a diagnostic.
    Storage(String),
    Syntax(String),
    NegativeId,
    StringTooLong,
    DuplicateKey,
    Unrecognized(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "IO error. {}", e),
            Error::Storage(msg) => write!(f, "Storage error. {}", msg),
            Error::Syntax(_) => write!(f, "Syntax error. Could not parse statement."),
            Error::NegativeId => write!(f, "ID must be positive"),
            Error::StringTooLong => write!(f, "string is too long"),
            Error::DuplicateKey => write!(f, "Error: duplicate key"),
            Error::Unrecognized(input) => {
                write!(f, "Unrecognized keyword at start of '{}'.", input)
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

impl Error {
    /// Fatal errors abort the session after a diagnostic; the rest are
    /// reported to the user and the prompt loop continues.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Io(_) | Error::Storage(_))
    }
}
