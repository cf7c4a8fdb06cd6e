use core::fmt;

/// The single error kind this crate reports.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Error {
    /// A minimum-returning operation was invoked on an empty structure.
    Underflow,
}

impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Underflow => write!(fmt, "underflow: the queue is empty"),
        }
    }
}

impl std::error::Error for Error {}
