use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] spoon_core::Error),

    #[error("I/O error: {0}")]
    Io(io::Error),

    #[error("CSV error: {0}")]
    Csv(csv::Error),

    /// The consumer of the output went away (broken pipe).
    #[error("downstream closed")]
    DownstreamClosed,
}

impl Error {
    pub fn is_downstream_closed(&self) -> bool {
        matches!(self, Error::DownstreamClosed)
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::BrokenPipe {
            Error::DownstreamClosed
        } else {
            Error::Io(e)
        }
    }
}

impl From<csv::Error> for Error {
    fn from(e: csv::Error) -> Self {
        let broken_pipe = matches!(
            e.kind(),
            csv::ErrorKind::Io(inner) if inner.kind() == io::ErrorKind::BrokenPipe
        );
        if broken_pipe {
            Error::DownstreamClosed
        } else {
            Error::Csv(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broken_pipe_is_downstream_closed() {
        let e: Error = io::Error::new(io::ErrorKind::BrokenPipe, "gone").into();
        assert!(e.is_downstream_closed());
        let e: Error = io::Error::new(io::ErrorKind::NotFound, "nope").into();
        assert!(matches!(e, Error::Io(_)));
    }
}
