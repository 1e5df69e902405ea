use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("request error: {source}")]
    RequestError {
        #[from]
        source: ParseError,
    },

    #[error("response error: {source}")]
    ResponseError {
        #[from]
        source: SendError,
    },
}

/// Errors raised while reading an inbound request.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("invalid content-length header: {reason}")]
    InvalidContentLength { reason: String },

    /// A caller asked for something the request body can never honor, e.g. a read listener on a
    /// body that has already been fully buffered.
    #[error("unsupported operation: {reason}")]
    UnsupportedOperation { reason: String },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl ParseError {
    pub fn invalid_content_length<S: ToString>(str: S) -> Self {
        Self::InvalidContentLength { reason: str.to_string() }
    }

    pub fn unsupported<S: ToString>(str: S) -> Self {
        Self::UnsupportedOperation { reason: str.to_string() }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::UnsupportedOperation { .. })
    }
}

/// Errors raised while writing a response to the transport.
#[derive(Error, Debug)]
pub enum SendError {
    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl SendError {
    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_keeps_its_kind() {
        let err = ParseError::io(io::Error::from(io::ErrorKind::ConnectionReset));
        match err {
            ParseError::Io { source } => assert_eq!(source.kind(), io::ErrorKind::ConnectionReset),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn http_error_wraps_both_directions() {
        let request: HttpError = ParseError::unsupported("read listener").into();
        assert_eq!(request.to_string(), "request error: unsupported operation: read listener");

        let response: HttpError = SendError::io(io::Error::other("closed")).into();
        assert_eq!(response.to_string(), "response error: io error: closed");
    }
}
