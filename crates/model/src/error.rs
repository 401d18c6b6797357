/// The kind of error that occurred.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The content is moderated.
    Moderated,
    /// The model provider is rate limited.
    RateLimitExceeded,
    /// The request did not finish in time.
    Timeout,
    /// The service could not be reached, or failed on its side.
    Unavailable,
    /// The service rejected the request itself.
    Rejected,
    /// The service answered with a body that doesn't follow the contract.
    InvalidResponse,
    /// Any other errors.
    Other,
}

impl ErrorKind {
    /// Returns whether sending the same request again may succeed.
    #[inline]
    pub fn is_transient(self) -> bool {
        matches!(
            self,
            ErrorKind::RateLimitExceeded
                | ErrorKind::Timeout
                | ErrorKind::Unavailable
                | ErrorKind::Other
        )
    }
}
