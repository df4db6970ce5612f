use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("No credentials configured for realm \"{realm}\".")]
    MissingCredentials { realm: String },
    #[error("Unsupported authentication scheme '{scheme}'.")]
    Unsupported { scheme: String },
    #[error("Digest challenge is missing '{param}'.")]
    MissingParam { param: &'static str },
    #[error("Server answered {status} without an authentication challenge.")]
    MissingChallenge { status: u16 },
    #[error("Authentication for realm \"{realm}\" failed after {bids} attempts.")]
    BidsExhausted { realm: String, bids: u32 },
    #[error("Cannot answer the challenge for realm \"{realm}\": {source}")]
    Unanswerable {
        realm: String,
        #[source]
        source: Box<AuthError>,
    },
}
