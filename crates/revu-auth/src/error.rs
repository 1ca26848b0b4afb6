use jsonwebtoken::errors::Error as JwtError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("JWT error: {0}")]
    JwtError(#[from] JwtError),

    #[error("Invalid HMAC key length: {0}")]
    InvalidHmacLength(#[from] hmac::digest::InvalidLength),

    #[error("Time value error: {0}")]
    TimeValueError(#[from] std::time::SystemTimeError),
}
