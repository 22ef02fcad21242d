use thiserror::Error;

use crate::validation::ValidationError;

/// Errors produced while encoding or decoding program data.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Account data is shorter than the 8-byte discriminator.
    #[error("account data too short ({0} bytes)")]
    AccountTooShort(usize),
    /// The discriminator does not belong to the expected account type.
    #[error("account is not a {0}")]
    DiscriminatorMismatch(&'static str),
    /// Borsh decoding of the account body failed.
    #[error("failed to decode {account}: {reason}")]
    Decode { account: &'static str, reason: String },
    /// Borsh encoding of instruction arguments failed.
    #[error("failed to encode instruction arguments: {0}")]
    Encode(String),
    /// A guide id did not have the `<authority>-<index>` shape.
    #[error("invalid guide id '{0}': expected <authority>-<index>")]
    InvalidGuideId(String),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}
