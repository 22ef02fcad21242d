use std::path::Path;

use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signer, read_keypair_file};

use crate::error::ClientError;

/// The identity a client acts as.
///
/// Passed explicitly to the program client and workflows; a session without
/// a keypair can only read.
pub struct Session {
    signer: Option<Keypair>,
}

impl Session {
    pub fn read_only() -> Self {
        Self { signer: None }
    }

    pub fn from_keypair(keypair: Keypair) -> Self {
        Self {
            signer: Some(keypair),
        }
    }

    /// Loads a Solana CLI keypair file (JSON array of 64 bytes).
    pub fn from_keypair_file(path: &Path) -> Result<Self, ClientError> {
        let keypair = read_keypair_file(path)
            .map_err(|e| ClientError::Keypair(format!("{}: {e}", path.display())))?;
        Ok(Self::from_keypair(keypair))
    }

    pub fn public_key(&self) -> Option<Pubkey> {
        self.signer.as_ref().map(|keypair| keypair.pubkey())
    }

    pub fn signer(&self) -> Result<&Keypair, ClientError> {
        self.signer.as_ref().ok_or(ClientError::NoSigner)
    }
}
