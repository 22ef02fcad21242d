use chaperone_core::{CoreError, GuideId, ValidationError, VerificationStatus};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use thiserror::Error;

use crate::ledger::MintRecord;
use crate::rpc::RpcError;
use crate::upload::UploadError;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("no wallet connected: pass --keypair to sign transactions")]
    NoSigner,
    #[error("wallet {0} is not the configured admin")]
    NotAdmin(Pubkey),
    #[error("admin account {0} is already initialized")]
    AlreadyInitialized(Pubkey),
    #[error("admin account {0} not found: the program has not been initialized")]
    NotInitialized(Pubkey),
    #[error("guide account {0} not found")]
    GuideNotFound(Pubkey),
    #[error("guide {id} is {actual}, expected {expected}")]
    InvalidStatus {
        id: GuideId,
        actual: VerificationStatus,
        expected: VerificationStatus,
    },
    #[error("guide {id} is {from} and cannot become {to}")]
    InvalidTransition {
        id: GuideId,
        from: VerificationStatus,
        to: VerificationStatus,
    },
    #[error("guide {id} already holds verification token {mint}")]
    AlreadyMinted { id: GuideId, mint: Pubkey },
    #[error("guide wallet address '{0}' is not a valid public key")]
    InvalidWallet(String),
    #[error("a submission is already in progress")]
    Busy,
    #[error("failed to load keypair: {0}")]
    Keypair(String),
    /// The signer refused or could not sign; never retried.
    #[error("failed to sign transaction: {0}")]
    Signing(String),
    #[error("failed to build token instruction: {0}")]
    TokenInstruction(String),
    #[error("transaction not landed after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: RpcError,
    },
    /// Broadcast succeeded but the node stopped answering; the transaction
    /// may have landed, so it is not sent again.
    #[error("transaction {signature} sent but its outcome is unknown: {reason}")]
    Unconfirmed { signature: Signature, reason: String },
    #[error("mint ledger {path}: {reason}")]
    Ledger { path: String, reason: String },
    /// The token exists on chain but the ledger write failed.
    #[error(
        "verification token {} for guide {} minted in {} but not recorded: {reason}",
        .record.mint, .record.guide_id, .record.signature
    )]
    MintNotRecorded {
        record: Box<MintRecord>,
        reason: String,
    },
    #[error(transparent)]
    Rpc(#[from] RpcError),
    #[error(transparent)]
    Upload(#[from] UploadError),
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl ClientError {
    /// Program log lines attached to the underlying RPC failure, if any.
    pub fn logs(&self) -> &[String] {
        match self {
            Self::RetriesExhausted { last, .. } | Self::Rpc(last) => last.logs(),
            _ => &[],
        }
    }
}
