// chaperone_core: shared types, wire encoding and PDA derivation helpers for
// the ChaperoneMe guide-verification program.
//
// The program itself is an Anchor program deployed separately. Everything in
// this crate mirrors its interface so that off-chain tooling derives the same
// account addresses and produces the same instruction bytes.

pub mod error;
pub mod guide_id;
pub mod instruction;
pub mod metadata;
pub mod pda;
pub mod state;
pub mod validation;

pub use error::CoreError;
pub use guide_id::GuideId;
pub use instruction::{Instruction, SubmitVerificationArgs};
pub use metadata::{NftAttribute, NftMetadata};
pub use pda::{compute_admin_pda, compute_guide_pda};
pub use state::{
    AccountLayout, AdminAccount, AffiliationType, GuideAccount, GuideRecord, VerificationStatus,
};
pub use validation::{DocumentPresence, GuideDetails, ValidationError};

use solana_program::pubkey::Pubkey;

/// Address of the deployed guide-verification program on devnet.
pub const DEFAULT_PROGRAM_ID: Pubkey =
    solana_program::pubkey!("E7N3tt6G96BLoD6vXVhztDaD1mGpDEm533jjxKErVaKk");

/// Wallet allowed to bootstrap the program and review submissions.
pub const DEFAULT_ADMIN: Pubkey =
    solana_program::pubkey!("GsjREUyUEkFRAhoSj1q9Tg4tPGCyoEAoTyFiZjqxKD92");
