// Instruction encoding for the verification program.
//
// Anchor dispatches on `sha256("global:<method>")[..8]`; the borsh-encoded
// arguments follow in declaration order.

use borsh::{BorshDeserialize, BorshSerialize};
use sha2::{Digest, Sha256};
use solana_program::instruction::{AccountMeta, Instruction as SolanaInstruction};
use solana_program::pubkey::Pubkey;
use solana_program::system_program;

use crate::error::CoreError;
use crate::pda::{compute_admin_pda, compute_guide_pda};
use crate::state::AffiliationType;
use crate::validation::{ValidationError, check_len};

/// First 8 bytes of `sha256("<namespace>:<name>")`.
pub fn sighash(namespace: &str, name: &str) -> [u8; 8] {
    let digest = Sha256::digest(format!("{namespace}:{name}").as_bytes());
    let mut out = [0u8; 8];
    out.copy_from_slice(&digest[..8]);
    out
}

// ---------------------------------------------------------------------------
// Instructions
// ---------------------------------------------------------------------------

/// Methods exposed by the verification program.
///
/// Flow:
/// 1. The admin wallet calls `Initialize` once: creates the admin PDA
/// 2. A guide calls `SubmitVerification`: creates a pending guide PDA at
///    index `guides_count` and bumps the counter
/// 3. The admin calls `ApproveVerification` or `RejectVerification`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    Initialize,
    SubmitVerification(SubmitVerificationArgs),
    ApproveVerification {
        guide_authority: Pubkey,
        guide_index: u64,
    },
    RejectVerification {
        guide_authority: Pubkey,
        guide_index: u64,
    },
}

/// Arguments of `submit_verification`, in program order.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct SubmitVerificationArgs {
    pub ic_number: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub wallet_address: String,
    pub license_uri: String,
    pub photo_id_uri: String,
    pub attachment_uri: Option<String>,
    pub affiliation_type: AffiliationType,
    pub agency_name: Option<String>,
    pub offer_letter_uri: Option<String>,
}

impl SubmitVerificationArgs {
    /// Checks the uploaded URIs against the program's allocation limits.
    pub fn check_uris(&self) -> Result<(), ValidationError> {
        check_len("license_uri", &self.license_uri, 150)?;
        check_len("photo_id_uri", &self.photo_id_uri, 150)?;
        if let Some(uri) = &self.attachment_uri {
            check_len("attachment_uri", uri, 150)?;
        }
        if let Some(uri) = &self.offer_letter_uri {
            check_len("offer_letter_uri", uri, 150)?;
        }
        if self.affiliation_type == AffiliationType::Agency
            && (self.agency_name.is_none() || self.offer_letter_uri.is_none())
        {
            return Err(ValidationError::MissingAgencyInformation);
        }
        Ok(())
    }
}

impl Instruction {
    /// Anchor method name.
    pub fn method(&self) -> &'static str {
        match self {
            Self::Initialize => "initialize",
            Self::SubmitVerification(_) => "submit_verification",
            Self::ApproveVerification { .. } => "approve_verification",
            Self::RejectVerification { .. } => "reject_verification",
        }
    }

    pub fn discriminator(&self) -> [u8; 8] {
        sighash("global", self.method())
    }

    /// Discriminator followed by the borsh-encoded arguments.
    pub fn data(&self) -> Result<Vec<u8>, CoreError> {
        let mut data = self.discriminator().to_vec();
        let encoded = match self {
            Self::Initialize => Ok(()),
            Self::SubmitVerification(args) => args.serialize(&mut data),
            Self::ApproveVerification {
                guide_authority,
                guide_index,
            }
            | Self::RejectVerification {
                guide_authority,
                guide_index,
            } => (guide_authority.to_bytes(), *guide_index).serialize(&mut data),
        };
        encoded.map_err(|e| CoreError::Encode(e.to_string()))?;
        Ok(data)
    }
}

// ---------------------------------------------------------------------------
// Instruction builders (account order matches the program's Accounts structs)
// ---------------------------------------------------------------------------

/// Accounts: admin (PDA, init), authority (signer, payer), system program.
pub fn initialize(program_id: &Pubkey, authority: &Pubkey) -> Result<SolanaInstruction, CoreError> {
    let (admin, _) = compute_admin_pda(program_id);
    build(
        program_id,
        &Instruction::Initialize,
        vec![
            AccountMeta::new(admin, false),
            AccountMeta::new(*authority, true),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
    )
}

/// Accounts: guide (PDA at `next_index`, init), admin (mut), authority
/// (signer, payer), system program.
pub fn submit_verification(
    program_id: &Pubkey,
    authority: &Pubkey,
    next_index: u64,
    args: SubmitVerificationArgs,
) -> Result<SolanaInstruction, CoreError> {
    args.check_uris()?;
    let (admin, _) = compute_admin_pda(program_id);
    let (guide, _) = compute_guide_pda(program_id, authority, next_index);
    build(
        program_id,
        &Instruction::SubmitVerification(args),
        vec![
            AccountMeta::new(guide, false),
            AccountMeta::new(admin, false),
            AccountMeta::new(*authority, true),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
    )
}

/// Accounts: guide (mut), admin (read-only, authority constraint), admin
/// wallet (signer), system program.
pub fn approve_verification(
    program_id: &Pubkey,
    admin_authority: &Pubkey,
    guide_authority: &Pubkey,
    guide_index: u64,
) -> Result<SolanaInstruction, CoreError> {
    review(
        program_id,
        admin_authority,
        Instruction::ApproveVerification {
            guide_authority: *guide_authority,
            guide_index,
        },
    )
}

pub fn reject_verification(
    program_id: &Pubkey,
    admin_authority: &Pubkey,
    guide_authority: &Pubkey,
    guide_index: u64,
) -> Result<SolanaInstruction, CoreError> {
    review(
        program_id,
        admin_authority,
        Instruction::RejectVerification {
            guide_authority: *guide_authority,
            guide_index,
        },
    )
}

fn review(
    program_id: &Pubkey,
    admin_authority: &Pubkey,
    instruction: Instruction,
) -> Result<SolanaInstruction, CoreError> {
    let (guide_authority, guide_index) = match &instruction {
        Instruction::ApproveVerification {
            guide_authority,
            guide_index,
        }
        | Instruction::RejectVerification {
            guide_authority,
            guide_index,
        } => (*guide_authority, *guide_index),
        Instruction::Initialize | Instruction::SubmitVerification(_) => {
            return Err(CoreError::Encode(format!(
                "{} is not a review instruction",
                instruction.method()
            )));
        }
    };
    let (admin, _) = compute_admin_pda(program_id);
    let (guide, _) = compute_guide_pda(program_id, &guide_authority, guide_index);
    build(
        program_id,
        &instruction,
        vec![
            AccountMeta::new(guide, false),
            AccountMeta::new_readonly(admin, false),
            AccountMeta::new(*admin_authority, true),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
    )
}

fn build(
    program_id: &Pubkey,
    instruction: &Instruction,
    accounts: Vec<AccountMeta>,
) -> Result<SolanaInstruction, CoreError> {
    Ok(SolanaInstruction {
        program_id: *program_id,
        accounts,
        data: instruction.data()?,
    })
}
