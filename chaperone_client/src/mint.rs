// Verification tokens: one non-fungible SPL token per approved guide.
//
// A token is a fresh 0-decimal mint with supply 1 held in the guide wallet's
// associated token account, with the mint authority dropped afterwards.
// The metadata document lives on IPFS and is tracked in the mint ledger.

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use chaperone_core::{GuideId, NftMetadata, VerificationStatus};
use solana_sdk::instruction::Instruction;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signer};
use solana_sdk::system_instruction;
use spl_associated_token_account::get_associated_token_address;
use spl_associated_token_account::instruction::create_associated_token_account_idempotent;
use spl_token::instruction::{AuthorityType, initialize_mint2, mint_to, set_authority};
use spl_token::solana_program::program_pack::Pack;
use spl_token::state::Mint;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::ClientError;
use crate::ledger::{MintLedger, MintRecord};
use crate::review::AdminReview;
use crate::upload::ContentStore;

pub struct VerificationMinter {
    store: Arc<dyn ContentStore>,
    config: Config,
}

impl VerificationMinter {
    pub fn new(store: Arc<dyn ContentStore>, config: &Config) -> Self {
        Self {
            store,
            config: config.clone(),
        }
    }

    pub fn ledger_path(&self) -> &PathBuf {
        &self.config.mint_ledger_path
    }

    /// Mints the verification token of an approved guide, at most once per
    /// guide id.
    pub async fn mint(
        &self,
        review: &AdminReview,
        id: &GuideId,
    ) -> Result<MintRecord, ClientError> {
        let payer = review.ensure_admin()?;
        let guide = review.expect_status(id, VerificationStatus::Approved).await?;
        let program = review.program();

        // Re-read right before minting so a record written by another run is seen.
        let mut ledger = MintLedger::load(self.ledger_path().clone())?;
        if let Some(existing) = ledger.get(id) {
            if program.account_exists(&existing.mint).await? {
                return Err(ClientError::AlreadyMinted {
                    id: *id,
                    mint: existing.mint,
                });
            }
            warn!(%id, mint = %existing.mint, "recorded mint not found on chain; minting again");
        }

        let owner = Pubkey::from_str(&guide.account.wallet_address)
            .map_err(|_| ClientError::InvalidWallet(guide.account.wallet_address.clone()))?;

        let metadata = NftMetadata::for_guide(&guide.account, Some(self.config.profile_url(id)));
        let metadata_uri = self.store.upload_json(&metadata).await?;

        let mint = Keypair::new();
        let lamports = program
            .rpc()
            .minimum_balance_for_rent_exemption(Mint::LEN)
            .await?;
        let instructions = token_instructions(&payer, &mint.pubkey(), &owner, lamports)?;
        let signature = program.send(&instructions, &[&mint]).await?;
        info!(%id, mint = %mint.pubkey(), %owner, %signature, "verification token minted");

        let record = MintRecord {
            guide_id: *id,
            mint: mint.pubkey(),
            owner,
            metadata_uri,
            signature,
        };
        if let Err(e) = ledger.record(record.clone()) {
            error!(
                %id,
                mint = %record.mint,
                owner = %record.owner,
                metadata_uri = %record.metadata_uri,
                %signature,
                error = %e,
                "verification token minted but not recorded"
            );
            return Err(ClientError::MintNotRecorded {
                record: Box::new(record),
                reason: e.to_string(),
            });
        }
        Ok(record)
    }
}

/// create mint account, initialize it, open the owner's token account,
/// mint one token, then revoke the mint authority.
fn token_instructions(
    payer: &Pubkey,
    mint: &Pubkey,
    owner: &Pubkey,
    lamports: u64,
) -> Result<Vec<Instruction>, ClientError> {
    let token_program = spl_token::id();
    let token_account = get_associated_token_address(owner, mint);
    let token_error = |e: spl_token::solana_program::program_error::ProgramError| {
        ClientError::TokenInstruction(e.to_string())
    };

    Ok(vec![
        system_instruction::create_account(payer, mint, lamports, Mint::LEN as u64, &token_program),
        initialize_mint2(&token_program, mint, payer, None, 0).map_err(token_error)?,
        create_associated_token_account_idempotent(payer, owner, mint, &token_program),
        mint_to(&token_program, mint, &token_account, payer, &[], 1).map_err(token_error)?,
        set_authority(&token_program, mint, None, AuthorityType::MintTokens, payer, &[])
            .map_err(token_error)?,
    ])
}
