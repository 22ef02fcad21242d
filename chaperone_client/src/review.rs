use chaperone_core::{GuideId, GuideRecord, VerificationStatus};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use tracing::info;

use crate::error::ClientError;
use crate::ledger::MintRecord;
use crate::mint::VerificationMinter;
use crate::program::ProgramClient;

/// Admin-only operations over the verification queue.
///
/// The admin and status checks here only give an early, readable failure;
/// the program enforces both again on chain.
pub struct AdminReview {
    program: ProgramClient,
    admin: Pubkey,
}

impl AdminReview {
    pub fn new(program: ProgramClient, admin: Pubkey) -> Self {
        Self { program, admin }
    }

    pub fn program(&self) -> &ProgramClient {
        &self.program
    }

    pub fn admin(&self) -> Pubkey {
        self.admin
    }

    /// Session key, provided it is the configured admin wallet.
    pub fn ensure_admin(&self) -> Result<Pubkey, ClientError> {
        let key = self.program.session().public_key().ok_or(ClientError::NoSigner)?;
        if key != self.admin {
            return Err(ClientError::NotAdmin(key));
        }
        Ok(key)
    }

    /// One-time bootstrap of the admin account.
    pub async fn initialize(&self) -> Result<Signature, ClientError> {
        self.ensure_admin()?;
        self.program.initialize().await
    }

    /// Every submission, newest first.
    pub async fn queue(&self) -> Result<Vec<GuideRecord>, ClientError> {
        let mut guides = self.program.all_guides().await?;
        guides.reverse();
        Ok(guides)
    }

    pub async fn pending(&self) -> Result<Vec<GuideRecord>, ClientError> {
        let mut guides = self.queue().await?;
        guides.retain(|g| g.status() == VerificationStatus::Pending);
        Ok(guides)
    }

    pub async fn detail(&self, id: &GuideId) -> Result<GuideRecord, ClientError> {
        self.program.fetch_guide_by_id(id).await
    }

    pub async fn approve(&self, id: &GuideId) -> Result<Signature, ClientError> {
        self.ensure_admin()?;
        self.expect_transition(id, VerificationStatus::Approved).await?;
        let signature = self.program.approve_verification(id).await?;
        info!(%id, %signature, "guide approved");
        Ok(signature)
    }

    pub async fn reject(&self, id: &GuideId) -> Result<Signature, ClientError> {
        self.ensure_admin()?;
        self.expect_transition(id, VerificationStatus::Rejected).await?;
        let signature = self.program.reject_verification(id).await?;
        info!(%id, %signature, "guide rejected");
        Ok(signature)
    }

    /// Issues the verification token of an approved guide.
    pub async fn mint(
        &self,
        id: &GuideId,
        minter: &VerificationMinter,
    ) -> Result<MintRecord, ClientError> {
        minter.mint(self, id).await
    }

    async fn expect_transition(
        &self,
        id: &GuideId,
        next: VerificationStatus,
    ) -> Result<GuideRecord, ClientError> {
        let record = self.detail(id).await?;
        let from = record.status();
        if !from.can_transition_to(next) {
            return Err(ClientError::InvalidTransition { id: *id, from, to: next });
        }
        Ok(record)
    }

    pub(crate) async fn expect_status(
        &self,
        id: &GuideId,
        expected: VerificationStatus,
    ) -> Result<GuideRecord, ClientError> {
        let record = self.detail(id).await?;
        let actual = record.status();
        if actual != expected {
            return Err(ClientError::InvalidStatus {
                id: *id,
                actual,
                expected,
            });
        }
        Ok(record)
    }
}
