use std::sync::Arc;

use chaperone_core::instruction::{self, SubmitVerificationArgs};
use chaperone_core::{
    AccountLayout, AdminAccount, GuideAccount, GuideId, GuideRecord, VerificationStatus,
    compute_admin_pda, compute_guide_pda,
};
use solana_sdk::instruction::Instruction;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature};
use tracing::{info, warn};

use crate::error::ClientError;
use crate::rpc::ChainRpc;
use crate::session::Session;
use crate::submit::{RetryPolicy, send_with_retry};

/// Result of a landed `submit_verification`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedGuide {
    pub id: GuideId,
    pub address: Pubkey,
    pub signature: Signature,
}

/// Client bound to one deployment of the verification program.
///
/// Reads work with any session; writes need a session that can sign and fail
/// with [`ClientError::NoSigner`] before touching the network otherwise.
pub struct ProgramClient {
    rpc: Arc<dyn ChainRpc>,
    session: Session,
    program_id: Pubkey,
    retry: RetryPolicy,
}

impl ProgramClient {
    pub fn new(rpc: Arc<dyn ChainRpc>, session: Session, program_id: Pubkey) -> Self {
        Self {
            rpc,
            session,
            program_id,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn program_id(&self) -> Pubkey {
        self.program_id
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn rpc(&self) -> &dyn ChainRpc {
        self.rpc.as_ref()
    }

    // -- addresses ----------------------------------------------------------

    pub fn admin_address(&self) -> Pubkey {
        compute_admin_pda(&self.program_id).0
    }

    pub fn guide_address(&self, id: &GuideId) -> Pubkey {
        compute_guide_pda(&self.program_id, &id.authority, id.index).0
    }

    // -- reads --------------------------------------------------------------

    pub async fn account_exists(&self, address: &Pubkey) -> Result<bool, ClientError> {
        Ok(self.rpc.account_data(address).await?.is_some())
    }

    pub async fn admin_exists(&self) -> Result<bool, ClientError> {
        self.account_exists(&self.admin_address()).await
    }

    pub async fn fetch_admin(&self) -> Result<AdminAccount, ClientError> {
        let address = self.admin_address();
        let data = self
            .rpc
            .account_data(&address)
            .await?
            .ok_or(ClientError::NotInitialized(address))?;
        Ok(AdminAccount::decode(&data)?)
    }

    pub async fn fetch_guide(&self, address: &Pubkey) -> Result<GuideRecord, ClientError> {
        let data = self
            .rpc
            .account_data(address)
            .await?
            .ok_or(ClientError::GuideNotFound(*address))?;
        Ok(GuideRecord {
            address: *address,
            account: GuideAccount::decode(&data)?,
        })
    }

    pub async fn fetch_guide_by_id(&self, id: &GuideId) -> Result<GuideRecord, ClientError> {
        self.fetch_guide(&self.guide_address(id)).await
    }

    /// Every guide record of the program, ordered by submission index.
    pub async fn all_guides(&self) -> Result<Vec<GuideRecord>, ClientError> {
        let raw = self
            .rpc
            .program_accounts(&self.program_id, GuideAccount::discriminator())
            .await?;
        let mut guides: Vec<GuideRecord> = raw
            .into_iter()
            .filter_map(|(address, data)| match GuideAccount::decode(&data) {
                Ok(account) => Some(GuideRecord { address, account }),
                Err(e) => {
                    warn!(%address, error = %e, "skipping undecodable guide account");
                    None
                }
            })
            .collect();
        guides.sort_by_key(|g| (g.account.index, g.account.authority));
        Ok(guides)
    }

    /// The public directory: approved guides only.
    pub async fn approved_guides(&self) -> Result<Vec<GuideRecord>, ClientError> {
        let mut guides = self.all_guides().await?;
        guides.retain(|g| g.status() == VerificationStatus::Approved);
        Ok(guides)
    }

    /// Approved guides whose token wallet is `wallet`.
    pub async fn portfolio(&self, wallet: &Pubkey) -> Result<Vec<GuideRecord>, ClientError> {
        let wallet = wallet.to_string();
        let mut guides = self.approved_guides().await?;
        guides.retain(|g| g.account.wallet_address == wallet);
        Ok(guides)
    }

    // -- writes -------------------------------------------------------------

    /// Signs with the session keypair plus `extra_signers` and lands the
    /// transaction through the retry loop.
    pub async fn send(
        &self,
        instructions: &[Instruction],
        extra_signers: &[&Keypair],
    ) -> Result<Signature, ClientError> {
        let payer = self.session.signer()?;
        let mut signers = Vec::with_capacity(1 + extra_signers.len());
        signers.push(payer);
        signers.extend_from_slice(extra_signers);
        send_with_retry(self.rpc.as_ref(), instructions, &signers, &self.retry).await
    }

    pub async fn initialize(&self) -> Result<Signature, ClientError> {
        let authority = self.signer_key()?;
        let admin = self.admin_address();
        if self.admin_exists().await? {
            return Err(ClientError::AlreadyInitialized(admin));
        }
        let ix = instruction::initialize(&self.program_id, &authority)?;
        let signature = self.send(&[ix], &[]).await?;
        info!(%admin, %signature, "admin account initialized");
        Ok(signature)
    }

    /// Creates a pending guide record at the next free index.
    pub async fn submit_verification(
        &self,
        args: SubmitVerificationArgs,
    ) -> Result<SubmittedGuide, ClientError> {
        let authority = self.signer_key()?;
        let next_index = self.fetch_admin().await?.guides_count;
        let id = GuideId::new(authority, next_index);
        let ix = instruction::submit_verification(&self.program_id, &authority, next_index, args)?;
        let signature = self.send(&[ix], &[]).await?;
        let address = self.guide_address(&id);
        info!(%id, %address, %signature, "verification submitted");
        Ok(SubmittedGuide {
            id,
            address,
            signature,
        })
    }

    pub async fn approve_verification(&self, id: &GuideId) -> Result<Signature, ClientError> {
        let admin = self.signer_key()?;
        let ix =
            instruction::approve_verification(&self.program_id, &admin, &id.authority, id.index)?;
        self.send(&[ix], &[]).await
    }

    pub async fn reject_verification(&self, id: &GuideId) -> Result<Signature, ClientError> {
        let admin = self.signer_key()?;
        let ix =
            instruction::reject_verification(&self.program_id, &admin, &id.authority, id.index)?;
        self.send(&[ix], &[]).await
    }

    fn signer_key(&self) -> Result<Pubkey, ClientError> {
        self.session.public_key().ok_or(ClientError::NoSigner)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::mock::{MockRpc, fast_policy};
    use chaperone_core::{AffiliationType, DEFAULT_PROGRAM_ID, Instruction as ProgramInstruction};
    use solana_sdk::signature::Signer;

    pub(crate) fn guide(
        authority: Pubkey,
        index: u64,
        status: VerificationStatus,
        wallet: &Pubkey,
    ) -> GuideAccount {
        GuideAccount {
            authority: authority.to_bytes(),
            ic_number: format!("IC-{index}"),
            name: format!("Guide {index}"),
            email: format!("guide{index}@example.com"),
            phone: "0123456789".into(),
            wallet_address: wallet.to_string(),
            license_uri: "https://gateway.test/ipfs/QmLicense".into(),
            photo_id_uri: "https://gateway.test/ipfs/QmPhoto".into(),
            attachment_uri: None,
            affiliation_type: AffiliationType::Freelance,
            agency_name: None,
            offer_letter_uri: None,
            status,
            approved_at: None,
            index,
            bump: 255,
        }
    }

    /// Seeds an admin account and returns a client over the mock.
    pub(crate) fn client_with(
        rpc: Arc<MockRpc>,
        session: Session,
        guides_count: u64,
    ) -> ProgramClient {
        let admin = AdminAccount {
            authority: Pubkey::new_unique().to_bytes(),
            guides_count,
        };
        rpc.insert_account(&DEFAULT_PROGRAM_ID, compute_admin_pda(&DEFAULT_PROGRAM_ID).0, &admin);
        ProgramClient::new(rpc, session, DEFAULT_PROGRAM_ID).with_retry_policy(fast_policy())
    }

    pub(crate) fn seed_guide(rpc: &MockRpc, account: &GuideAccount) -> Pubkey {
        let (address, _) =
            compute_guide_pda(&DEFAULT_PROGRAM_ID, &account.authority(), account.index);
        rpc.insert_account(&DEFAULT_PROGRAM_ID, address, account);
        address
    }

    fn args() -> SubmitVerificationArgs {
        SubmitVerificationArgs {
            ic_number: "IC".into(),
            name: "Name".into(),
            email: "e@x".into(),
            phone: "1".into(),
            wallet_address: Pubkey::new_unique().to_string(),
            license_uri: "https://gateway.test/ipfs/QmL".into(),
            photo_id_uri: "https://gateway.test/ipfs/QmP".into(),
            attachment_uri: None,
            affiliation_type: AffiliationType::Freelance,
            agency_name: None,
            offer_letter_uri: None,
        }
    }

    #[tokio::test]
    async fn writes_without_signer_touch_nothing() {
        let rpc = Arc::new(MockRpc::new());
        let client = client_with(rpc.clone(), Session::read_only(), 0);
        let id = GuideId::new(Pubkey::new_unique(), 0);

        assert!(matches!(client.initialize().await, Err(ClientError::NoSigner)));
        assert!(matches!(client.submit_verification(args()).await, Err(ClientError::NoSigner)));
        assert!(matches!(client.approve_verification(&id).await, Err(ClientError::NoSigner)));
        assert!(matches!(client.reject_verification(&id).await, Err(ClientError::NoSigner)));
        assert_eq!(rpc.send_attempts(), 0);
        assert_eq!(rpc.blockhash_requests(), 0);
    }

    #[tokio::test]
    async fn submission_uses_admin_counter_as_index() {
        let rpc = Arc::new(MockRpc::new());
        let keypair = Keypair::new();
        let authority = keypair.pubkey();
        let client = client_with(rpc.clone(), Session::from_keypair(keypair), 4);

        let submitted = client.submit_verification(args()).await.unwrap();

        assert_eq!(submitted.id, GuideId::new(authority, 4));
        assert_eq!(submitted.address, compute_guide_pda(&DEFAULT_PROGRAM_ID, &authority, 4).0);
        let sent = rpc.sent();
        assert_eq!(sent.len(), 1);
        let message = &sent[0].message;
        let ix = &message.instructions[0];
        assert_eq!(message.account_keys[ix.accounts[0] as usize], submitted.address);
        assert_eq!(
            ix.data[..8],
            ProgramInstruction::SubmitVerification(args()).discriminator()
        );
    }

    #[tokio::test]
    async fn initialize_refuses_existing_admin() {
        let rpc = Arc::new(MockRpc::new());
        let client = client_with(rpc.clone(), Session::from_keypair(Keypair::new()), 0);
        assert!(matches!(
            client.initialize().await,
            Err(ClientError::AlreadyInitialized(_))
        ));
        assert_eq!(rpc.send_attempts(), 0);
    }

    #[tokio::test]
    async fn initialize_sends_when_admin_missing() {
        let rpc = Arc::new(MockRpc::new());
        let session = Session::from_keypair(Keypair::new());
        let client = ProgramClient::new(rpc.clone(), session, DEFAULT_PROGRAM_ID)
            .with_retry_policy(fast_policy());
        assert!(!client.admin_exists().await.unwrap());
        client.initialize().await.unwrap();
        assert_eq!(rpc.invoked_programs(), vec![DEFAULT_PROGRAM_ID]);
    }

    #[tokio::test]
    async fn directory_and_portfolio_filter_records() {
        let rpc = Arc::new(MockRpc::new());
        let mine = Keypair::new();
        let my_wallet = mine.pubkey();
        let other_wallet = Pubkey::new_unique();
        let authority = Pubkey::new_unique();
        seed_guide(&rpc, &guide(authority, 2, VerificationStatus::Approved, &other_wallet));
        seed_guide(&rpc, &guide(authority, 0, VerificationStatus::Approved, &my_wallet));
        seed_guide(&rpc, &guide(authority, 1, VerificationStatus::Pending, &my_wallet));
        seed_guide(&rpc, &guide(authority, 3, VerificationStatus::Rejected, &my_wallet));
        let client = client_with(rpc.clone(), Session::from_keypair(mine), 4);

        let all = client.all_guides().await.unwrap();
        assert_eq!(all.iter().map(|g| g.account.index).collect::<Vec<_>>(), [0, 1, 2, 3]);

        let approved = client.approved_guides().await.unwrap();
        assert_eq!(approved.iter().map(|g| g.account.index).collect::<Vec<_>>(), [0, 2]);

        let portfolio = client.portfolio(&my_wallet).await.unwrap();
        assert_eq!(portfolio.len(), 1);
        assert_eq!(portfolio[0].id(), GuideId::new(authority, 0));
    }

    #[tokio::test]
    async fn missing_records_are_reported() {
        let rpc = Arc::new(MockRpc::new());
        let client = ProgramClient::new(rpc, Session::read_only(), DEFAULT_PROGRAM_ID);
        assert!(matches!(client.fetch_admin().await, Err(ClientError::NotInitialized(_))));
        let id = GuideId::new(Pubkey::new_unique(), 0);
        assert!(matches!(
            client.fetch_guide_by_id(&id).await,
            Err(ClientError::GuideNotFound(_))
        ));
    }

    #[tokio::test]
    async fn corrupt_guide_accounts_are_skipped() {
        let rpc = Arc::new(MockRpc::new());
        let mut data = GuideAccount::discriminator().to_vec();
        data.extend_from_slice(&[0xff; 3]);
        rpc.insert_raw(&DEFAULT_PROGRAM_ID, Pubkey::new_unique(), data);
        let client = ProgramClient::new(rpc, Session::read_only(), DEFAULT_PROGRAM_ID);
        assert!(client.all_guides().await.unwrap().is_empty());
    }
}
