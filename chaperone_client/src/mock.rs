// In-memory stand-ins for the cluster and the pinning service.

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chaperone_core::{AccountLayout, NftMetadata};
use solana_sdk::hash::Hash;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::Transaction;

use crate::rpc::{ChainRpc, RpcError, TxStatus};
use crate::submit::RetryPolicy;
use crate::upload::{ContentStore, UploadError};

pub(crate) fn fast_policy() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        retry_delay: Duration::from_millis(1),
        poll_interval: Duration::from_millis(1),
        max_poll_failures: 3,
    }
}

#[derive(Default)]
pub(crate) struct MockRpc {
    /// address -> (owner, data)
    accounts: Mutex<BTreeMap<Pubkey, (Pubkey, Vec<u8>)>>,
    send_failures: Mutex<VecDeque<RpcError>>,
    every_send_fails: Mutex<Option<RpcError>>,
    confirmation_failures: Mutex<VecDeque<String>>,
    status_failures: Mutex<VecDeque<RpcError>>,
    sent: Mutex<Vec<Transaction>>,
    failed_signatures: Mutex<BTreeMap<Signature, String>>,
    send_calls: AtomicU32,
    blockhash_calls: AtomicU32,
}

impl MockRpc {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert_account<T: AccountLayout>(
        &self,
        owner: &Pubkey,
        address: Pubkey,
        account: &T,
    ) {
        let data = account.encode().unwrap();
        self.insert_raw(owner, address, data);
    }

    pub(crate) fn insert_raw(&self, owner: &Pubkey, address: Pubkey, data: Vec<u8>) {
        self.accounts.lock().unwrap().insert(address, (*owner, data));
    }

    pub(crate) fn fail_next_send(&self, err: RpcError) {
        self.send_failures.lock().unwrap().push_back(err);
    }

    pub(crate) fn fail_every_send(&self, err: RpcError) {
        *self.every_send_fails.lock().unwrap() = Some(err);
    }

    pub(crate) fn fail_next_confirmation(&self, err: &str) {
        self.confirmation_failures.lock().unwrap().push_back(err.to_string());
    }

    /// The next `signature_status` call fails with `err` instead of answering.
    pub(crate) fn fail_next_status(&self, err: RpcError) {
        self.status_failures.lock().unwrap().push_back(err);
    }

    /// Transactions accepted by `send_transaction`.
    pub(crate) fn sent(&self) -> Vec<Transaction> {
        self.sent.lock().unwrap().clone()
    }

    /// Every `send_transaction` call, accepted or not.
    pub(crate) fn send_attempts(&self) -> u32 {
        self.send_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn blockhash_requests(&self) -> u32 {
        self.blockhash_calls.load(Ordering::SeqCst)
    }

    /// Program ids invoked by accepted transactions, in order.
    pub(crate) fn invoked_programs(&self) -> Vec<Pubkey> {
        self.sent()
            .iter()
            .flat_map(|tx| {
                tx.message
                    .instructions
                    .iter()
                    .map(|ix| tx.message.account_keys[ix.program_id_index as usize])
                    .collect::<Vec<_>>()
            })
            .collect()
    }
}

#[async_trait]
impl ChainRpc for MockRpc {
    async fn latest_blockhash(&self) -> Result<(Hash, u64), RpcError> {
        self.blockhash_calls.fetch_add(1, Ordering::SeqCst);
        Ok((Hash::new_unique(), 1_000))
    }

    async fn send_transaction(&self, tx: &Transaction) -> Result<Signature, RpcError> {
        self.send_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.every_send_fails.lock().unwrap().clone() {
            return Err(err);
        }
        if let Some(err) = self.send_failures.lock().unwrap().pop_front() {
            return Err(err);
        }
        let signature = tx.signatures[0];
        if let Some(err) = self.confirmation_failures.lock().unwrap().pop_front() {
            self.failed_signatures.lock().unwrap().insert(signature, err);
        }
        self.sent.lock().unwrap().push(tx.clone());
        Ok(signature)
    }

    async fn signature_status(&self, signature: &Signature) -> Result<Option<TxStatus>, RpcError> {
        if let Some(err) = self.status_failures.lock().unwrap().pop_front() {
            return Err(err);
        }
        if let Some(err) = self.failed_signatures.lock().unwrap().get(signature) {
            return Ok(Some(TxStatus::Failed(err.clone())));
        }
        let seen = self
            .sent
            .lock()
            .unwrap()
            .iter()
            .any(|tx| tx.signatures[0] == *signature);
        Ok(seen.then_some(TxStatus::Confirmed))
    }

    async fn block_height(&self) -> Result<u64, RpcError> {
        Ok(500)
    }

    async fn account_data(&self, address: &Pubkey) -> Result<Option<Vec<u8>>, RpcError> {
        Ok(self
            .accounts
            .lock()
            .unwrap()
            .get(address)
            .map(|(_, data)| data.clone()))
    }

    async fn program_accounts(
        &self,
        program_id: &Pubkey,
        discriminator: [u8; 8],
    ) -> Result<Vec<(Pubkey, Vec<u8>)>, RpcError> {
        Ok(self
            .accounts
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, (owner, data))| owner == program_id && data.starts_with(&discriminator))
            .map(|(address, (_, data))| (*address, data.clone()))
            .collect())
    }

    async fn minimum_balance_for_rent_exemption(&self, data_len: usize) -> Result<u64, RpcError> {
        Ok(6_960 * (data_len as u64 + 128))
    }
}

/// Pinning service double: returns `https://gateway.test/ipfs/Qm<name>`.
#[derive(Default)]
pub(crate) struct MockStore {
    uploads: Mutex<Vec<String>>,
    failing: Mutex<HashSet<String>>,
}

impl MockStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn fail_on(&self, name: &str) {
        self.failing.lock().unwrap().insert(name.to_string());
    }

    pub(crate) fn uploads(&self) -> Vec<String> {
        let mut uploads = self.uploads.lock().unwrap().clone();
        uploads.sort();
        uploads
    }
}

#[async_trait]
impl ContentStore for MockStore {
    async fn upload_file(&self, name: &str, _bytes: Vec<u8>) -> Result<String, UploadError> {
        if self.failing.lock().unwrap().contains(name) {
            return Err(UploadError::Rejected {
                status: 403,
                body: "{\"error\":\"quota exceeded\"}".into(),
            });
        }
        self.uploads.lock().unwrap().push(name.to_string());
        Ok(format!("https://gateway.test/ipfs/Qm{name}"))
    }

    async fn upload_json(&self, metadata: &NftMetadata) -> Result<String, UploadError> {
        let name = format!("{}.json", metadata.name);
        self.upload_file(&name, Vec::new()).await
    }
}
