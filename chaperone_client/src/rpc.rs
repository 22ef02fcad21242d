// JSON-RPC transport to a Solana cluster.
//
// `ChainRpc` is the narrow seam the rest of the crate talks through; the
// program client, the retry loop and the minter only ever see this trait.

use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use solana_sdk::hash::Hash;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::Transaction;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, Error)]
pub enum RpcError {
    /// The request never got a JSON-RPC answer (connection, timeout, HTTP).
    #[error("transport error: {0}")]
    Transport(String),
    /// The node answered with a JSON-RPC error object.
    #[error("rpc error {code}: {message}")]
    Server {
        code: i64,
        message: String,
        logs: Vec<String>,
    },
    /// The blockhash used to sign expired before the signature confirmed.
    #[error("block height exceeded before confirmation")]
    BlockHeightExceeded,
    /// The transaction landed but the program rejected it.
    #[error("transaction failed: {0}")]
    TransactionFailed(String),
    #[error("invalid rpc response: {0}")]
    InvalidResponse(String),
    #[error("failed to encode request: {0}")]
    Encode(String),
}

impl RpcError {
    /// The signing blockhash is no longer usable.
    pub fn is_blockhash_expired(&self) -> bool {
        match self {
            Self::BlockHeightExceeded => true,
            Self::Server { message, .. } => {
                let message = message.to_ascii_lowercase();
                message.contains("blockhash not found") || message.contains("block height exceeded")
            }
            _ => false,
        }
    }

    /// The request failed before the node could judge the transaction.
    pub fn is_transient_send(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Worth another attempt with a fresh blockhash; everything else is final.
    pub fn is_retryable(&self) -> bool {
        self.is_blockhash_expired() || self.is_transient_send()
    }

    pub fn logs(&self) -> &[String] {
        match self {
            Self::Server { logs, .. } => logs,
            _ => &[],
        }
    }
}

/// Signature status as reported by `getSignatureStatuses`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxStatus {
    Processed,
    Confirmed,
    Failed(String),
}

#[async_trait]
pub trait ChainRpc: Send + Sync {
    /// Latest blockhash and the last block height at which it is valid.
    async fn latest_blockhash(&self) -> Result<(Hash, u64), RpcError>;

    async fn send_transaction(&self, tx: &Transaction) -> Result<Signature, RpcError>;

    /// `None` while the cluster has not seen the signature.
    async fn signature_status(&self, signature: &Signature) -> Result<Option<TxStatus>, RpcError>;

    async fn block_height(&self) -> Result<u64, RpcError>;

    /// Raw account data, `None` when the account does not exist.
    async fn account_data(&self, address: &Pubkey) -> Result<Option<Vec<u8>>, RpcError>;

    /// All accounts owned by `program_id` whose data starts with `discriminator`.
    async fn program_accounts(
        &self,
        program_id: &Pubkey,
        discriminator: [u8; 8],
    ) -> Result<Vec<(Pubkey, Vec<u8>)>, RpcError>;

    async fn minimum_balance_for_rent_exemption(&self, data_len: usize) -> Result<u64, RpcError>;
}

// ---------------------------------------------------------------------------
// HTTP implementation
// ---------------------------------------------------------------------------

pub struct HttpRpc {
    client: reqwest::Client,
    url: String,
    commitment: String,
    next_id: AtomicU64,
}

#[derive(Deserialize)]
struct Envelope<T> {
    result: Option<T>,
    error: Option<ErrorObject>,
}

#[derive(Deserialize)]
struct ErrorObject {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

#[derive(Deserialize)]
struct WithContext<T> {
    value: T,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BlockhashValue {
    blockhash: String,
    last_valid_block_height: u64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusValue {
    #[serde(default)]
    err: Option<Value>,
    #[serde(default)]
    confirmation_status: Option<String>,
}

#[derive(Deserialize)]
struct AccountValue {
    data: Vec<String>,
}

#[derive(Deserialize)]
struct KeyedAccount {
    pubkey: String,
    account: AccountValue,
}

fn decode_data(account: &AccountValue) -> Result<Vec<u8>, RpcError> {
    let encoded = account
        .data
        .first()
        .ok_or_else(|| RpcError::InvalidResponse("account data missing".into()))?;
    BASE64
        .decode(encoded)
        .map_err(|e| RpcError::InvalidResponse(format!("account data is not base64: {e}")))
}

fn parse<T: FromStr>(raw: &str, what: &str) -> Result<T, RpcError> {
    raw.parse()
        .map_err(|_| RpcError::InvalidResponse(format!("invalid {what}: {raw}")))
}

impl HttpRpc {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            commitment: "confirmed".to_string(),
            next_id: AtomicU64::new(1),
        }
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        debug!(method, id, "rpc request");
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| RpcError::Transport(e.to_string()))?;
        let status = response.status();
        if !status.is_success() && status != reqwest::StatusCode::BAD_REQUEST {
            return Err(RpcError::Transport(format!("{method}: http status {status}")));
        }
        let envelope: Envelope<T> = response
            .json()
            .await
            .map_err(|e| RpcError::InvalidResponse(format!("{method}: {e}")))?;

        if let Some(error) = envelope.error {
            let logs = error
                .data
                .as_ref()
                .and_then(|d| d.get("logs"))
                .and_then(Value::as_array)
                .map(|lines| {
                    lines
                        .iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default();
            return Err(RpcError::Server {
                code: error.code,
                message: error.message,
                logs,
            });
        }
        envelope
            .result
            .ok_or_else(|| RpcError::InvalidResponse(format!("{method}: missing result")))
    }
}

#[async_trait]
impl ChainRpc for HttpRpc {
    async fn latest_blockhash(&self) -> Result<(Hash, u64), RpcError> {
        let response: WithContext<BlockhashValue> = self
            .call("getLatestBlockhash", json!([{ "commitment": self.commitment }]))
            .await?;
        let hash = parse(&response.value.blockhash, "blockhash")?;
        Ok((hash, response.value.last_valid_block_height))
    }

    async fn send_transaction(&self, tx: &Transaction) -> Result<Signature, RpcError> {
        let wire = bincode::serialize(tx).map_err(|e| RpcError::Encode(e.to_string()))?;
        let signature: String = self
            .call(
                "sendTransaction",
                json!([
                    BASE64.encode(wire),
                    { "encoding": "base64", "preflightCommitment": self.commitment }
                ]),
            )
            .await?;
        parse(&signature, "signature")
    }

    async fn signature_status(&self, signature: &Signature) -> Result<Option<TxStatus>, RpcError> {
        let response: WithContext<Vec<Option<StatusValue>>> = self
            .call("getSignatureStatuses", json!([[signature.to_string()]]))
            .await?;
        let Some(Some(status)) = response.value.into_iter().next() else {
            return Ok(None);
        };
        if let Some(err) = status.err {
            return Ok(Some(TxStatus::Failed(err.to_string())));
        }
        Ok(Some(match status.confirmation_status.as_deref() {
            Some("confirmed") | Some("finalized") => TxStatus::Confirmed,
            _ => TxStatus::Processed,
        }))
    }

    async fn block_height(&self) -> Result<u64, RpcError> {
        self.call("getBlockHeight", json!([{ "commitment": self.commitment }]))
            .await
    }

    async fn account_data(&self, address: &Pubkey) -> Result<Option<Vec<u8>>, RpcError> {
        let response: WithContext<Option<AccountValue>> = self
            .call(
                "getAccountInfo",
                json!([
                    address.to_string(),
                    { "encoding": "base64", "commitment": self.commitment }
                ]),
            )
            .await?;
        response.value.as_ref().map(decode_data).transpose()
    }

    async fn program_accounts(
        &self,
        program_id: &Pubkey,
        discriminator: [u8; 8],
    ) -> Result<Vec<(Pubkey, Vec<u8>)>, RpcError> {
        let accounts: Vec<KeyedAccount> = self
            .call(
                "getProgramAccounts",
                json!([
                    program_id.to_string(),
                    {
                        "encoding": "base64",
                        "commitment": self.commitment,
                        "filters": [{
                            "memcmp": {
                                "offset": 0,
                                "bytes": bs58::encode(discriminator).into_string(),
                                "encoding": "base58"
                            }
                        }]
                    }
                ]),
            )
            .await?;
        accounts
            .iter()
            .map(|keyed| {
                let address = parse::<Pubkey>(&keyed.pubkey, "pubkey")?;
                Ok::<_, RpcError>((address, decode_data(&keyed.account)?))
            })
            .collect()
    }

    async fn minimum_balance_for_rent_exemption(&self, data_len: usize) -> Result<u64, RpcError> {
        self.call(
            "getMinimumBalanceForRentExemption",
            json!([data_len, { "commitment": self.commitment }]),
        )
        .await
    }
}
