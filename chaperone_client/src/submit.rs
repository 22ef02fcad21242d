// Landing a signed transaction despite blockhash expiry.
//
// Each attempt signs against a fresh blockhash, broadcasts, and polls the
// signature until it confirms, fails, or outlives its block-height ceiling.
// Only a failed broadcast or an expired blockhash starts a new attempt; once
// a signature is out, a flaky node only delays polling of that signature.

use std::time::Duration;

use solana_sdk::instruction::Instruction;
use solana_sdk::signature::{Keypair, Signature, Signer};
use solana_sdk::transaction::Transaction;
use tracing::{debug, info, warn};

use crate::error::ClientError;
use crate::rpc::{ChainRpc, RpcError, TxStatus};

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Upper bound on broadcasts per logical submission
    pub max_attempts: u32,
    /// Pause between a retryable failure and the next attempt
    pub retry_delay: Duration,
    /// Interval between signature status polls
    pub poll_interval: Duration,
    /// Consecutive unreachable-node polls tolerated for a sent signature
    pub max_poll_failures: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_delay: Duration::from_secs(1),
            poll_interval: Duration::from_millis(500),
            max_poll_failures: 20,
        }
    }
}

enum AttemptError {
    Signing(String),
    /// Nothing reached the cluster, or the node refused the broadcast.
    Send(RpcError),
    /// The signature is out; this is what became of it.
    Confirm(Signature, RpcError),
}

/// Builds a transaction paid by `signers[0]` and lands it.
pub async fn send_with_retry(
    rpc: &dyn ChainRpc,
    instructions: &[Instruction],
    signers: &[&Keypair],
    policy: &RetryPolicy,
) -> Result<Signature, ClientError> {
    let payer = signers.first().ok_or(ClientError::NoSigner)?.pubkey();
    let mut tx = Transaction::new_with_payer(instructions, Some(&payer));
    let attempts = policy.max_attempts.max(1);

    let mut attempt = 1;
    loop {
        let err = match attempt_once(rpc, &mut tx, signers, policy).await {
            Ok(signature) => {
                info!(%signature, attempt, "transaction confirmed");
                return Ok(signature);
            }
            Err(AttemptError::Signing(reason)) => return Err(ClientError::Signing(reason)),
            Err(AttemptError::Send(err)) if err.is_retryable() => err,
            Err(AttemptError::Send(err)) => return Err(err.into()),
            Err(AttemptError::Confirm(_, err)) if err.is_blockhash_expired() => err,
            Err(AttemptError::Confirm(signature, RpcError::Transport(reason))) => {
                return Err(ClientError::Unconfirmed { signature, reason });
            }
            Err(AttemptError::Confirm(_, err)) => return Err(err.into()),
        };
        if attempt >= attempts {
            return Err(ClientError::RetriesExhausted { attempts, last: err });
        }
        warn!(attempt, error = %err, "transaction not landed; retrying with a fresh blockhash");
        attempt += 1;
        tokio::time::sleep(policy.retry_delay).await;
    }
}

async fn attempt_once(
    rpc: &dyn ChainRpc,
    tx: &mut Transaction,
    signers: &[&Keypair],
    policy: &RetryPolicy,
) -> Result<Signature, AttemptError> {
    let (blockhash, last_valid_block_height) =
        rpc.latest_blockhash().await.map_err(AttemptError::Send)?;
    tx.try_sign(signers, blockhash)
        .map_err(|e| AttemptError::Signing(e.to_string()))?;

    let signature = rpc.send_transaction(tx).await.map_err(AttemptError::Send)?;
    debug!(%signature, last_valid_block_height, "transaction sent");
    confirm(rpc, &signature, last_valid_block_height, policy)
        .await
        .map_err(|e| AttemptError::Confirm(signature, e))?;
    Ok(signature)
}

/// Polls one signature. Transport failures are absorbed up to
/// `max_poll_failures` in a row and then surface as `Transport`.
async fn confirm(
    rpc: &dyn ChainRpc,
    signature: &Signature,
    last_valid_block_height: u64,
    policy: &RetryPolicy,
) -> Result<(), RpcError> {
    let mut failures = 0;
    loop {
        match poll_once(rpc, signature, last_valid_block_height).await {
            Ok(true) => return Ok(()),
            Ok(false) => failures = 0,
            Err(RpcError::Transport(reason)) if failures < policy.max_poll_failures => {
                failures += 1;
                debug!(%signature, failures, %reason, "status poll failed; polling again");
            }
            Err(err) => return Err(err),
        }
        tokio::time::sleep(policy.poll_interval).await;
    }
}

/// `Ok(true)` once confirmed, `Ok(false)` while still in flight.
async fn poll_once(
    rpc: &dyn ChainRpc,
    signature: &Signature,
    last_valid_block_height: u64,
) -> Result<bool, RpcError> {
    match rpc.signature_status(signature).await? {
        Some(TxStatus::Confirmed) => Ok(true),
        Some(TxStatus::Failed(err)) => Err(RpcError::TransactionFailed(err)),
        Some(TxStatus::Processed) => Ok(false),
        None => {
            if rpc.block_height().await? > last_valid_block_height {
                Err(RpcError::BlockHeightExceeded)
            } else {
                Ok(false)
            }
        }
    }
}
