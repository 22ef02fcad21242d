// chaperone_client: async client for the ChaperoneMe guide-verification
// program: JSON-RPC transport, document pinning, the submission workflow,
// admin review and verification-token minting.

pub mod config;
pub mod error;
pub mod ledger;
pub mod mint;
pub mod program;
pub mod review;
pub mod rpc;
pub mod session;
pub mod submit;
pub mod upload;
pub mod workflow;

#[cfg(test)]
pub(crate) mod mock;

pub use config::Config;
pub use error::ClientError;
pub use ledger::{MintLedger, MintRecord};
pub use mint::VerificationMinter;
pub use program::{ProgramClient, SubmittedGuide};
pub use review::AdminReview;
pub use rpc::{ChainRpc, HttpRpc, RpcError, TxStatus};
pub use session::Session;
pub use submit::{RetryPolicy, send_with_retry};
pub use upload::{ContentStore, PinataClient, UploadError};
pub use workflow::{
    Document, GuideSubmission, SubmissionPhase, SubmissionTracker, SubmissionWorkflow,
};
