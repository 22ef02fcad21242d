// Guide submission: validate, pin documents, record the request on chain.
//
// Progress is published on a watch channel as
// Idle -> Uploading -> Submitting -> Success | Error, and a terminal phase
// falls back to Idle after a short delay.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chaperone_core::{DocumentPresence, GuideDetails, SubmitVerificationArgs, ValidationError};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::ClientError;
use crate::program::{ProgramClient, SubmittedGuide};
use crate::upload::{ContentStore, UploadError};

pub const RESET_DELAY: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionPhase {
    Idle,
    /// Coarse percentage: 0, 10, 100
    Uploading { progress: u8 },
    Submitting,
    Success(SubmittedGuide),
    Error(String),
}

impl SubmissionPhase {
    pub fn is_in_progress(&self) -> bool {
        matches!(self, Self::Uploading { .. } | Self::Submitting)
    }
}

/// Publishes the phase of the current submission.
#[derive(Clone)]
pub struct SubmissionTracker {
    tx: Arc<watch::Sender<SubmissionPhase>>,
    reset_after: Duration,
}

impl Default for SubmissionTracker {
    fn default() -> Self {
        Self::new(RESET_DELAY)
    }
}

impl SubmissionTracker {
    pub fn new(reset_after: Duration) -> Self {
        let (tx, _) = watch::channel(SubmissionPhase::Idle);
        Self {
            tx: Arc::new(tx),
            reset_after,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SubmissionPhase> {
        self.tx.subscribe()
    }

    pub fn phase(&self) -> SubmissionPhase {
        self.tx.borrow().clone()
    }

    /// Claims the tracker for a new submission.
    pub fn begin(&self) -> Result<(), ClientError> {
        let mut busy = false;
        self.tx.send_if_modified(|phase| {
            if phase.is_in_progress() {
                busy = true;
                return false;
            }
            *phase = SubmissionPhase::Uploading { progress: 0 };
            true
        });
        if busy { Err(ClientError::Busy) } else { Ok(()) }
    }

    pub fn set(&self, phase: SubmissionPhase) {
        debug!(?phase, "submission phase");
        self.tx.send_replace(phase);
    }

    /// Publishes a terminal phase and schedules the return to Idle. A newer
    /// phase published in the meantime is left alone.
    pub fn finish(&self, terminal: SubmissionPhase) {
        self.set(terminal.clone());
        let tx = Arc::clone(&self.tx);
        let delay = self.reset_after;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            tx.send_if_modified(|phase| {
                if *phase == terminal {
                    *phase = SubmissionPhase::Idle;
                    true
                } else {
                    false
                }
            });
        });
    }
}

/// A document picked for upload.
#[derive(Debug, Clone)]
pub struct Document {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl Document {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    pub async fn read(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());
        Ok(Self { file_name, bytes })
    }
}

#[derive(Debug, Clone)]
pub struct GuideSubmission {
    pub details: GuideDetails,
    pub license: Option<Document>,
    pub photo_id: Option<Document>,
    pub attachment: Option<Document>,
    pub offer_letter: Option<Document>,
}

impl GuideSubmission {
    pub fn presence(&self) -> DocumentPresence {
        DocumentPresence {
            license: self.license.is_some(),
            photo_id: self.photo_id.is_some(),
            attachment: self.attachment.is_some(),
            offer_letter: self.offer_letter.is_some(),
        }
    }
}

pub struct SubmissionWorkflow {
    program: Arc<ProgramClient>,
    store: Arc<dyn ContentStore>,
    tracker: SubmissionTracker,
}

impl SubmissionWorkflow {
    pub fn new(
        program: Arc<ProgramClient>,
        store: Arc<dyn ContentStore>,
        tracker: SubmissionTracker,
    ) -> Self {
        Self {
            program,
            store,
            tracker,
        }
    }

    pub fn tracker(&self) -> &SubmissionTracker {
        &self.tracker
    }

    /// Runs one submission end to end.
    ///
    /// Validation and the wallet check happen before anything is uploaded; a
    /// failed upload means nothing is written on chain.
    pub async fn run(&self, submission: GuideSubmission) -> Result<SubmittedGuide, ClientError> {
        self.program.session().signer()?;
        submission.details.validate(submission.presence())?;
        self.tracker.begin()?;

        match self.upload_and_submit(submission).await {
            Ok(submitted) => {
                self.tracker.finish(SubmissionPhase::Success(submitted.clone()));
                Ok(submitted)
            }
            Err(e) => {
                warn!(error = %e, "submission failed");
                self.tracker.finish(SubmissionPhase::Error(e.to_string()));
                Err(e)
            }
        }
    }

    async fn upload_and_submit(
        &self,
        submission: GuideSubmission,
    ) -> Result<SubmittedGuide, ClientError> {
        let GuideSubmission {
            details,
            license,
            photo_id,
            attachment,
            offer_letter,
        } = submission;
        let details = details.normalized();
        let license = license.ok_or(ValidationError::MissingDocument("license"))?;
        let photo_id = photo_id.ok_or(ValidationError::MissingDocument("photo_id"))?;
        let offer_letter = match details.agency_name {
            Some(_) => offer_letter,
            None => None,
        };

        self.tracker.set(SubmissionPhase::Uploading { progress: 10 });
        let (license_uri, photo_id_uri, attachment_uri, offer_letter_uri) = tokio::try_join!(
            self.upload(license),
            self.upload(photo_id),
            self.upload_optional(attachment),
            self.upload_optional(offer_letter),
        )?;
        self.tracker.set(SubmissionPhase::Uploading { progress: 100 });

        self.tracker.set(SubmissionPhase::Submitting);
        let args = SubmitVerificationArgs {
            ic_number: details.ic_number,
            name: details.name,
            email: details.email,
            phone: details.phone,
            wallet_address: details.wallet_address,
            license_uri,
            photo_id_uri,
            attachment_uri,
            affiliation_type: details.affiliation,
            agency_name: details.agency_name,
            offer_letter_uri,
        };
        let submitted = self.program.submit_verification(args).await?;
        info!(id = %submitted.id, "guide submission recorded");
        Ok(submitted)
    }

    async fn upload(&self, document: Document) -> Result<String, UploadError> {
        self.store.upload_file(&document.file_name, document.bytes).await
    }

    async fn upload_optional(
        &self,
        document: Option<Document>,
    ) -> Result<Option<String>, UploadError> {
        match document {
            Some(doc) => self.upload(doc).await.map(Some),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockRpc, MockStore};
    use crate::program::tests::client_with;
    use crate::session::Session;
    use chaperone_core::AffiliationType;
    use solana_sdk::signature::{Keypair, Signer};

    struct Fixture {
        rpc: Arc<MockRpc>,
        store: Arc<MockStore>,
        workflow: SubmissionWorkflow,
        wallet: String,
    }

    fn fixture(session: Session) -> Fixture {
        let rpc = Arc::new(MockRpc::new());
        let store = Arc::new(MockStore::new());
        let wallet = session
            .public_key()
            .map(|k| k.to_string())
            .unwrap_or_else(|| "GsjREUyUEkFRAhoSj1q9Tg4tPGCyoEAoTyFiZjqxKD92".into());
        let program = Arc::new(client_with(rpc.clone(), session, 0));
        let tracker = SubmissionTracker::default();
        let workflow = SubmissionWorkflow::new(program, store.clone(), tracker);
        Fixture {
            rpc,
            store,
            workflow,
            wallet,
        }
    }

    fn signed() -> Fixture {
        fixture(Session::from_keypair(Keypair::new()))
    }

    fn submission(wallet: &str, affiliation: AffiliationType) -> GuideSubmission {
        GuideSubmission {
            details: GuideDetails {
                ic_number: "900101-14-5566".into(),
                name: "Aisyah Rahman".into(),
                email: "aisyah@example.com".into(),
                phone: "+60123456789".into(),
                wallet_address: wallet.to_string(),
                affiliation,
                agency_name: None,
            },
            license: Some(Document::new("license.pdf", vec![1])),
            photo_id: Some(Document::new("photo.jpg", vec![2])),
            attachment: None,
            offer_letter: None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn successful_submission_returns_to_idle() {
        let f = signed();
        let mut sub = submission(&f.wallet, AffiliationType::Agency);
        sub.details.agency_name = Some("Straits Heritage Walks".into());
        sub.offer_letter = Some(Document::new("offer.pdf", vec![3]));

        let submitted = f.workflow.run(sub).await.unwrap();

        assert_eq!(submitted.id.index, 0);
        assert_eq!(f.store.uploads(), vec!["license.pdf", "offer.pdf", "photo.jpg"]);
        assert_eq!(f.rpc.sent().len(), 1);
        assert_eq!(f.workflow.tracker().phase(), SubmissionPhase::Success(submitted));

        tokio::time::sleep(RESET_DELAY + Duration::from_millis(10)).await;
        assert_eq!(f.workflow.tracker().phase(), SubmissionPhase::Idle);
    }

    #[tokio::test]
    async fn failed_upload_writes_nothing_on_chain() {
        let f = signed();
        f.store.fail_on("license.pdf");

        let err = f
            .workflow
            .run(submission(&f.wallet, AffiliationType::Freelance))
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::Upload(UploadError::Rejected { status: 403, .. })));
        assert_eq!(f.rpc.send_attempts(), 0);
        assert!(matches!(f.workflow.tracker().phase(), SubmissionPhase::Error(_)));
    }

    #[tokio::test]
    async fn incomplete_agency_request_is_rejected_before_upload() {
        let f = signed();
        let mut sub = submission(&f.wallet, AffiliationType::Agency);
        sub.offer_letter = Some(Document::new("offer.pdf", vec![3]));

        let err = f.workflow.run(sub).await.unwrap_err();

        assert!(matches!(err, ClientError::Validation(ValidationError::MissingAgencyName)));
        assert!(f.store.uploads().is_empty());
        assert_eq!(f.workflow.tracker().phase(), SubmissionPhase::Idle);
    }

    #[tokio::test]
    async fn freelance_request_drops_agency_documents() {
        let f = signed();
        let mut sub = submission(&f.wallet, AffiliationType::Freelance);
        sub.details.agency_name = Some("Ignored Agency".into());
        sub.offer_letter = Some(Document::new("offer.pdf", vec![3]));
        sub.attachment = Some(Document::new("extra.pdf", vec![4]));

        f.workflow.run(sub).await.unwrap();

        assert_eq!(f.store.uploads(), vec!["extra.pdf", "license.pdf", "photo.jpg"]);
    }

    #[tokio::test]
    async fn disconnected_wallet_uploads_nothing() {
        let f = fixture(Session::read_only());
        let err = f
            .workflow
            .run(submission(&f.wallet, AffiliationType::Freelance))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::NoSigner));
        assert!(f.store.uploads().is_empty());
    }

    #[tokio::test]
    async fn tracker_refuses_overlapping_submissions() {
        let tracker = SubmissionTracker::default();
        let mut rx = tracker.subscribe();
        tracker.begin().unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), SubmissionPhase::Uploading { progress: 0 });
        assert!(matches!(tracker.begin(), Err(ClientError::Busy)));

        tracker.finish(SubmissionPhase::Error("boom".into()));
        tracker.begin().unwrap();
    }

    #[test]
    fn presence_reflects_supplied_documents() {
        let keypair = Keypair::new();
        let sub = submission(&keypair.pubkey().to_string(), AffiliationType::Freelance);
        let presence = sub.presence();
        assert!(presence.license && presence.photo_id);
        assert!(!presence.attachment && !presence.offer_letter);
    }
}
