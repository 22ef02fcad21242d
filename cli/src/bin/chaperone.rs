use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow, bail};
use chaperone_client::config::{
    DEFAULT_GATEWAY_URL, DEFAULT_MINT_LEDGER, DEFAULT_PINATA_API_URL, DEFAULT_RPC_URL,
    DEFAULT_WEBSITE_URL,
};
use chaperone_client::{
    AdminReview, ClientError, Config, Document, GuideSubmission, HttpRpc, MintLedger, PinataClient,
    ProgramClient, Session, SubmissionPhase, SubmissionTracker, SubmissionWorkflow,
    VerificationMinter,
};
use chaperone_core::{
    AffiliationType, DEFAULT_ADMIN, DEFAULT_PROGRAM_ID, GuideDetails, GuideId, GuideRecord,
    VerificationStatus,
};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use qrcode::QrCode;
use qrcode::render::unicode::Dense1x2;
use solana_sdk::pubkey::Pubkey;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// ChaperoneMe CLI: tour guide verification on Solana
///
/// Guides submit identity documents (pinned to IPFS) and a verification
/// request recorded by the ChaperoneMe program. The admin wallet reviews
/// requests and issues a verification token to approved guides.
///
/// Workflow:
///   1. chaperone -k admin.json initialize        (once per deployment)
///   2. chaperone -k guide.json submit ...         (guide)
///   3. chaperone -k admin.json verify approve <id>
///   4. chaperone -k admin.json verify mint <id>
///   5. chaperone guides / guide <id> / stamp <id>
#[derive(Parser)]
#[command(name = "chaperone", version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Solana JSON-RPC endpoint
    #[arg(long, short = 'u', env = "CHAPERONE_RPC_URL", default_value = DEFAULT_RPC_URL)]
    rpc_url: String,

    /// Verification program id (base58)
    #[arg(long, env = "CHAPERONE_PROGRAM_ID", default_value_t = DEFAULT_PROGRAM_ID)]
    program_id: Pubkey,

    /// Wallet allowed to initialize, review and mint (base58)
    #[arg(long, env = "CHAPERONE_ADMIN", default_value_t = DEFAULT_ADMIN)]
    admin: Pubkey,

    /// Solana CLI keypair file to sign with; read-only without it
    #[arg(long, short = 'k', env = "CHAPERONE_KEYPAIR")]
    keypair: Option<PathBuf>,

    /// Pinata API token, needed to upload documents and metadata
    #[arg(long, env = "PINATA_JWT", hide_env_values = true)]
    pinata_jwt: Option<String>,

    /// Pinata API base URL
    #[arg(long, env = "PINATA_API_URL", default_value = DEFAULT_PINATA_API_URL)]
    pinata_api_url: String,

    /// IPFS gateway used to build document URIs
    #[arg(long, env = "CHAPERONE_GATEWAY_URL", default_value = DEFAULT_GATEWAY_URL)]
    gateway_url: String,

    /// Public site hosting guide profile pages
    #[arg(long, env = "CHAPERONE_WEBSITE_URL", default_value = DEFAULT_WEBSITE_URL)]
    website_url: String,

    /// Local record of issued verification tokens
    #[arg(long, env = "CHAPERONE_MINT_LEDGER", default_value = DEFAULT_MINT_LEDGER)]
    mint_ledger: PathBuf,

    /// More log output (-v info, -vv debug); RUST_LOG overrides
    #[arg(long, short = 'v', action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show program, RPC endpoint and admin account status
    Status,

    /// One-time bootstrap of the admin account (admin wallet only)
    Initialize,

    /// Submit a verification request with your documents
    Submit {
        /// IC / passport number
        #[arg(long)]
        ic_number: String,
        /// Full name
        #[arg(long, short = 'n')]
        name: String,
        #[arg(long, short = 'e')]
        email: String,
        #[arg(long)]
        phone: String,
        /// Wallet receiving the verification token (defaults to the signer)
        #[arg(long, short = 'w')]
        wallet: Option<String>,
        #[arg(long, short = 'a', value_enum, default_value_t = AffiliationArg::Freelance)]
        affiliation: AffiliationArg,
        /// Agency name (agency guides only)
        #[arg(long)]
        agency_name: Option<String>,
        /// Tour guide license document
        #[arg(long)]
        license: Option<PathBuf>,
        /// Photo ID document
        #[arg(long)]
        photo_id: Option<PathBuf>,
        /// Optional supporting document
        #[arg(long)]
        attachment: Option<PathBuf>,
        /// Agency offer letter (agency guides only)
        #[arg(long)]
        offer_letter: Option<PathBuf>,
    },

    /// List verified guides
    Guides,

    /// Show one guide by id (<authority>-<index>)
    Guide { id: GuideId },

    /// Verified guide records held by a wallet
    Portfolio {
        /// Wallet to look up (defaults to the signer)
        #[arg(long, short = 'w')]
        wallet: Option<Pubkey>,
    },

    /// Admin review of submissions
    Verify {
        #[command(subcommand)]
        action: VerifyAction,
    },

    /// Print a guide's license stamp card
    Stamp { id: GuideId },

    /// Generate shell completions
    Completions {
        /// Shell to generate for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum VerifyAction {
    /// List submissions, newest first
    List {
        /// Only pending submissions
        #[arg(long)]
        pending: bool,
    },
    /// Show a submission with its documents
    Show { id: GuideId },
    /// Approve a pending submission
    Approve { id: GuideId },
    /// Reject a pending submission
    Reject { id: GuideId },
    /// Issue the verification token of an approved guide
    Mint { id: GuideId },
}

#[derive(Clone, Copy, ValueEnum)]
enum AffiliationArg {
    Freelance,
    Agency,
}

impl From<AffiliationArg> for AffiliationType {
    fn from(arg: AffiliationArg) -> Self {
        match arg {
            AffiliationArg::Freelance => AffiliationType::Freelance,
            AffiliationArg::Agency => AffiliationType::Agency,
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

impl Cli {
    fn config(&self) -> Config {
        Config {
            rpc_url: self.rpc_url.clone(),
            program_id: self.program_id,
            admin: self.admin,
            pinata_jwt: self.pinata_jwt.clone(),
            pinata_api_url: self.pinata_api_url.clone(),
            gateway_url: self.gateway_url.clone(),
            website_url: self.website_url.clone(),
            mint_ledger_path: self.mint_ledger.clone(),
        }
    }

    fn session(&self) -> Result<Session> {
        match &self.keypair {
            Some(path) => Ok(Session::from_keypair_file(path)?),
            None => Ok(Session::read_only()),
        }
    }
}

/// Exits early with a hint when a command needs a signer.
fn require_wallet(session: &Session) -> Result<Pubkey> {
    match session.public_key() {
        Some(key) => Ok(key),
        None => {
            eprintln!(
                "🔌 Connect a wallet first: pass --keypair <file> or set CHAPERONE_KEYPAIR"
            );
            bail!(ClientError::NoSigner)
        }
    }
}

/// The cluster could not be read, as opposed to an answer saying "not found".
fn is_degraded(err: &ClientError) -> bool {
    matches!(err, ClientError::Rpc(_))
}

/// Read failures are reported as such, never papered over.
fn degraded(err: ClientError) -> anyhow::Error {
    if is_degraded(&err) {
        println!("⚠️  Directory unavailable (degraded)");
    }
    anyhow::Error::new(err)
}

/// The profile URL as a scannable terminal QR code.
fn stamp_qr(url: &str) -> Result<String> {
    let code = QrCode::new(url.as_bytes())
        .map_err(|e| anyhow!("cannot encode '{}' as a QR code: {}", url, e))?;
    Ok(code.render::<Dense1x2>().build())
}

async fn read_document(path: Option<PathBuf>) -> Result<Option<Document>> {
    match path {
        Some(path) => {
            let doc = Document::read(&path)
                .await
                .with_context(|| format!("cannot read document '{}'", path.display()))?;
            Ok(Some(doc))
        }
        None => Ok(None),
    }
}

fn print_signature(label: &str, signature: &impl std::fmt::Display) {
    println!("📤 {} confirmed", label);
    println!("   signature: {}", signature);
}

fn print_summary(guide: &GuideRecord) {
    let account = &guide.account;
    let agency = account.agency_name.as_deref().unwrap_or("-");
    println!(
        "  {:<10} {:<30} {:<10} {:<24} {}",
        account.status,
        account.name,
        account.affiliation_type,
        agency,
        guide.id()
    );
}

fn print_guide(guide: &GuideRecord) {
    let account = &guide.account;
    println!("  Id:            {}", guide.id());
    println!("  Address:       {}", guide.address);
    println!("  Name:          {}", account.name);
    println!("  Status:        {}", account.status);
    println!("  Affiliation:   {}", account.affiliation_type);
    if let Some(agency) = &account.agency_name {
        println!("  Agency:        {}", agency);
    }
    println!("  IC number:     {}", account.ic_number);
    println!("  Email:         {}", account.email);
    println!("  Phone:         {}", account.phone);
    println!("  Wallet:        {}", account.wallet_address);
    println!("  License:       {}", account.license_uri);
    println!("  Photo ID:      {}", account.photo_id_uri);
    if let Some(uri) = &account.attachment_uri {
        println!("  Attachment:    {}", uri);
    }
    if let Some(uri) = &account.offer_letter_uri {
        println!("  Offer letter:  {}", uri);
    }
    if let Some(at) = account.approved_at {
        println!("  Approved at:   {} (unix)", at);
    }
}

fn print_mint(ledger: &MintLedger, id: &GuideId) {
    if let Some(record) = ledger.get(id) {
        println!("  Token mint:    {}", record.mint);
        println!("  Metadata:      {}", record.metadata_uri);
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("❌ {e:#}");
        if let Some(client_err) = e.downcast_ref::<ClientError>() {
            for line in client_err.logs() {
                eprintln!("   {}", line);
            }
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = cli.config();
    let session = cli.session()?;
    debug!(
        rpc = %config.rpc_url,
        program = %config.program_id,
        signer = ?session.public_key(),
        "client configured"
    );
    let rpc = Arc::new(HttpRpc::new(config.rpc_url.clone()));
    let program = ProgramClient::new(rpc, session, config.program_id);
    let store = Arc::new(PinataClient::new(
        config.pinata_api_url.clone(),
        config.gateway_url.clone(),
        config.pinata_jwt.clone(),
    ));

    match cli.command {
        // ── Status ──────────────────────────────────────────────────────
        Commands::Status => {
            println!("📋 ChaperoneMe Program Status");
            println!("   RPC URL:    {}", config.rpc_url);
            println!("   Program ID: {}", config.program_id);
            println!("   Admin:      {}", config.admin);
            println!("   Admin PDA:  {}", program.admin_address());
            match program.session().public_key() {
                Some(key) => println!("   Wallet:     {}", key),
                None => println!("   Wallet:     not connected (read-only)"),
            }
            match program.fetch_admin().await {
                Ok(admin) => {
                    println!("   Initialized: yes ({} submission(s))", admin.guides_count);
                }
                Err(ClientError::NotInitialized(_)) => println!("   Initialized: no"),
                Err(e) => return Err(degraded(e)),
            }
        }

        // ── Initialize ──────────────────────────────────────────────────
        Commands::Initialize => {
            require_wallet(program.session())?;
            let review = AdminReview::new(program, config.admin);
            println!("🚀 Initializing admin account {}", review.program().admin_address());
            let signature = review.initialize().await?;
            print_signature("Initialize", &signature);
            println!("\n✅ Program initialized");
        }

        // ── Submit ──────────────────────────────────────────────────────
        Commands::Submit {
            ic_number,
            name,
            email,
            phone,
            wallet,
            affiliation,
            agency_name,
            license,
            photo_id,
            attachment,
            offer_letter,
        } => {
            let signer = require_wallet(program.session())?;
            let submission = GuideSubmission {
                details: GuideDetails {
                    ic_number,
                    name,
                    email,
                    phone,
                    wallet_address: wallet.unwrap_or_else(|| signer.to_string()),
                    affiliation: affiliation.into(),
                    agency_name,
                },
                license: read_document(license).await?,
                photo_id: read_document(photo_id).await?,
                attachment: read_document(attachment).await?,
                offer_letter: read_document(offer_letter).await?,
            };

            let tracker = SubmissionTracker::default();
            let mut phases = tracker.subscribe();
            let progress = tokio::spawn(async move {
                while phases.changed().await.is_ok() {
                    let phase = phases.borrow_and_update().clone();
                    match phase {
                        SubmissionPhase::Uploading { progress } => {
                            println!("📎 Uploading documents... {}%", progress)
                        }
                        SubmissionPhase::Submitting => {
                            println!("📝 Submitting verification request...")
                        }
                        _ => {}
                    }
                }
            });

            let workflow = SubmissionWorkflow::new(Arc::new(program), store, tracker);
            let result = workflow.run(submission).await;
            // Let the progress task drain the last phase change before exiting.
            tokio::task::yield_now().await;
            progress.abort();

            let submitted = result?;
            println!("\n✅ Verification request submitted");
            println!("   Guide id:  {}", submitted.id);
            println!("   Account:   {}", submitted.address);
            println!("   Signature: {}", submitted.signature);
            println!("   Status:    {}", VerificationStatus::Pending);
        }

        // ── Guides ──────────────────────────────────────────────────────
        Commands::Guides => {
            let guides = program.approved_guides().await.map_err(degraded)?;
            if guides.is_empty() {
                println!("No verified guides yet.");
            } else {
                println!("🧭 {} verified guide(s)", guides.len());
                for guide in &guides {
                    print_summary(guide);
                }
            }
        }

        // ── Guide ───────────────────────────────────────────────────────
        Commands::Guide { id } => {
            let guide = program.fetch_guide_by_id(&id).await.map_err(degraded)?;
            print_guide(&guide);
            print_mint(&MintLedger::load(config.mint_ledger_path.clone())?, &id);
        }

        // ── Portfolio ───────────────────────────────────────────────────
        Commands::Portfolio { wallet } => {
            let wallet = match wallet {
                Some(wallet) => wallet,
                None => require_wallet(program.session())?,
            };
            let guides = program.portfolio(&wallet).await.map_err(degraded)?;
            println!("💼 Portfolio of {}", wallet);
            if guides.is_empty() {
                println!("   No verified guide records for this wallet.");
            }
            for guide in &guides {
                println!();
                print_guide(guide);
                println!("  Profile:       {}", config.profile_url(&guide.id()));
            }
        }

        // ── Verify ──────────────────────────────────────────────────────
        Commands::Verify { action } => {
            let review = AdminReview::new(program, config.admin);
            match action {
                VerifyAction::List { pending } => {
                    let listed = match pending {
                        true => review.pending().await,
                        false => review.queue().await,
                    };
                    let guides = listed.map_err(degraded)?;
                    println!("📋 {} submission(s)", guides.len());
                    for guide in &guides {
                        print_summary(guide);
                    }
                }
                VerifyAction::Show { id } => {
                    let guide = review.detail(&id).await.map_err(degraded)?;
                    print_guide(&guide);
                    print_mint(&MintLedger::load(config.mint_ledger_path.clone())?, &id);
                }
                VerifyAction::Approve { id } => {
                    require_wallet(review.program().session())?;
                    println!("✔️  Approving {}", id);
                    let signature = review.approve(&id).await?;
                    print_signature("Approve", &signature);
                    println!("\n✅ Guide approved");
                }
                VerifyAction::Reject { id } => {
                    require_wallet(review.program().session())?;
                    println!("✖️  Rejecting {}", id);
                    let signature = review.reject(&id).await?;
                    print_signature("Reject", &signature);
                    println!("\n✅ Guide rejected");
                }
                VerifyAction::Mint { id } => {
                    require_wallet(review.program().session())?;
                    let minter = VerificationMinter::new(store, &config);
                    println!("🪙 Minting verification token for {}", id);
                    let record = review.mint(&id, &minter).await?;
                    print_signature("Mint", &record.signature);
                    println!("\n✅ Verification token issued");
                    println!("   Mint:     {}", record.mint);
                    println!("   Owner:    {}", record.owner);
                    println!("   Metadata: {}", record.metadata_uri);
                }
            }
        }

        // ── Stamp ───────────────────────────────────────────────────────
        Commands::Stamp { id } => {
            let guide = program.fetch_guide_by_id(&id).await.map_err(degraded)?;
            let account = &guide.account;
            println!("╭──────────────────────────────────────────────╮");
            println!("│  {:<44}│", account.name);
            println!("│  {:<44}│", "ChaperoneMe • Licensed Tour Guide");
            println!("│  {:<44}│", format!("Status: {}", account.status));
            println!("╰──────────────────────────────────────────────╯");
            let profile = config.profile_url(&id);
            println!("   Photo:  {}", account.photo_id_uri);
            println!("   Verify: {}", profile);
            println!();
            println!("{}", stamp_qr(&profile)?);
            if account.status != VerificationStatus::Approved {
                println!("⚠️  This guide is not verified");
            }
        }

        // ── Completions ─────────────────────────────────────────────────
        Commands::Completions { shell } => {
            generate(shell, &mut Cli::command(), "chaperone", &mut std::io::stdout());
        }
    }

    Ok(())
}
