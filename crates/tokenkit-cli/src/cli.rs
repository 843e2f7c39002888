use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "tokenkit")]
#[command(about = "tokenkit CLI: issue and inspect credential tokens offline")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to a TOML configuration file
    #[arg(short, long, global = true, env = "TOKENKIT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true)]
    pub format: Option<OutputFormat>,
}

#[derive(Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    Table,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate a fresh AES-256 key (hex)
    Keygen,
    /// Show the per-context policy table
    Policy,
    /// Issue a token and print the secret and the record to store
    Issue(IssueArgs),
    /// Build the lookup predicate for a presented token
    Verify(VerifyArgs),
    /// Print the SHA-256 digest of a transmitted token
    Digest(DigestArgs),
}

#[derive(clap::Args)]
pub struct IssueArgs {
    /// Context tag (e.g. confirm, reset_password, change:old@example.com)
    pub context: String,
    /// Email of the owning user
    #[arg(long)]
    pub user_email: String,
    /// Id of the owning user (random if omitted)
    #[arg(long)]
    pub user_id: Option<uuid::Uuid>,
    /// Destination address (defaults to the user's email where required)
    #[arg(long)]
    pub sent_to: Option<String>,
    /// Account the token is linked to (invites)
    #[arg(long)]
    pub account: Option<uuid::Uuid>,
    /// User being impersonated (impersonate context)
    #[arg(long)]
    pub impersonate: Option<uuid::Uuid>,
}

#[derive(clap::Args)]
pub struct VerifyArgs {
    /// Token as presented by the client
    pub token: String,
    /// Context tag the token is presented for
    pub context: String,
    /// Use the shorter "is current" window instead of the validity window
    #[arg(long)]
    pub current: bool,
    /// Restrict the match to one account (invites)
    #[arg(long)]
    pub account: Option<uuid::Uuid>,
}

#[derive(clap::Args)]
pub struct DigestArgs {
    /// Token in its transmitted (URL-safe base64) form
    pub token: String,
}
