//! Clap derive structures for the `nurtura` CLI.
//!
//! Defines the complete command tree, global flags, and shared types. Only
//! depends on clap so the build script can compile it for man pages.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// nurtura -- admin CLI for the Nurtura childcare platform
#[derive(Debug, Parser)]
#[command(
    name = "nurtura",
    version,
    about = "Administer the Nurtura childcare platform from the command line",
    long_about = "Admin client for the Nurtura dashboard API.\n\n\
        Manages the staff team, review moderation, invoices, subscriptions\n\
        and platform users, and reads analytics and live chat events.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Backend profile to use
    #[arg(long, short = 'p', env = "NURTURA_PROFILE", global = true)]
    pub profile: Option<String>,

    /// API base URL (overrides profile)
    #[arg(long, short = 'a', global = true)]
    pub api_url: Option<String>,

    /// Access token (overrides env, keyring and profile)
    #[arg(long, global = true)]
    pub token: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "NURTURA_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

/// Account role as accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RoleArg {
    SuperAdmin,
    Admin,
    Manager,
    Provider,
    Parent,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage dashboard staff and invitations
    #[command(alias = "t")]
    Team(TeamArgs),

    /// Moderate provider reviews
    #[command(alias = "rev")]
    Reviews(ReviewsArgs),

    /// Manage invoices
    #[command(alias = "inv")]
    Invoices(InvoicesArgs),

    /// Manage user subscriptions and plans
    #[command(alias = "subs")]
    Subscriptions(SubscriptionsArgs),

    /// Manage platform users
    #[command(alias = "u")]
    Users(UsersArgs),

    /// Query dashboard analytics
    #[command(alias = "stats")]
    Analytics(AnalyticsArgs),

    /// Realtime chat events
    Chat(ChatArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

impl Command {
    /// Commands that talk to the backend without an access token.
    pub fn is_anonymous(&self) -> bool {
        matches!(
            self,
            Self::Team(TeamArgs {
                command: TeamCommand::Accept { .. }
            })
        )
    }
}

// ── Shared List Arguments ────────────────────────────────────────────

/// Pagination and filtering arguments shared by list commands.
#[derive(Debug, Args)]
pub struct ListArgs {
    /// Page number (1-based)
    #[arg(long, default_value = "1")]
    pub page: u32,

    /// Results per page
    #[arg(long, short = 'l', default_value = "10")]
    pub limit: u32,

    /// Free-text search
    #[arg(long, short = 's')]
    pub search: Option<String>,

    /// Filter by status
    #[arg(long)]
    pub status: Option<String>,
}

/// Date range and bucketing for analytics queries.
#[derive(Debug, Args)]
pub struct RangeArgs {
    /// Start date (YYYY-MM-DD)
    #[arg(long)]
    pub from: Option<String>,

    /// End date (YYYY-MM-DD)
    #[arg(long)]
    pub to: Option<String>,

    /// Aggregation bucket: day, week, month
    #[arg(long)]
    pub period: Option<String>,
}

// ── Team ─────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct TeamArgs {
    #[command(subcommand)]
    pub command: TeamCommand,
}

#[derive(Debug, Subcommand)]
pub enum TeamCommand {
    /// List team members
    #[command(alias = "ls")]
    List {
        #[command(flatten)]
        list: ListArgs,

        /// Filter by role
        #[arg(long, value_enum)]
        role: Option<RoleArg>,
    },

    /// Invite a new team member
    Invite {
        /// Email address to invite
        email: String,

        /// Role granted on acceptance
        #[arg(long, value_enum, default_value = "admin")]
        role: RoleArg,

        /// Display name
        #[arg(long)]
        name: Option<String>,
    },

    /// Remove a team member
    #[command(alias = "rm")]
    Remove {
        /// Member ID
        id: String,
    },

    /// Change a member's role
    Role {
        /// Member ID
        id: String,

        /// New role
        #[arg(value_enum)]
        role: RoleArg,
    },

    /// Resend a pending invitation
    Resend {
        /// Member ID
        id: String,
    },

    /// Accept an invitation and set a password (no login required)
    Accept {
        /// Invitation token from the email link
        #[arg(value_name = "INVITE_TOKEN")]
        invite_token: String,

        /// Display name
        #[arg(long)]
        name: Option<String>,
    },
}

// ── Reviews ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ReviewsArgs {
    #[command(subcommand)]
    pub command: ReviewsCommand,
}

#[derive(Debug, Subcommand)]
pub enum ReviewsCommand {
    /// List reviews
    #[command(alias = "ls")]
    List(ListArgs),

    /// Approve a review
    Approve {
        /// Review ID
        id: String,
    },

    /// Reject a review
    Reject {
        /// Review ID
        id: String,

        /// Reason shown to the author
        #[arg(long)]
        reason: Option<String>,
    },

    /// Delete a review
    #[command(alias = "rm")]
    Delete {
        /// Review ID
        id: String,
    },
}

// ── Invoices ─────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct InvoicesArgs {
    #[command(subcommand)]
    pub command: InvoicesCommand,
}

#[derive(Debug, Subcommand)]
pub enum InvoicesCommand {
    /// List invoices
    #[command(alias = "ls")]
    List {
        #[command(flatten)]
        list: ListArgs,

        #[command(flatten)]
        range: RangeArgs,
    },

    /// Show one invoice
    Show {
        /// Invoice ID
        id: String,
    },

    /// Email an invoice to the customer
    Send {
        /// Invoice ID
        id: String,
    },

    /// Void an unpaid invoice
    Void {
        /// Invoice ID
        id: String,
    },
}

// ── Subscriptions ────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SubscriptionsArgs {
    #[command(subcommand)]
    pub command: SubscriptionsCommand,
}

#[derive(Debug, Subcommand)]
pub enum SubscriptionsCommand {
    /// List user subscriptions
    #[command(alias = "ls")]
    List(ListArgs),

    /// List available plans
    Plans,

    /// Cancel a subscription
    Cancel {
        /// Subscription ID
        id: String,

        /// End access immediately instead of at period end
        #[arg(long)]
        now: bool,

        /// Cancellation reason
        #[arg(long)]
        reason: Option<String>,
    },
}

// ── Users ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct UsersArgs {
    #[command(subcommand)]
    pub command: UsersCommand,
}

#[derive(Debug, Subcommand)]
pub enum UsersCommand {
    /// List platform users
    #[command(alias = "ls")]
    List {
        #[command(flatten)]
        list: ListArgs,

        /// Filter by role
        #[arg(long, value_enum)]
        role: Option<RoleArg>,
    },

    /// Show one user
    Show {
        /// User ID
        id: String,
    },

    /// Suspend a user account
    Suspend {
        /// User ID
        id: String,
    },

    /// Reactivate a suspended user account
    Activate {
        /// User ID
        id: String,
    },
}

// ── Analytics ────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct AnalyticsArgs {
    #[command(subcommand)]
    pub command: AnalyticsCommand,
}

#[derive(Debug, Subcommand)]
pub enum AnalyticsCommand {
    /// Headline numbers
    Overview(RangeArgs),

    /// Revenue per period
    Revenue(RangeArgs),

    /// New users per period
    Growth(RangeArgs),

    /// Bookings per period
    Bookings(RangeArgs),
}

// ── Chat ─────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ChatArgs {
    #[command(subcommand)]
    pub command: ChatCommand,
}

#[derive(Debug, Subcommand)]
pub enum ChatCommand {
    /// Stream chat events until interrupted
    Listen {
        /// Only show events with this name
        #[arg(long, short = 'e')]
        event: Option<String>,

        /// Exit after this many events
        #[arg(long, short = 'n')]
        count: Option<usize>,
    },
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Interactive configuration wizard
    Init,

    /// Show the effective configuration
    Show,

    /// Store an access token for the active profile in the system keyring
    SetToken,

    /// Print the config file path
    Path,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,
}
