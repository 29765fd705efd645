//! Command dispatch: bridges CLI args -> dashboard hooks -> output formatting.

pub mod analytics;
pub mod chat;
pub mod config_cmd;
pub mod invoices;
pub mod reviews;
pub mod subscriptions;
pub mod team;
pub mod users;
pub mod util;

use nurtura_core::DashboardContext;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a backend-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    ctx: &DashboardContext,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Team(args) => team::handle(ctx, args, global).await,
        Command::Reviews(args) => reviews::handle(ctx, args, global).await,
        Command::Invoices(args) => invoices::handle(ctx, args, global).await,
        Command::Subscriptions(args) => subscriptions::handle(ctx, args, global).await,
        Command::Users(args) => users::handle(ctx, args, global).await,
        Command::Analytics(args) => analytics::handle(ctx, args, global).await,
        Command::Chat(args) => chat::handle(ctx, args, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => unreachable!(),
    }
}
