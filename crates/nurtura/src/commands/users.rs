//! Platform user command handlers.

use tabled::Tabled;

use nurtura_core::{AdminUser, DashboardContext, Role, UpdateUserStatus, UserStatus};

use crate::cli::{GlobalOpts, UsersArgs, UsersCommand};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct UserRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Email")]
    email: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Role")]
    role: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Joined")]
    joined: String,
}

impl From<&AdminUser> for UserRow {
    fn from(u: &AdminUser) -> Self {
        Self {
            id: u.id.clone(),
            email: u.email.clone(),
            name: util::opt(u.name.as_deref()),
            role: u.role.to_string(),
            status: u.status.to_string(),
            joined: util::date(u.created_at.as_ref()),
        }
    }
}

fn detail(u: &AdminUser) -> String {
    output::detail_lines(&[
        ("ID", u.id.clone()),
        ("Email", u.email.clone()),
        ("Name", u.name.clone().unwrap_or_default()),
        ("Role", u.role.to_string()),
        ("Status", u.status.to_string()),
        ("Joined", u.created_at.map(|d| d.to_rfc3339()).unwrap_or_default()),
    ])
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    ctx: &DashboardContext,
    args: UsersArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let users = ctx.users();
    match args.command {
        UsersCommand::List { list, role } => {
            let mut params = util::list_params(&list);
            if let Some(role) = role {
                params = params.with_role(Role::from(role));
            }
            let page = util::with_spinner(global, "Loading users", users.list(&params)).await?;
            let out = output::render_page(
                &global.output,
                &page,
                |u| UserRow::from(u),
                |u| u.id.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        UsersCommand::Show { id } => {
            let user = util::with_spinner(global, "Loading user", users.detail(&id))
                .await
                .map_err(|e| CliError::from(e).or_not_found("user", &id, "users list"))?;
            let out = output::render_single(&global.output, &*user, detail, |u| u.id.clone())?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        UsersCommand::Suspend { id } => {
            let prompt = format!("Suspend user '{id}'? They will be signed out everywhere.");
            if !util::confirm(&prompt, "users suspend", global.yes)? {
                return Ok(());
            }
            set_status(ctx, id, UserStatus::Suspended).await
        }

        UsersCommand::Activate { id } => set_status(ctx, id, UserStatus::Active).await,
    }
}

async fn set_status(ctx: &DashboardContext, id: String, status: UserStatus) -> Result<(), CliError> {
    ctx.users()
        .update_status()
        .mutate(UpdateUserStatus {
            id: id.clone(),
            status,
        })
        .await
        .map_err(|e| CliError::from(e).or_not_found("user", &id, "users list"))?;
    Ok(())
}
