//! Team command handlers.

use tabled::Tabled;

use nurtura_core::{
    CompleteInvite, DashboardContext, InviteMember, Role, TeamMember, UpdateMemberRole,
};

use crate::cli::{GlobalOpts, TeamArgs, TeamCommand};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct MemberRow {
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
    #[tabled(rename = "Last Active")]
    last_active: String,
}

impl From<&TeamMember> for MemberRow {
    fn from(m: &TeamMember) -> Self {
        Self {
            id: m.id.clone(),
            email: m.email.clone(),
            name: util::opt(m.name.as_deref()),
            role: m.role.to_string(),
            status: m.status.to_string(),
            last_active: util::date(m.last_active_at.as_ref()),
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    ctx: &DashboardContext,
    args: TeamArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let team = ctx.team();
    match args.command {
        TeamCommand::List { list, role } => {
            let mut params = util::list_params(&list);
            if let Some(role) = role {
                params = params.with_role(Role::from(role));
            }
            let page = util::with_spinner(global, "Loading team", team.list(&params)).await?;
            let out = output::render_page(
                &global.output,
                &page,
                |m| MemberRow::from(m),
                |m| m.id.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        TeamCommand::Invite { email, role, name } => {
            team.invite()
                .mutate(InviteMember {
                    email,
                    role: role.into(),
                    name,
                })
                .await?;
            Ok(())
        }

        TeamCommand::Remove { id } => {
            let prompt = format!("Remove team member '{id}'?");
            if !util::confirm(&prompt, "team remove", global.yes)? {
                return Ok(());
            }
            team.remove()
                .mutate(id.clone())
                .await
                .map_err(|e| CliError::from(e).or_not_found("team member", &id, "team list"))?;
            Ok(())
        }

        TeamCommand::Role { id, role } => {
            team.update_role()
                .mutate(UpdateMemberRole {
                    id: id.clone(),
                    role: role.into(),
                })
                .await
                .map_err(|e| CliError::from(e).or_not_found("team member", &id, "team list"))?;
            Ok(())
        }

        TeamCommand::Resend { id } => {
            team.resend_invite()
                .mutate(id.clone())
                .await
                .map_err(|e| CliError::from(e).or_not_found("invitation", &id, "team list"))?;
            Ok(())
        }

        TeamCommand::Accept { invite_token, name } => {
            let password = rpassword::prompt_password("Choose a password: ")?;
            let confirm = rpassword::prompt_password("Repeat password: ")?;
            if password.is_empty() {
                return Err(CliError::Validation {
                    field: "password".into(),
                    reason: "password cannot be empty".into(),
                });
            }
            if password != confirm {
                return Err(CliError::Validation {
                    field: "password".into(),
                    reason: "passwords do not match".into(),
                });
            }
            team.complete_invite()
                .mutate(CompleteInvite {
                    token: invite_token,
                    password,
                    name,
                })
                .await?;
            Ok(())
        }
    }
}
