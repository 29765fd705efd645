//! Subscription command handlers.

use tabled::Tabled;

use nurtura_core::{CancelSubscription, DashboardContext, SubscriptionPlan, UserSubscription};

use crate::cli::{GlobalOpts, SubscriptionsArgs, SubscriptionsCommand};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct SubscriptionRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "User")]
    user: String,
    #[tabled(rename = "Plan")]
    plan: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Period End")]
    period_end: String,
    #[tabled(rename = "Cancels")]
    cancels: String,
}

impl From<&UserSubscription> for SubscriptionRow {
    fn from(s: &UserSubscription) -> Self {
        Self {
            id: s.id.clone(),
            user: util::opt(s.user_email.as_deref().or(s.user_id.as_deref())),
            plan: util::opt(s.plan_name.as_deref().or(s.plan_id.as_deref())),
            status: s.status.to_string(),
            period_end: util::date(s.current_period_end.as_ref()),
            cancels: if s.cancel_at_period_end { "yes" } else { "" }.into(),
        }
    }
}

#[derive(Tabled)]
struct PlanRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Price")]
    price: String,
    #[tabled(rename = "Interval")]
    interval: String,
    #[tabled(rename = "Features")]
    features: String,
}

impl From<&SubscriptionPlan> for PlanRow {
    fn from(p: &SubscriptionPlan) -> Self {
        Self {
            id: p.id.clone(),
            name: p.name.clone(),
            price: util::money(p.price, p.currency.as_deref().unwrap_or("USD")),
            interval: util::opt(p.interval.as_deref()),
            features: p.features.len().to_string(),
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    ctx: &DashboardContext,
    args: SubscriptionsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let subscriptions = ctx.subscriptions();
    match args.command {
        SubscriptionsCommand::List(list) => {
            let params = util::list_params(&list);
            let page =
                util::with_spinner(global, "Loading subscriptions", subscriptions.list(&params))
                    .await?;
            let out = output::render_page(
                &global.output,
                &page,
                |s| SubscriptionRow::from(s),
                |s| s.id.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        SubscriptionsCommand::Plans => {
            let plans = util::with_spinner(global, "Loading plans", subscriptions.plans()).await?;
            let out = output::render_list(
                &global.output,
                plans.as_slice(),
                |p| PlanRow::from(p),
                |p| p.id.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        SubscriptionsCommand::Cancel { id, now, reason } => {
            let prompt = if now {
                format!("Cancel subscription '{id}' immediately?")
            } else {
                format!("Cancel subscription '{id}' at the end of the current period?")
            };
            if !util::confirm(&prompt, "subscriptions cancel", global.yes)? {
                return Ok(());
            }
            subscriptions
                .cancel()
                .mutate(CancelSubscription {
                    id: id.clone(),
                    at_period_end: !now,
                    reason,
                })
                .await
                .map_err(|e| {
                    CliError::from(e).or_not_found("subscription", &id, "subscriptions list")
                })?;
            Ok(())
        }
    }
}
