//! Analytics command handlers.

use tabled::Tabled;

use nurtura_core::{AnalyticsOverview, BookingStats, DashboardContext, RevenuePoint, UserGrowthPoint};

use crate::cli::{AnalyticsArgs, AnalyticsCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct RevenueRow {
    #[tabled(rename = "Period")]
    period: String,
    #[tabled(rename = "Revenue")]
    amount: String,
}

impl From<&RevenuePoint> for RevenueRow {
    fn from(p: &RevenuePoint) -> Self {
        Self {
            period: p.period.clone(),
            amount: util::money(p.amount, p.currency.as_deref().unwrap_or("USD")),
        }
    }
}

#[derive(Tabled)]
struct GrowthRow {
    #[tabled(rename = "Period")]
    period: String,
    #[tabled(rename = "New Users")]
    new_users: u64,
    #[tabled(rename = "Total")]
    total: String,
}

impl From<&UserGrowthPoint> for GrowthRow {
    fn from(p: &UserGrowthPoint) -> Self {
        Self {
            period: p.period.clone(),
            new_users: p.new_users,
            total: p.total_users.map_or_else(|| "-".into(), |t| t.to_string()),
        }
    }
}

#[derive(Tabled)]
struct BookingRow {
    #[tabled(rename = "Period")]
    period: String,
    #[tabled(rename = "Bookings")]
    total: u64,
    #[tabled(rename = "Completed")]
    completed: u64,
    #[tabled(rename = "Cancelled")]
    cancelled: u64,
}

impl From<&BookingStats> for BookingRow {
    fn from(b: &BookingStats) -> Self {
        Self {
            period: b.period.clone(),
            total: b.total,
            completed: b.completed,
            cancelled: b.cancelled,
        }
    }
}

fn overview_detail(o: &AnalyticsOverview) -> String {
    output::detail_lines(&[
        ("Users", o.total_users.to_string()),
        ("Providers", o.total_providers.to_string()),
        ("Parents", o.total_parents.to_string()),
        ("Active subscriptions", o.active_subscriptions.to_string()),
        ("Bookings", o.total_bookings.to_string()),
        ("Revenue", format!("{:.2}", o.total_revenue)),
        ("Pending reviews", o.pending_reviews.to_string()),
    ])
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    ctx: &DashboardContext,
    args: AnalyticsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let analytics = ctx.analytics();
    match args.command {
        AnalyticsCommand::Overview(range) => {
            let params = util::range_params(&range)?;
            let overview =
                util::with_spinner(global, "Loading overview", analytics.overview(&params)).await?;
            let out = output::render_single(&global.output, &*overview, overview_detail, |o| {
                o.total_users.to_string()
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        AnalyticsCommand::Revenue(range) => {
            let params = util::range_params(&range)?;
            let points =
                util::with_spinner(global, "Loading revenue", analytics.revenue(&params)).await?;
            let out = output::render_list(
                &global.output,
                points.as_slice(),
                |p| RevenueRow::from(p),
                |p| format!("{}\t{}", p.period, p.amount),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        AnalyticsCommand::Growth(range) => {
            let params = util::range_params(&range)?;
            let points =
                util::with_spinner(global, "Loading user growth", analytics.user_growth(&params))
                    .await?;
            let out = output::render_list(
                &global.output,
                points.as_slice(),
                |p| GrowthRow::from(p),
                |p| format!("{}\t{}", p.period, p.new_users),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        AnalyticsCommand::Bookings(range) => {
            let params = util::range_params(&range)?;
            let stats =
                util::with_spinner(global, "Loading bookings", analytics.bookings(&params)).await?;
            let out = output::render_list(
                &global.output,
                stats.as_slice(),
                |b| BookingRow::from(b),
                |b| format!("{}\t{}", b.period, b.total),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
