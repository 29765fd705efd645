//! Review moderation command handlers.

use tabled::Tabled;

use nurtura_core::{DashboardContext, Review, ReviewStatus, UpdateReviewStatus};

use crate::cli::{GlobalOpts, ReviewsArgs, ReviewsCommand};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct ReviewRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Rating")]
    rating: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Author")]
    author: String,
    #[tabled(rename = "Provider")]
    provider: String,
    #[tabled(rename = "Comment")]
    comment: String,
}

const COMMENT_WIDTH: usize = 48;

impl From<&Review> for ReviewRow {
    fn from(r: &Review) -> Self {
        let comment = r.comment.as_deref().unwrap_or("");
        let comment = if comment.chars().count() > COMMENT_WIDTH {
            let cut: String = comment.chars().take(COMMENT_WIDTH - 1).collect();
            format!("{cut}…")
        } else {
            comment.to_owned()
        };
        Self {
            id: r.id.clone(),
            rating: "★".repeat(usize::from(r.rating.min(5))),
            status: r.status.to_string(),
            author: util::opt(r.author_name.as_deref()),
            provider: util::opt(r.provider_name.as_deref()),
            comment,
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    ctx: &DashboardContext,
    args: ReviewsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let reviews = ctx.reviews();
    match args.command {
        ReviewsCommand::List(list) => {
            let params = util::list_params(&list);
            let page = util::with_spinner(global, "Loading reviews", reviews.list(&params)).await?;
            let out = output::render_page(
                &global.output,
                &page,
                |r| ReviewRow::from(r),
                |r| r.id.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ReviewsCommand::Approve { id } => {
            moderate(ctx, id, ReviewStatus::Approved, None).await
        }

        ReviewsCommand::Reject { id, reason } => {
            moderate(ctx, id, ReviewStatus::Rejected, reason).await
        }

        ReviewsCommand::Delete { id } => {
            let prompt = format!("Delete review '{id}'? This cannot be undone.");
            if !util::confirm(&prompt, "reviews delete", global.yes)? {
                return Ok(());
            }
            reviews
                .delete()
                .mutate(id.clone())
                .await
                .map_err(|e| CliError::from(e).or_not_found("review", &id, "reviews list"))?;
            Ok(())
        }
    }
}

async fn moderate(
    ctx: &DashboardContext,
    id: String,
    status: ReviewStatus,
    reason: Option<String>,
) -> Result<(), CliError> {
    ctx.reviews()
        .update_status()
        .mutate(UpdateReviewStatus {
            id: id.clone(),
            status,
            reason,
        })
        .await
        .map_err(|e| CliError::from(e).or_not_found("review", &id, "reviews list"))?;
    Ok(())
}
