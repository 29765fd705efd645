//! Shared helpers for command handlers.

use std::future::Future;
use std::io::IsTerminal;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use indicatif::{ProgressBar, ProgressStyle};

use nurtura_core::{ListParams, Role};

use crate::cli::{GlobalOpts, ListArgs, OutputFormat, RangeArgs, RoleArg};
use crate::error::CliError;

impl From<RoleArg> for Role {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::SuperAdmin => Role::SuperAdmin,
            RoleArg::Admin => Role::Admin,
            RoleArg::Manager => Role::Manager,
            RoleArg::Provider => Role::Provider,
            RoleArg::Parent => Role::Parent,
        }
    }
}

/// Prompt for confirmation, auto-approving if `--yes` was passed.
///
/// Without a terminal to ask on, refuses instead of blocking.
pub fn confirm(message: &str, action: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: action.into(),
        });
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))?;
    Ok(confirmed)
}

/// Await `fut` behind a spinner when a human is watching a table.
pub async fn with_spinner<T>(global: &GlobalOpts, message: &str, fut: impl Future<Output = T>) -> T {
    let show = global.output == OutputFormat::Table
        && !global.quiet
        && std::io::stderr().is_terminal();
    if !show {
        return fut.await;
    }

    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(message.to_owned());
    spinner.enable_steady_tick(Duration::from_millis(80));
    let out = fut.await;
    spinner.finish_and_clear();
    out
}

/// Translate list flags into request parameters.
pub fn list_params(args: &ListArgs) -> ListParams {
    let mut params = ListParams::page(args.page, args.limit);
    if let Some(ref search) = args.search {
        params = params.with_search(search.clone());
    }
    if let Some(ref status) = args.status {
        params = params.with_status(status.clone());
    }
    params
}

/// Translate range flags into request parameters.
pub fn range_params(args: &RangeArgs) -> Result<ListParams, CliError> {
    let from = args.from.as_deref().map(|d| parse_date("from", d)).transpose()?;
    let to = args.to.as_deref().map(|d| parse_date("to", d)).transpose()?;
    if let (Some(from), Some(to)) = (from, to) {
        if from > to {
            return Err(CliError::Validation {
                field: "from".into(),
                reason: format!("{from} is after {to}"),
            });
        }
    }

    let mut params = ListParams::default().with_range(from, to);
    if let Some(ref period) = args.period {
        params = params.with_period(period.clone());
    }
    Ok(params)
}

fn parse_date(field: &str, raw: &str) -> Result<NaiveDate, CliError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| CliError::Validation {
        field: field.into(),
        reason: format!("expected YYYY-MM-DD, got '{raw}'"),
    })
}

// ── Cell formatting ─────────────────────────────────────────────────

pub fn opt(value: Option<&str>) -> String {
    value.unwrap_or("-").to_owned()
}

pub fn date(value: Option<&DateTime<Utc>>) -> String {
    value.map_or_else(|| "-".into(), |d| d.format("%Y-%m-%d %H:%M").to_string())
}

pub fn money(amount: f64, currency: &str) -> String {
    format!("{amount:.2} {currency}")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn list_flags_become_params() {
        let args = ListArgs {
            page: 2,
            limit: 25,
            search: Some("ada".into()),
            status: None,
        };
        let params = list_params(&args);
        assert_eq!(
            params.to_query(),
            vec![
                ("page".to_owned(), "2".to_owned()),
                ("limit".to_owned(), "25".to_owned()),
                ("search".to_owned(), "ada".to_owned()),
            ]
        );
    }

    #[test]
    fn range_rejects_bad_dates() {
        let args = RangeArgs {
            from: Some("2026-13-01".into()),
            to: None,
            period: None,
        };
        assert!(matches!(range_params(&args), Err(CliError::Validation { .. })));
    }

    #[test]
    fn range_rejects_inverted_bounds() {
        let args = RangeArgs {
            from: Some("2026-03-01".into()),
            to: Some("2026-02-01".into()),
            period: Some("week".into()),
        };
        assert!(range_params(&args).is_err());
    }

    #[test]
    fn confirm_skips_prompt_with_yes() {
        assert!(confirm("Delete?", "delete", true).unwrap());
    }
}
