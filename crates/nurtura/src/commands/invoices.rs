//! Invoice command handlers.

use tabled::Tabled;

use nurtura_core::{DashboardContext, Invoice};

use crate::cli::{GlobalOpts, InvoicesArgs, InvoicesCommand};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct InvoiceRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Number")]
    number: String,
    #[tabled(rename = "Customer")]
    customer: String,
    #[tabled(rename = "Amount")]
    amount: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Due")]
    due: String,
}

impl From<&Invoice> for InvoiceRow {
    fn from(i: &Invoice) -> Self {
        Self {
            id: i.id.clone(),
            number: util::opt(i.number.as_deref()),
            customer: util::opt(i.customer_name.as_deref().or(i.customer_email.as_deref())),
            amount: util::money(i.amount, &i.currency),
            status: i.status.to_string(),
            due: i.due_date.map_or_else(|| "-".into(), |d| d.to_string()),
        }
    }
}

fn detail(i: &Invoice) -> String {
    output::detail_lines(&[
        ("ID", i.id.clone()),
        ("Number", i.number.clone().unwrap_or_default()),
        ("Customer", i.customer_name.clone().unwrap_or_default()),
        ("Email", i.customer_email.clone().unwrap_or_default()),
        ("Amount", util::money(i.amount, &i.currency)),
        ("Status", i.status.to_string()),
        ("Due", i.due_date.map(|d| d.to_string()).unwrap_or_default()),
        ("Issued", i.issued_at.map(|d| d.to_rfc3339()).unwrap_or_default()),
        ("Paid", i.paid_at.map(|d| d.to_rfc3339()).unwrap_or_default()),
    ])
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    ctx: &DashboardContext,
    args: InvoicesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let invoices = ctx.invoices();
    match args.command {
        InvoicesCommand::List { list, range } => {
            let ranged = util::range_params(&range)?;
            let params = util::list_params(&list).with_range(ranged.from, ranged.to);
            let page = util::with_spinner(global, "Loading invoices", invoices.list(&params)).await?;
            let out = output::render_page(
                &global.output,
                &page,
                |i| InvoiceRow::from(i),
                |i| i.id.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        InvoicesCommand::Show { id } => {
            let invoice = util::with_spinner(global, "Loading invoice", invoices.detail(&id))
                .await
                .map_err(|e| CliError::from(e).or_not_found("invoice", &id, "invoices list"))?;
            let out = output::render_single(&global.output, &*invoice, detail, |i| i.id.clone())?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        InvoicesCommand::Send { id } => {
            invoices
                .send()
                .mutate(id.clone())
                .await
                .map_err(|e| CliError::from(e).or_not_found("invoice", &id, "invoices list"))?;
            Ok(())
        }

        InvoicesCommand::Void { id } => {
            let prompt = format!("Void invoice '{id}'? The customer will no longer be able to pay it.");
            if !util::confirm(&prompt, "invoices void", global.yes)? {
                return Ok(());
            }
            invoices
                .void()
                .mutate(id.clone())
                .await
                .map_err(|e| CliError::from(e).or_not_found("invoice", &id, "invoices list"))?;
            Ok(())
        }
    }
}
