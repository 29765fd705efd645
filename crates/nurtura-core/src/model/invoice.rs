// ── Invoices ──

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum InvoiceStatus {
    Draft,
    Sent,
    Paid,
    Overdue,
    Void,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: String,
    #[serde(default, alias = "invoiceNumber")]
    pub number: Option<String>,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub customer_email: Option<String>,
    pub amount: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub status: InvoiceStatus,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub issued_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub paid_at: Option<DateTime<Utc>>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

fn default_currency() -> String {
    "USD".into()
}

impl Invoice {
    /// Sent or overdue invoices can still be voided.
    pub fn is_voidable(&self) -> bool {
        match self.status {
            InvoiceStatus::Draft | InvoiceStatus::Sent | InvoiceStatus::Overdue => true,
            InvoiceStatus::Paid | InvoiceStatus::Void | InvoiceStatus::Unknown => false,
        }
    }
}
