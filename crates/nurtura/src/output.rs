//! Output formatting: table, JSON, YAML, plain.
//!
//! Renders data in the format selected by `--output`. Table uses `tabled`,
//! structured formats use serde, plain emits one identifier per line.
//! Notifications posted by mutations go to stderr.

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use tabled::{Table, Tabled, settings::Style};
use tracing::debug;

use nurtura_core::{Notification, NotificationLevel, Notifier, Page};

use crate::cli::{ColorMode, GlobalOpts, OutputFormat};
use crate::error::CliError;

// ── Color helpers ────────────────────────────────────────────────────

/// Determine whether color output should be enabled.
pub fn should_color(mode: &ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stderr().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a list of serde-serializable + tabled items in the chosen format.
///
/// - `table`: uses the `Tabled` derive to build a pretty table
/// - `json` / `json-compact`: serializes the original data via serde
/// - `yaml`: serializes via serde_yaml
/// - `plain`: calls `id_fn` on each item to emit one identifier per line
pub fn render_list<T, R>(
    format: &OutputFormat,
    data: &[T],
    to_row: impl Fn(&T) -> R,
    id_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize,
    R: Tabled,
{
    Ok(match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().map(to_row).collect();
            render_table(&rows)
        }
        OutputFormat::Json => serde_json::to_string_pretty(data)?,
        OutputFormat::JsonCompact => serde_json::to_string(data)?,
        OutputFormat::Yaml => serde_yaml::to_string(data)?,
        OutputFormat::Plain => data.iter().map(&id_fn).collect::<Vec<_>>().join("\n"),
    })
}

/// Render one page of a list endpoint.
///
/// Structured formats keep the page envelope so scripts see the totals; the
/// table gets a one-line footer instead.
pub fn render_page<T, R>(
    format: &OutputFormat,
    page: &Page<T>,
    to_row: impl Fn(&T) -> R,
    id_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize,
    R: Tabled,
{
    match format {
        OutputFormat::Table => {
            let table = render_list(format, &page.items, to_row, id_fn)?;
            Ok(format!(
                "{table}\nPage {} · {} of {} total",
                page.page(),
                page.len(),
                page.total()
            ))
        }
        OutputFormat::Plain => render_list(format, &page.items, to_row, id_fn),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(page)?),
        OutputFormat::JsonCompact => Ok(serde_json::to_string(page)?),
        OutputFormat::Yaml => Ok(serde_yaml::to_string(page)?),
    }
}

/// Render a single serde-serializable item in the chosen format.
///
/// Table rendering uses `detail_fn`, since single-item views are key/value
/// listings rather than tables.
pub fn render_single<T>(
    format: &OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> String,
    id_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize,
{
    Ok(match format {
        OutputFormat::Table => detail_fn(data),
        OutputFormat::Json => serde_json::to_string_pretty(data)?,
        OutputFormat::JsonCompact => serde_json::to_string(data)?,
        OutputFormat::Yaml => serde_yaml::to_string(data)?,
        OutputFormat::Plain => id_fn(data),
    })
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

/// Format `label: value` lines for detail views, skipping empty values.
pub fn detail_lines(fields: &[(&str, String)]) -> String {
    let width = fields.iter().map(|(label, _)| label.len()).max().unwrap_or(0);
    fields
        .iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(label, value)| format!("{label:<width$}  {value}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

// ── Notifications ────────────────────────────────────────────────────

/// Prints mutation success notifications to stderr.
///
/// Error notifications are only logged: the failing command already exits
/// with the same message as its diagnostic.
pub struct TerminalNotifier {
    quiet: bool,
    color: bool,
}

impl TerminalNotifier {
    pub fn new(global: &GlobalOpts) -> Self {
        Self {
            quiet: global.quiet,
            color: should_color(&global.color),
        }
    }
}

impl Notifier for TerminalNotifier {
    fn notify(&self, notification: Notification) {
        match notification.level {
            NotificationLevel::Success if !self.quiet => {
                if self.color {
                    eprintln!("{} {}", "✓".green().bold(), notification.message);
                } else {
                    eprintln!("✓ {}", notification.message);
                }
            }
            NotificationLevel::Success => {}
            NotificationLevel::Error => debug!(text = %notification.message, "error notification"),
        }
    }
}
