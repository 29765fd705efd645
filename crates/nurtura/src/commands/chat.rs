//! Realtime chat command handlers.

use chrono::Local;
use futures_util::StreamExt;
use owo_colors::OwoColorize;
use tracing::debug;

use nurtura_core::{DashboardContext, RealtimeMessage};

use crate::cli::{ChatArgs, ChatCommand, GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    ctx: &DashboardContext,
    args: ChatArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        ChatCommand::Listen { event, count } => {
            let conn = ctx.connect_realtime()?;
            if !global.quiet {
                eprintln!("Listening on {} (Ctrl-C to stop)", conn.url());
            }

            let color = output::should_color(&global.color);
            let messages = conn.messages();
            futures_util::pin_mut!(messages);
            let mut seen = 0usize;

            loop {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {
                        debug!("interrupted");
                        break;
                    }
                    next = messages.next() => {
                        let Some(msg) = next else { break };
                        if event.as_deref().is_some_and(|name| name != msg.event) {
                            continue;
                        }
                        output::print_output(&render_message(&msg, &global.output, color)?, false);
                        seen += 1;
                        if count.is_some_and(|limit| seen >= limit) {
                            break;
                        }
                    }
                }
            }

            conn.disconnect().await;
            Ok(())
        }
    }
}

/// One line per event: structured formats emit compact JSON.
fn render_message(
    msg: &RealtimeMessage,
    format: &OutputFormat,
    color: bool,
) -> Result<String, CliError> {
    Ok(match format {
        OutputFormat::Json | OutputFormat::JsonCompact => serde_json::to_string(msg)?,
        OutputFormat::Yaml => format!("---\n{}", serde_yaml::to_string(msg)?),
        OutputFormat::Plain => format!("{}\t{}", msg.event, msg.data),
        OutputFormat::Table => {
            let time = Local::now().format("%H:%M:%S").to_string();
            if color {
                format!("{} {} {}", time.dimmed(), msg.event.cyan().bold(), msg.data)
            } else {
                format!("{time} {} {}", msg.event, msg.data)
            }
        }
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn json_lines_are_compact() {
        let msg = RealtimeMessage::new("message", json!({ "text": "hi" }));
        let line = render_message(&msg, &OutputFormat::Json, false).unwrap();
        assert!(!line.contains('\n'));
        assert!(line.contains(r#""event":"message""#));
    }

    #[test]
    fn plain_is_tab_separated() {
        let msg = RealtimeMessage::new("typing", json!(null));
        let line = render_message(&msg, &OutputFormat::Plain, false).unwrap();
        assert_eq!(line, "typing\tnull");
    }
}
