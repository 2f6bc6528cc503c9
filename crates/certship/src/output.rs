//! Run banner and summary table rendering.

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use certship_core::UploadOutcome;

use crate::cli::Cli;

/// Whether color output should be enabled.
fn should_color() -> bool {
    io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err()
}

/// Print the run parameters before the first device is touched.
pub fn print_banner(cli: &Cli, device_count: usize) {
    if cli.quiet {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(
        stdout,
        "certship {}: {device_count} device(s) from {}",
        env!("CARGO_PKG_VERSION"),
        cli.config.display()
    );
    let _ = writeln!(
        stdout,
        "  namespace: {}  issuer: {} ({})  resources: {}",
        cli.namespace,
        cli.issuer,
        certship_core::IssuerKind::from(cli.issuer_kind),
        if cli.skip_resources { "skipped" } else { "reconciled" }
    );
}

#[derive(Tabled)]
struct OutcomeRow {
    #[tabled(rename = "DEVICE")]
    device: String,
    #[tabled(rename = "STATUS")]
    status: String,
    #[tabled(rename = "DETAILS")]
    details: String,
}

fn to_row(outcome: &UploadOutcome, color: bool) -> OutcomeRow {
    let status = if outcome.success {
        if color {
            "SUCCESS".green().to_string()
        } else {
            "SUCCESS".to_owned()
        }
    } else if color {
        "FAILED".red().to_string()
    } else {
        "FAILED".to_owned()
    };

    OutcomeRow {
        device: outcome.device_name.clone(),
        status,
        details: outcome.cause.clone().unwrap_or_default(),
    }
}

/// Print the per-device summary table.
pub fn print_summary(outcomes: &[UploadOutcome], quiet: bool) {
    if quiet || outcomes.is_empty() {
        return;
    }
    let color = should_color();
    let rows: Vec<OutcomeRow> = outcomes.iter().map(|o| to_row(o, color)).collect();
    let table = Table::new(rows).with(Style::rounded()).to_string();

    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{table}");
}
