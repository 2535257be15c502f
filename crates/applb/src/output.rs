//! Output formatting: table or JSON.
//!
//! Renders data in the format selected by `--output`. Table uses `tabled`,
//! JSON uses serde.

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use tabled::{Table, Tabled, settings::Style};

use applb_core::{ApplicationLoadBalancerRule, RuleState};

use crate::cli::{ColorMode, OutputFormat};
use crate::error::CliError;

// ── Color helpers ────────────────────────────────────────────────────

/// Determine whether color output should be enabled.
pub fn should_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

fn paint_state(state: RuleState, color: bool) -> String {
    if !color {
        return state.to_string();
    }
    match state {
        RuleState::Active => state.green().to_string(),
        RuleState::Staged | RuleState::Add => state.yellow().to_string(),
        RuleState::Revoke | RuleState::Removed => state.red().to_string(),
    }
}

// ── Rule rows ────────────────────────────────────────────────────────

#[derive(Tabled)]
struct RuleRow {
    #[tabled(rename = "ID")]
    id: u64,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Source")]
    source: String,
    #[tabled(rename = "Instance Port")]
    instance_port: u16,
    #[tabled(rename = "Algorithm")]
    algorithm: String,
    #[tabled(rename = "Network")]
    network: u64,
    #[tabled(rename = "Account")]
    account: u64,
    #[tabled(rename = "State")]
    state: String,
}

fn rule_row(rule: &ApplicationLoadBalancerRule, color: bool) -> RuleRow {
    RuleRow {
        id: rule.id.get(),
        name: rule.name.clone(),
        source: format!("{}:{}", rule.source_ip, rule.source_port),
        instance_port: rule.instance_port,
        algorithm: rule.algorithm.to_string(),
        network: rule.source_ip_network_id.get(),
        account: rule.account_id.get(),
        state: paint_state(rule.state, color),
    }
}

fn rule_detail(rule: &ApplicationLoadBalancerRule, color: bool) -> String {
    [
        format!("ID:            {}", rule.id),
        format!("UUID:          {}", rule.uuid),
        format!("Name:          {}", rule.name),
        format!("Description:   {}", rule.description),
        format!("Scheme:        {}", rule.scheme),
        format!("Source:        {}:{}", rule.source_ip, rule.source_port),
        format!("Instance Port: {}", rule.instance_port),
        format!("Algorithm:     {}", rule.algorithm),
        format!("Network:       {}", rule.source_ip_network_id),
        format!("Guest Network: {}", rule.guest_network_id),
        format!("Account:       {}", rule.account_id),
        format!("State:         {}", paint_state(rule.state, color)),
        format!("Created:       {}", rule.created.format("%Y-%m-%d %H:%M:%S UTC")),
    ]
    .join("\n")
}

// ── Render dispatchers ───────────────────────────────────────────────

pub fn render_rules(
    format: OutputFormat,
    rules: &[ApplicationLoadBalancerRule],
    color: bool,
) -> Result<String, CliError> {
    match format {
        OutputFormat::Table => {
            let rows: Vec<RuleRow> = rules.iter().map(|r| rule_row(r, color)).collect();
            Ok(Table::new(rows).with(Style::rounded()).to_string())
        }
        OutputFormat::Json => render_json(rules),
    }
}

pub fn render_rule(
    format: OutputFormat,
    rule: &ApplicationLoadBalancerRule,
    color: bool,
) -> Result<String, CliError> {
    match format {
        OutputFormat::Table => Ok(rule_detail(rule, color)),
        OutputFormat::Json => render_json(rule),
    }
}

/// Pretty-printed JSON.
pub fn render_json<T: serde::Serialize + ?Sized>(data: &T) -> Result<String, CliError> {
    Ok(serde_json::to_string_pretty(data)?)
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}
