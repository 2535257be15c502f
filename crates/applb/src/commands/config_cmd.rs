//! Config subcommand handlers.

use applb_config::{config_path, load_config, render_config, state_path};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

pub fn handle(args: &ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            let config = global.config.clone().unwrap_or_else(config_path);
            let state = global.state.clone().unwrap_or_else(state_path);
            let out = match global.output {
                OutputFormat::Table => {
                    format!("config: {}\nstate:  {}", config.display(), state.display())
                }
                OutputFormat::Json => output::render_json(&serde_json::json!({
                    "config": config,
                    "state": state,
                }))?,
            };
            output::print_output(&out, global.quiet);
            Ok(())
        }
        ConfigCommand::Show => {
            let config = load_config(global.config.as_deref())?;
            let out = match global.output {
                OutputFormat::Table => render_config(&config)?,
                OutputFormat::Json => output::render_json(&config)?,
            };
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
