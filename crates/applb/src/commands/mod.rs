//! Command handlers.

pub mod config_cmd;
pub mod rules;

use applb_config::{Config, build_cluster, load_config, state_path};
use applb_core::ports::RuleRepository;
use applb_core::store::MemoryCluster;
use applb_core::{AccountId, CallContext, LbService, RuleFilter};

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;
use crate::output;
use crate::state::StateFile;

/// Everything a rule command needs, rebuilt on every invocation.
pub struct Session {
    pub cluster: MemoryCluster,
    pub service: LbService,
    pub state: StateFile,
    pub context: CallContext,
    pub color: bool,
}

impl Session {
    /// Load config and saved rules, then wire the manager.
    pub fn open(global: &GlobalOpts) -> Result<Self, CliError> {
        let config: Config = load_config(global.config.as_deref())?;
        let cluster = build_cluster(&config)?;

        let state = StateFile::new(global.state.clone().unwrap_or_else(state_path));
        cluster.restore(state.load()?)?;

        let service = LbService::new(cluster.manager(config.manager.clone()));
        Ok(Self {
            cluster,
            service,
            state,
            context: CallContext::new(global.caller, AccountId::new(global.caller_account)),
            color: output::should_color(global.color),
        })
    }

    /// Write the current rule set back to the state file.
    pub fn persist(&self) -> Result<(), CliError> {
        self.state.save(self.cluster.rules.list(&RuleFilter::default()))
    }
}

pub async fn dispatch(cmd: Command, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Config(args) => config_cmd::handle(&args, global),
        Command::Rule(cmd) => {
            let session = Session::open(global)?;
            rules::handle(cmd, &session, global).await
        }
    }
}
