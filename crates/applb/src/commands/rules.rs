//! Rule subcommand handlers.

use tracing::debug;

use applb_core::{
    AccountId, Command as CoreCommand, CommandResult, CreateRuleRequest, NetworkId, RuleFilter,
    RuleId,
};

use super::Session;
use crate::cli::{CreateArgs, GlobalOpts, ListArgs, OutputFormat, RuleCommand};
use crate::error::CliError;
use crate::output;

pub async fn handle(
    cmd: RuleCommand,
    session: &Session,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        RuleCommand::Create(args) => create(args, session, global).await,
        RuleCommand::Get { id } => {
            let rule = session.service.get(RuleId::new(id)).await?;
            let out = output::render_rule(global.output, &rule, session.color)?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
        RuleCommand::Delete { id } => delete(id, session, global).await,
        RuleCommand::List(args) => {
            let rules = session.service.list(filter(&args)).await?;
            let out = output::render_rules(global.output, &rules, session.color)?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
        RuleCommand::Ack => {
            let moved = session.cluster.engine.acknowledge();
            if moved > 0 {
                session.persist()?;
            }
            let out = match global.output {
                OutputFormat::Table => format!("Acknowledged {moved} rule(s)"),
                OutputFormat::Json => {
                    output::render_json(&serde_json::json!({ "acknowledged": moved }))?
                }
            };
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}

fn request(args: CreateArgs) -> CreateRuleRequest {
    CreateRuleRequest {
        description: args.description.unwrap_or_else(|| args.name.clone()),
        name: args.name,
        scheme: args.scheme.into(),
        source_ip_network_id: NetworkId::new(args.network),
        source_ip: args.ip,
        source_port: args.source_port,
        instance_port: args.instance_port,
        algorithm: args.algorithm,
        guest_network_id: NetworkId::new(args.guest_network.unwrap_or(args.network)),
        account_id: AccountId::new(args.account),
    }
}

fn filter(args: &ListArgs) -> RuleFilter {
    RuleFilter {
        account_id: args.account.map(AccountId::new),
        source_ip_network_id: args.network.map(NetworkId::new),
        source_ip: args.ip,
    }
}

async fn create(args: CreateArgs, session: &Session, global: &GlobalOpts) -> Result<(), CliError> {
    let request = request(args);
    debug!(request = ?request, "create");

    let result = session
        .service
        .execute(CoreCommand::CreateRule(request), session.context)
        .await?;
    let CommandResult::Rule(rule) = result else {
        return Err(CliError::Internal("create returned no rule".into()));
    };
    session.persist()?;

    let out = output::render_rule(global.output, &rule, session.color)?;
    output::print_output(&out, global.quiet);
    Ok(())
}

async fn delete(id: u64, session: &Session, global: &GlobalOpts) -> Result<(), CliError> {
    let result = session
        .service
        .execute(CoreCommand::DeleteRule { id: RuleId::new(id) }, session.context)
        .await;
    // A refused revocation still changes state (the rule moves to Revoke).
    session.persist()?;

    match result? {
        CommandResult::Deleted(true) => {
            let out = match global.output {
                OutputFormat::Table => format!("Deleted rule {id}"),
                OutputFormat::Json => {
                    output::render_json(&serde_json::json!({ "id": id, "deleted": true }))?
                }
            };
            output::print_output(&out, global.quiet);
            Ok(())
        }
        CommandResult::Deleted(false) => Err(CliError::DeleteRefused { id }),
        CommandResult::Rule(_) => Err(CliError::Internal("delete returned a rule".into())),
    }
}
