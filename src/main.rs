use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};

use console_authz::authz::{codec, PermissionEngineBuilder};
use console_authz::events::{init_event_bus, start_audit_listener, BroadcastAuditSink};
use console_authz::models::{system_roles, PermissionAction, PermissionGrant, PermissionResourceType, ReferenceType};
use console_authz::store::DirectoryFixture;
use console_authz::{EngineConfig, PermissionEngine, PermissionRequest, Principal};

#[derive(Parser, Debug)]
#[command(author, version, about = "console permission evaluation tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Evaluate one permission check against a directory fixture
    Check {
        #[arg(long)]
        fixture: PathBuf,
        #[arg(long)]
        user: String,
        #[arg(long)]
        reference_type: ReferenceType,
        #[arg(long)]
        reference_id: String,
        #[arg(long)]
        resource: PermissionResourceType,
        /// Grant code, e.g. "RU"
        #[arg(long)]
        actions: PermissionGrant,
    },
    /// Print the effective grants a user holds on a reference
    Grants {
        #[arg(long)]
        fixture: PathBuf,
        #[arg(long)]
        user: String,
        #[arg(long)]
        reference_type: ReferenceType,
        #[arg(long)]
        reference_id: String,
    },
    /// Print the actions of a grant code
    Decode { code: String },
    /// Print the canonical grant code for a list of actions
    Encode {
        #[arg(value_parser = parse_action, required = true)]
        actions: Vec<PermissionAction>,
    },
    /// Print the built-in roles with their packed masks
    SystemRoles,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_env();
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Check {
            fixture,
            user,
            reference_type,
            reference_id,
            resource,
            actions,
        } => {
            let config = EngineConfig::from_env()?;
            let (bus, rx) = init_event_bus(config.audit_capacity);
            let listener = tokio::spawn(start_audit_listener(rx));

            let engine = load_engine(&fixture, &config)?
                .audit_sink(Arc::new(BroadcastAuditSink::new(bus)))
                .build()?;
            let request = PermissionRequest::new(reference_type, reference_id, resource).requiring_grant(actions);
            let decision = engine.decide(&Principal::user(user), &request).await?;
            println!("{}", serde_json::to_string_pretty(&decision)?);

            // Dropping the engine closes the bus so the listener drains and exits
            drop(engine);
            listener.await.context("audit listener panicked")?;

            if !decision.granted {
                std::process::exit(1);
            }
        }
        Commands::Grants {
            fixture,
            user,
            reference_type,
            reference_id,
        } => {
            let config = EngineConfig::from_env()?;
            let engine = load_engine(&fixture, &config)?.build()?;
            let grants = engine
                .effective_grants(&Principal::user(user), reference_type, &reference_id)
                .await?;
            println!("{}", serde_json::to_string_pretty(&grants)?);
        }
        Commands::Decode { code } => {
            let grant = codec::decode(&code)?;
            for action in grant.iter() {
                println!("{action}");
            }
        }
        Commands::Encode { actions } => {
            println!("{}", codec::encode(actions));
        }
        Commands::SystemRoles => {
            println!("{:<14} {:<14} {}", "Scope", "Role", "Masks");
            for role in system_roles() {
                let masks: Vec<String> = role.to_masks().iter().map(i64::to_string).collect();
                println!("{:<14} {:<14} {}", role.scope().as_str(), role.name(), masks.join(","));
            }
        }
    }

    Ok(())
}

fn load_engine(fixture: &Path, config: &EngineConfig) -> anyhow::Result<PermissionEngineBuilder> {
    let directory = DirectoryFixture::from_path(fixture)?
        .into_directory()
        .with_context(|| format!("invalid fixture {}", fixture.display()))?;
    Ok(PermissionEngine::builder()
        .directory(Arc::new(directory))
        .config(config))
}

/// Accepts an action name (`read`, `READ`) or its code (`R`).
fn parse_action(value: &str) -> Result<PermissionAction, String> {
    let upper = value.trim().to_uppercase();
    PermissionAction::ALL
        .into_iter()
        .find(|action| action.as_str() == upper || (upper.len() == 1 && upper.starts_with(action.code())))
        .ok_or_else(|| format!("unknown action {value:?}, expected one of CREATE, READ, UPDATE, DELETE"))
}

fn load_env() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    let crate_env = Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
    let _ = dotenvy::from_path(crate_env);
}

fn init_tracing() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    // Logs go to stderr so JSON on stdout stays parseable
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false);

    let filter_layer = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}
