use std::process::ExitCode;

use clap::Parser;
use relay_server::config::{Command, Ctx, Env};
use relay_server::telemetry::setup_tracing;
use relay_store::{AuditFilter, AuditLog, AuditOutcome, NonceRegistry};
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    let env = Env::parse();

    let ctx = match Ctx::load_files(&env.config_file, &env.secrets_file) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("invalid configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    match env.command.unwrap_or(Command::Serve) {
        Command::ValidateConfig => {
            println!("{}", ctx.summary());
            ExitCode::SUCCESS
        }
        Command::Audit { failures_only, user, limit } => {
            let filter = AuditFilter {
                user,
                outcome: failures_only.then_some(AuditOutcome::ExecutionFailed),
                direction: None,
                limit,
            };
            match audit(&ctx, &filter).await {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    eprintln!("audit failed: {e}");
                    ExitCode::FAILURE
                }
            }
        }
        Command::Serve => {
            setup_tracing(ctx.log_level, ctx.log_format);
            match serve(&ctx).await {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    error!(error = %e, "relayer stopped");
                    ExitCode::FAILURE
                }
            }
        }
    }
}

async fn audit(ctx: &Ctx, filter: &AuditFilter) -> Result<(), Box<dyn std::error::Error>> {
    let store = relay_server::open_store(ctx).await?;
    for entry in store.list(filter).await? {
        println!("{}", serde_json::to_string(&entry)?);
    }
    NonceRegistry::close(store.as_ref()).await?;
    Ok(())
}

async fn serve(ctx: &Ctx) -> Result<(), Box<dyn std::error::Error>> {
    let (state, store) = relay_server::connect(ctx).await?;
    let app = relay_server::create_router().with_state(state);

    let bind_addr = format!("{}:{}", ctx.host, ctx.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(addr = %bind_addr, "relayer listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "failed to listen for shutdown signal");
            }
            info!("shutting down");
        })
        .await?;

    NonceRegistry::close(store.as_ref()).await?;
    Ok(())
}
