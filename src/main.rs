use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::{error, info};
use zapier_authz::config::{Config, TelemetryConfig};
use zapier_authz::domain::{CreateSubscriptionInput, ResourceId};
use zapier_authz::generations::{EvolveOutcome, SchemaManager};
use zapier_authz::repository::SecurityRepositoryImpl;
use zapier_authz::security::{PermissionId, PrincipalId};
use zapier_authz::service::{AuthorizationService, SubscriptionService};
use zapier_authz::{migration, telemetry, AppError};

#[derive(Parser)]
#[command(name = "zapier-authz", version, about = "Zapier integration authorization core")]
struct Cli {
    /// Print Prometheus metrics after the command (requires METRICS_ENABLED=true)
    #[arg(long, global = true)]
    print_metrics: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the database if needed and apply migrations
    Migrate,
    /// Install or upgrade stored security data to the current generation
    Evolve,
    /// Check whether a principal holds a permission on a resource
    Check {
        principal: String,
        permission: String,
        resource: String,
    },
    /// Create a Zapier webhook subscription in a site
    Subscribe {
        #[arg(long)]
        site: String,
        #[arg(long)]
        owner: String,
        #[arg(long)]
        target: String,
        #[arg(long)]
        event: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let prometheus = telemetry::init(&TelemetryConfig::from_env());
    let config = Config::from_env()?;

    info!("Starting {}", config.telemetry.service_name);
    if let Err(e) = run(cli.command, &config).await {
        error!(kind = AppError::kind_of(&e), error = %e, "Command failed");
        return Err(e);
    }

    if cli.print_metrics {
        match prometheus {
            Some(handle) => println!("{}", handle.render()),
            None => eprintln!("Metrics are disabled; set METRICS_ENABLED=true"),
        }
    }
    Ok(())
}

async fn repository(config: &Config) -> Result<Arc<SecurityRepositoryImpl>> {
    let pool = migration::connect(&config.database).await?;
    Ok(Arc::new(SecurityRepositoryImpl::new(pool)))
}

async fn run(command: Command, config: &Config) -> Result<()> {
    match command {
        Command::Migrate => migration::run_migrations(&config.database).await?,
        Command::Evolve => {
            let repo = repository(config).await?;
            match SchemaManager::new().run(repo.as_ref()).await? {
                EvolveOutcome::Installed(generation) => {
                    println!("Installed generation {}", generation);
                }
                EvolveOutcome::UpToDate(generation) => {
                    println!("Already at generation {}", generation);
                }
                EvolveOutcome::Evolved { from, to, steps } => {
                    println!("Evolved from generation {} to {}", from, to);
                    for (generation, summary) in steps {
                        println!(
                            "  generation {}: updated {} subscriptions in {}/{} sites",
                            generation,
                            summary.subscriptions_updated,
                            summary.sites_updated,
                            summary.total_sites
                        );
                    }
                }
            }
        }
        Command::Check {
            principal,
            permission,
            resource,
        } => {
            let principal = PrincipalId::parse(&principal)?;
            let permission = PermissionId::parse(&permission)?;
            let resource: ResourceId = resource.parse().context("Invalid resource id")?;

            let decision = AuthorizationService::new(repository(config).await?)
                .check_permission(&principal, &permission, resource)
                .await?;
            println!(
                "{} ({:?})",
                if decision.is_allowed() { "allow" } else { "deny" },
                decision.source
            );
        }
        Command::Subscribe {
            site,
            owner,
            target,
            event,
        } => {
            let owner = PrincipalId::parse(&owner)?;
            let input = CreateSubscriptionInput {
                target,
                event_type: event,
            };
            let id = SubscriptionService::new(repository(config).await?)
                .subscribe(&site, &owner, input)
                .await?;
            println!("{}", id);
        }
    }
    Ok(())
}
