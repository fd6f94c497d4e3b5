use anyhow::Result;
use clap::{Parser, Subcommand};
use mtpanel_daemon::{bootstrap, DaemonError, Settings};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Admin panel for an MTProto proxy managed through systemd
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short = 'c', long = "config")]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Register or refresh an admin session
    Session {
        /// Acting admin's Telegram id
        #[arg(long)]
        admin: i64,
        /// Display name to store on first contact
        #[arg(long, default_value = "")]
        name: String,
    },
    /// Set the acting admin's tag prefix (one-time)
    SetTag {
        #[arg(long)]
        admin: i64,
        tag: String,
    },
    /// List the acting admin's proxies, one page at a time
    List {
        #[arg(long)]
        admin: i64,
        /// Zero-based page index
        #[arg(long, default_value_t = 0)]
        page: u32,
    },
    /// Provision a new proxy for the acting admin
    Create {
        #[arg(long)]
        admin: i64,
    },
    /// Revoke a proxy by record id
    Delete {
        #[arg(long)]
        admin: i64,
        proxy_id: i64,
    },
    /// Compare the record store against the live configuration
    Reconcile {
        /// Re-install record secrets missing from the live configuration
        #[arg(long)]
        repair: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("mtpanel=info")),
        )
        .init();

    let settings = match &cli.config {
        Some(path) => {
            info!("loading configuration from {path}");
            Settings::from_file(path)?
        }
        None => Settings::from_env()?,
    };
    if settings.admins.owner_id == 0 {
        anyhow::bail!("admins.owner_id is not configured");
    }

    let (panel, reconciler) = bootstrap::build(&settings).await?;

    // Startup consistency check; divergence is logged, never fatal here.
    match reconciler.scan().await {
        Ok(report) if !report.is_consistent() => {
            warn!(
                missing = report.missing_from_unit.len(),
                orphaned = report.orphaned_secrets.len(),
                "record store and live configuration diverge; run `reconcile --repair`"
            );
        }
        Ok(_) => {}
        Err(err) => warn!(error = %err, "startup consistency scan failed"),
    }

    let outcome = run(&cli.command, &panel, &reconciler).await;

    // Unauthorized callers get silence, matching the chat surface's policy.
    if let Err(DaemonError::Unauthorized) = outcome {
        std::process::exit(1);
    }

    Ok(outcome?)
}

async fn run(
    command: &Command,
    panel: &mtpanel_daemon::Panel,
    reconciler: &mtpanel_daemon::Reconciler,
) -> mtpanel_daemon::Result<()> {
    match command {
        Command::Session { admin, name } => {
            let session = panel.start_session(*admin, name).await?;
            println!(
                "admin #{} ({}){}",
                session.admin.id,
                session.admin.telegram_id,
                if session.needs_tag {
                    ": set a tag prefix before creating proxies"
                } else {
                    ""
                }
            );
        }
        Command::SetTag { admin, tag } => {
            let updated = panel.set_tag(*admin, tag).await?;
            println!(
                "tag prefix: {}",
                updated.tag_prefix.as_deref().unwrap_or("(unset)")
            );
        }
        Command::List { admin, page } => {
            let page = panel.list_proxies(*admin, *page).await?;
            println!(
                "{} active proxies, page {}/{}",
                page.total,
                page.page + 1,
                page.page_count
            );
            for entry in &page.entries {
                println!("#{:<4} {:<24} {}", entry.record.id, entry.record.label, entry.link);
            }
        }
        Command::Create { admin } => {
            let created = panel.create_proxy(*admin).await?;
            println!("#{} {}", created.record.id, created.record.label);
            println!("{}", created.link);
        }
        Command::Delete { admin, proxy_id } => {
            if panel.delete_proxy(*admin, *proxy_id).await? {
                println!("proxy #{proxy_id} revoked");
            } else {
                println!("proxy #{proxy_id} was already gone");
            }
        }
        Command::Reconcile { repair } => {
            let report = if *repair {
                reconciler.repair().await?
            } else {
                reconciler.scan().await?
            };
            if report.is_consistent() {
                println!("record store and live configuration are consistent");
            } else {
                for record in &report.missing_from_unit {
                    println!(
                        "record #{} ({}) missing from live configuration{}",
                        record.id,
                        record.label,
                        if *repair { ", re-installed" } else { "" }
                    );
                }
                for secret in &report.orphaned_secrets {
                    println!(
                        "live secret {}... has no active record",
                        mtpanel_daemon::reconcile::secret_prefix(secret)
                    );
                }
            }
        }
    }
    Ok(())
}
