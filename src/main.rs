use std::io;
use std::path::PathBuf;
use std::process::exit;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use dbadmin::cli::{AdminCli, OutputFormat};
use dbadmin::client::HttpRemoteStore;
use dbadmin::config::schema::{load_config, load_config_from_env, DbAdminConfig};
use dbadmin::notify::Notifier;

const DEFAULT_LOG_FILTER: &str = "dbadmin=info,warn";

#[derive(Debug, Parser)]
#[clap(name = "dbadmin", version, about)]
struct Args {
    #[clap(short, long, help = "Path to the config file")]
    config_path: Option<PathBuf>,

    #[clap(
        long,
        help = "Run `;`-separated commands and statements, then exit"
    )]
    one_off: Option<String>,

    #[clap(short = 'y', long, help = "Answer yes to confirmations in --one-off mode")]
    yes: bool,

    #[clap(long, help = "Log as JSON instead of text")]
    json_logs: bool,
}

fn prepare_tracing(json_logs: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let subscriber = tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(filter);

    if json_logs {
        subscriber.json().init();
    } else {
        subscriber.with_target(false).init();
    }
}

fn load(args: &Args) -> DbAdminConfig {
    let result = match &args.config_path {
        Some(path) => {
            info!("Loading the configuration from {}", path.display());
            load_config(path)
        }
        None => load_config_from_env(),
    };

    result.unwrap_or_else(|e| {
        error!("Error loading the config: {e}");
        exit(-1);
    })
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    prepare_tracing(args.json_logs);

    let config = load(&args);
    let store = match HttpRemoteStore::from_config(&config.backend) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            error!("Error setting up the backend client: {e}");
            exit(-1);
        }
    };
    info!("Talking to {}", store.base_url());

    let notifier = Notifier::new(Duration::from_millis(config.ui.notification_ttl_ms));

    if let Some(input) = &args.one_off {
        let cli = AdminCli::new(store, &config, notifier).with_format(OutputFormat::Json);
        if let Err(e) = cli.run_one_off(input, io::stdout(), args.yes).await {
            if !e.is_reported() {
                eprintln!("{e}");
            }
            exit(1);
        }
        return;
    }

    let cli = AdminCli::new(store, &config, notifier);
    if let Err(e) = cli.repl_loop().await {
        error!("{e}");
        exit(1);
    }
}
