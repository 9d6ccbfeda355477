use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use relwatch::delta::Fetcher;
use relwatch::fetch::{fetch_all, rate_limited_count};
use relwatch::github::OctocrabSource;
use relwatch::registry::{Registry, RepositoryId};
use relwatch::store::{DiskStore, KeyValueStore};
use relwatch::ValidationError;

const EXIT_SUCCESS: i32 = 0;
const EXIT_NETWORK: i32 = 2;
const EXIT_RATE_LIMIT: i32 = 3;
const EXIT_CONFIG: i32 = 4;
const EXIT_VALIDATION: i32 = 5;

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show every watched repository (default if no subcommand)
    List {
        /// Also list the pull requests behind each count
        #[arg(short, long)]
        prs: bool,
    },
    /// Start watching a repository
    Add {
        /// Repository in owner/name form
        repo: String,
    },
    /// Stop watching a repository
    Remove {
        /// Repository in owner/name form
        repo: String,
    },
    /// Refetch every repository, ignoring cached results
    Refresh {
        /// Also list the pull requests behind each count
        #[arg(short, long)]
        prs: bool,
    },
    /// Open a repository's closed-unmerged search in the browser
    Open {
        /// Repository in owner/name form
        repo: String,
    },
    /// Interactive dashboard
    Tui,
    /// Delete the registry and all cached results
    ClearCache,
}

#[derive(Parser, Debug)]
#[command(name = "relwatch")]
#[command(about = "Closed, unmerged pull requests since each repository's latest release", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to config file (defaults to ~/.config/relwatch/config.yaml)
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

fn exit_for_validation(e: &anyhow::Error) -> ! {
    eprintln!("{}", e);
    if e.downcast_ref::<ValidationError>().is_some() {
        std::process::exit(EXIT_VALIDATION);
    }
    std::process::exit(EXIT_CONFIG);
}

fn build_fetcher(config: &relwatch::config::Config, store: Arc<dyn KeyValueStore>) -> Fetcher {
    let token = relwatch::config::get_token_from_env();
    log::debug!(
        "GitHub access: {}",
        if token.is_some() { "token" } else { "anonymous (60 requests/hour)" }
    );

    let client = match relwatch::github::create_client(token.as_deref(), config.api_base_url.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to create GitHub client: {:#}", e);
            std::process::exit(EXIT_NETWORK);
        }
    };

    Fetcher::new(Arc::new(OctocrabSource::new(client)), store)
}

#[tokio::main]
async fn main() {
    // Install rustls crypto provider (required for rustls 0.23+)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    let cli = Cli::parse();
    relwatch::stderr_buffer::init_logging(cli.verbose);
    let command = cli.command.unwrap_or(Commands::List { prs: false });
    let start_time = Instant::now();

    // Load config
    let config_path = cli.config.map(PathBuf::from);
    let config = match relwatch::config::load_config(config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {:#}", e);
            std::process::exit(EXIT_CONFIG);
        }
    };

    let store_path = config
        .cache_dir
        .clone()
        .unwrap_or_else(relwatch::store::get_cache_path);
    log::debug!("Store: {}", store_path.display());

    if matches!(command, Commands::ClearCache) {
        if let Err(e) = relwatch::store::clear_cache(&store_path) {
            eprintln!("{:#}", e);
            std::process::exit(EXIT_CONFIG);
        }
        println!("Cleared {}", store_path.display());
        std::process::exit(EXIT_SUCCESS);
    }

    let store: Arc<dyn KeyValueStore> = Arc::new(DiskStore::new(store_path));
    let mut registry = match Registry::load(store.clone()) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Failed to load watched repositories: {:#}", e);
            std::process::exit(EXIT_CONFIG);
        }
    };

    let use_colors = relwatch::output::should_use_colors();

    let (repos, force, show_prs) = match command {
        Commands::List { prs } => (registry.list().to_vec(), false, prs),
        Commands::Refresh { prs } => (registry.list().to_vec(), true, prs),
        Commands::Add { repo } => match registry.add(&repo) {
            Ok(id) => {
                println!("Watching {}", id);
                (vec![id], false, true)
            }
            Err(e) => exit_for_validation(&e),
        },
        Commands::Remove { repo } => {
            let id = match RepositoryId::parse(&repo) {
                Ok(id) => id,
                Err(e) => exit_for_validation(&e.into()),
            };
            match registry.remove(&id) {
                Ok(true) => println!("Stopped watching {}", id),
                Ok(false) => println!("{} was not being watched", id),
                Err(e) => {
                    eprintln!("{:#}", e);
                    std::process::exit(EXIT_CONFIG);
                }
            }
            std::process::exit(EXIT_SUCCESS);
        }
        Commands::Open { repo } => {
            let id = match RepositoryId::parse(&repo) {
                Ok(id) => id,
                Err(e) => exit_for_validation(&e.into()),
            };
            let fetcher = build_fetcher(&config, store);
            let snapshot = fetcher.cached_entry(&id).map(|entry| entry.snapshot);
            let url = relwatch::browser::target_url(&id, snapshot.as_ref());
            if let Err(e) = relwatch::browser::open_url(&url) {
                eprintln!("{:#}", e);
                std::process::exit(EXIT_NETWORK);
            }
            println!("Opening {}", url);
            std::process::exit(EXIT_SUCCESS);
        }
        Commands::Tui => {
            let interval = match config.auto_refresh() {
                Ok(i) => i,
                Err(e) => {
                    eprintln!("Config error: {:#}", e);
                    std::process::exit(EXIT_CONFIG);
                }
            };
            let fetcher = Arc::new(build_fetcher(&config, store));
            let app = relwatch::tui::App::new(registry, fetcher, interval);
            if let Err(e) = relwatch::tui::run_tui(app).await {
                eprintln!("TUI error: {:#}", e);
                std::process::exit(EXIT_NETWORK);
            }
            std::process::exit(EXIT_SUCCESS);
        }
        Commands::ClearCache => unreachable!("handled before the store is opened"),
    };

    let fetcher = build_fetcher(&config, store);
    let results = fetch_all(&fetcher, &repos, force).await;

    let now = chrono::Utc::now();
    let output = relwatch::output::format_dashboard(&results, show_prs, use_colors, now, |repo| {
        fetcher.cached_entry(repo).and_then(|entry| entry.fetched_at())
    });
    println!("{}", output);

    log::debug!(
        "Total: {} repositories in {:?}",
        results.len(),
        start_time.elapsed()
    );

    // Exit non-zero only when nothing could be fetched
    let failed = results.iter().filter(|(_, r)| r.is_err()).count();
    if !results.is_empty() && failed == results.len() {
        if rate_limited_count(&results) > 0 {
            std::process::exit(EXIT_RATE_LIMIT);
        }
        std::process::exit(EXIT_NETWORK);
    }

    std::process::exit(EXIT_SUCCESS);
}
