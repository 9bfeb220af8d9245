//! crumb: entry point.

use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use crumb::cli;
use crumb::config::{AppConfig, CliOverrides};

#[derive(Parser)]
#[command(
    name = "crumb",
    about = "crumb: plays Cookie Clicker in a persistent Chromium profile",
    version,
    after_help = "Run 'crumb <command> --help' for details on each command.\nRun 'crumb' with no command to start playing."
)]
struct Cli {
    /// Log level (trace, debug, info, warn, error). RUST_LOG takes precedence.
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// Directory holding the cadence files [env: CRUMB_STATE_DIR].
    #[arg(long, global = true)]
    state_dir: Option<PathBuf>,

    /// Chromium user data directory [env: CRUMB_PROFILE_DIR].
    #[arg(long, global = true)]
    profile_dir: Option<PathBuf>,

    /// Chromium profile name inside the data directory [env: CRUMB_PROFILE].
    #[arg(long, global = true)]
    profile: Option<String>,

    /// Path to the Chrome/Chromium binary [env: CRUMB_CHROMIUM_PATH].
    #[arg(long, global = true)]
    chrome: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Launch the browser and play until Ctrl-C (default).
    Run {
        /// Game URL [env: CRUMB_URL].
        #[arg(long)]
        url: Option<String>,

        /// Run without a visible window [env: CRUMB_HEADLESS].
        #[arg(long)]
        headless: bool,
    },

    /// Inspect or reset the persisted purchase cadences.
    Timings {
        #[command(subcommand)]
        action: TimingsAction,
    },

    /// Check environment and diagnose issues.
    Doctor,

    /// Generate shell completion scripts.
    ///
    /// Examples:
    ///   crumb completions bash > ~/.local/share/bash-completion/completions/crumb
    ///   crumb completions zsh > ~/.zfunc/_crumb
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum TimingsAction {
    /// Print both cadences.
    Show,
    /// Set both cadences back to zero.
    Reset,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Before the filter, so RUST_LOG may come from .env too.
    let dotenv = dotenv::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match dotenv {
        Ok(path) => tracing::debug!(path = %path.display(), "loaded .env"),
        Err(e) if e.not_found() => {
            tracing::debug!("no .env file found, using environment and defaults")
        }
        Err(e) => tracing::warn!(error = %e, "ignoring unreadable .env"),
    }

    let mut overrides = CliOverrides {
        state_dir: cli.state_dir,
        profile_dir: cli.profile_dir,
        profile: cli.profile,
        chrome: cli.chrome,
        ..CliOverrides::default()
    };

    let result = match cli.command.unwrap_or(Commands::Run {
        url: None,
        headless: false,
    }) {
        Commands::Run { url, headless } => {
            overrides.url = url;
            overrides.headless = headless;
            cli::run::run(&AppConfig::resolve(&overrides)).await
        }
        Commands::Timings { action } => {
            let config = AppConfig::resolve(&overrides);
            match action {
                TimingsAction::Show => cli::timings::show(&config.state_dir),
                TimingsAction::Reset => cli::timings::reset(&config.state_dir),
            }
        }
        Commands::Doctor => cli::doctor::run(&AppConfig::resolve(&overrides)).await,
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "crumb", &mut std::io::stdout());
            Ok(())
        }
    };

    // Consistent exit codes: 0=success, 1=error
    if let Err(e) = &result {
        eprintln!("  Error: {e:#}");
        std::process::exit(1);
    }

    result
}
