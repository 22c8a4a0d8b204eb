use std::{path::PathBuf, process};

use clap::{command, Parser, ValueHint};
use log::{debug, error, info, LevelFilter};
use url::Url;

use plexrate::{
    config::Config,
    error::{ErrorKind, Result},
    library::Library,
    music::{LocalRatings, Osascript},
    reference::SectionRef,
    sync::Engine,
    token::Token,
};

/// Profile to display when not built in release mode.
#[cfg(debug_assertions)]
const BUILD_PROFILE: &str = "debug";
/// Profile to display when not built release mode.
#[cfg(not(debug_assertions))]
const BUILD_PROFILE: &str = "release";

/// Group name for mutually exclusive logging options.
const ARGS_GROUP_LOGGING: &str = "logging";

/// Exit status after an interrupt, as shells report SIGINT.
const EXIT_INTERRUPTED: i32 = 130;

/// Command line arguments as parsed by `clap`.
#[derive(Clone, Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Plex Media Server URL
    #[arg(long, env = "PLEX_URL", value_hint = ValueHint::Url, default_value = "http://localhost:32400")]
    url: Url,

    /// Plex authentication token
    ///
    /// Takes precedence over the secrets file.
    #[arg(long, env = "PLEX_TOKEN", hide_env_values = true)]
    token: Option<Token>,

    /// Secrets file with a `token` key
    ///
    /// Ensure that this file is kept secure and not shared publicly, as it
    /// contains a token that grants access to your Plex server.
    #[arg(short, long, value_name = "FILE", value_hint = ValueHint::FilePath, default_value = "secrets.toml")]
    secrets_file: PathBuf,

    /// Key of the music library section to sync
    #[arg(long, env = "PLEX_SECTION")]
    section: SectionRef,

    /// Log what would be written, but write nothing
    #[arg(short = 'n', long, default_value_t = false)]
    dry_run: bool,

    /// Overwrite existing Plex ratings that differ from Apple Music
    #[arg(long, default_value_t = false)]
    overwrite: bool,

    /// Suppresses all output except warnings and errors.
    #[arg(short, long, default_value_t = false, group = ARGS_GROUP_LOGGING)]
    quiet: bool,

    /// Enable verbose logging
    ///
    /// Specify twice for trace logging.
    #[arg(short, long, action = clap::ArgAction::Count, group = ARGS_GROUP_LOGGING)]
    verbose: u8,
}

/// Initializes the logger facade.
///
/// The logging level is determined as follows, in order of precedence from
/// highest to lowest:
/// 1. Command line arguments
/// 2. `RUST_LOG` environment variable
/// 3. Hard coded default
///
/// # Panics
///
/// Panics when a logger facade is already initialized.
fn init_logger(config: &Args) {
    let mut logger = env_logger::Builder::from_env(
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "info"),
    );

    if config.quiet || config.verbose > 0 {
        let level = match config.verbose {
            // Quiet and verbose are mutually exclusive.
            0 => LevelFilter::Warn,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        };

        // Filter log messages of external crates.
        logger.filter_module("plexrate", level);
    }

    logger.init();
}

/// Resolves the token from the command line or the secrets file.
fn load_token(args: &Args) -> Result<Token> {
    if let Some(token) = &args.token {
        return Ok(token.clone());
    }

    let token = Token::from_file(&args.secrets_file);
    if let Err(ref e) = token {
        if e.kind == ErrorKind::NotFound {
            info!(
                "set PLEX_TOKEN, pass --token or put your token in {}",
                args.secrets_file.display()
            );
        }
    }

    token
}

async fn run(args: Args) -> Result<()> {
    let token = load_token(&args)?;

    let mut config = Config::new(args.url, token, args.section);
    config.dry_run = args.dry_run;
    config.overwrite = args.overwrite;

    let library = Library::new(&config)?;
    let ratings = LocalRatings::new(Osascript::new());

    Engine::new(&config, library, ratings).run().await?;
    Ok(())
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logger(&args);

    // Dump command line arguments before we do anything more.
    debug!("Command {args:#?}");

    let cmd = command!();
    let name = cmd.get_name().to_string();
    let version = cmd.get_version().unwrap_or("UNKNOWN").to_string();

    info!("starting {name}/{version}; {BUILD_PROFILE}");

    // Cancellation is external only: on interrupt the run is dropped where
    // it stands, between or during requests.
    tokio::select! {
        biased;

        _ = tokio::signal::ctrl_c() => {
            info!("interrupted, stopping");
            process::exit(EXIT_INTERRUPTED);
        }

        result = run(args) => {
            if let Err(e) = result {
                error!("{e}");
                process::exit(1);
            }
        }
    }
}
