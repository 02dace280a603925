mod commands;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use commands::{RemoteSettings, EXIT_FAILURE, EXIT_MANIFEST_ERROR, EXIT_STORE_ERROR};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use waveloader_core::{Engine, SyncOptions, DEFAULT_MAX_PARALLEL_FETCHES};
use waveloader_remote::DEFAULT_MANIFEST_TIMEOUT;

#[derive(Debug, Parser)]
#[command(
    name = "waveloader",
    version,
    about = "Self-updating launcher for the wavelet viewer"
)]
struct Cli {
    /// Installation root holding downloaded releases.
    #[arg(long, default_value = "~/.waveloader", global = true)]
    root: String,

    /// Release repository URL (overrides config file).
    #[arg(long, global = true)]
    remote: Option<String>,

    /// Seconds to wait for the release manifest before using what is installed.
    #[arg(long, default_value_t = DEFAULT_MANIFEST_TIMEOUT.as_secs(), global = true)]
    manifest_timeout: u64,

    /// Maximum number of simultaneous downloads.
    #[arg(long, default_value_t = DEFAULT_MAX_PARALLEL_FETCHES, global = true)]
    jobs: usize,

    /// Extra attempts for a download that fails or does not verify.
    #[arg(long, default_value_t = 0, global = true)]
    retries: u32,

    /// Do not contact the release repository.
    #[arg(long, default_value_t = false, global = true)]
    offline: bool,

    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Update to the newest release and launch it (the default).
    Run {
        /// Arguments forwarded to the viewer (after --).
        #[arg(last = true)]
        args: Vec<String>,
    },
    /// Bring the newest release up to date without launching it.
    Update,
    /// List installed releases.
    List,
    /// Check an installed release against the manifest.
    Verify {
        /// Release to check; defaults to the newest installed.
        version: Option<String>,
    },
    /// Generate shell completions for bash, zsh, fish, elvish, or powershell.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
    /// Anything that is not a command runs the viewer with those arguments.
    #[command(external_subcommand)]
    Forward(Vec<String>),
}

fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = Cli::parse();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("WAVELOADER_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let root = expand_tilde(&cli.root);
    let engine = Engine::new(&root).with_options(SyncOptions {
        max_parallel_fetches: cli.jobs,
        fetch_retries: cli.retries,
    });
    let remote = RemoteSettings {
        url: cli.remote,
        manifest_timeout: Duration::from_secs(cli.manifest_timeout),
        offline: cli.offline,
    };
    let json_output = cli.json;

    let result = match cli.command.unwrap_or(Commands::Run { args: Vec::new() }) {
        Commands::Run { args } | Commands::Forward(args) => {
            commands::run::run(&engine, &remote, &args, json_output)
        }
        Commands::Update => commands::update::run(&engine, &remote, json_output),
        Commands::List => commands::list::run(&engine, json_output),
        Commands::Verify { version } => {
            commands::verify::run(&engine, &remote, version.as_deref(), json_output)
        }
        Commands::Completions { shell } => commands::completions::run::<Cli>(shell),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(msg) => {
            eprintln!("error: {msg}");
            let code = if msg.starts_with("manifest error:") {
                EXIT_MANIFEST_ERROR
            } else if msg.starts_with("store error:") || msg.starts_with("store lock:") {
                EXIT_STORE_ERROR
            } else {
                EXIT_FAILURE
            };
            ExitCode::from(code)
        }
    }
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(dirs) = directories::BaseDirs::new() {
            return dirs.home_dir().join(stripped);
        }
    }
    PathBuf::from(path)
}
