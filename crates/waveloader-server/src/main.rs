use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use waveloader_server::Repository;

#[derive(Parser)]
#[command(name = "waveloader-server", about = "Static release repository for waveloader")]
struct Cli {
    /// Port to listen on.
    #[arg(long, default_value_t = 8322)]
    port: u16,

    /// Directory holding `<version>/<directory>/<files>` release trees.
    #[arg(long, default_value = "./waveloader-releases")]
    data_dir: PathBuf,

    /// Regenerate manifest.yaml from the data directory before serving.
    #[arg(long, default_value_t = false)]
    generate_manifest: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    if cli.generate_manifest {
        if let Err(e) = waveloader_server::write_manifest(&cli.data_dir) {
            error!("manifest generation failed: {e}");
            return ExitCode::FAILURE;
        }
    }

    let addr = format!("0.0.0.0:{}", cli.port);
    info!("starting waveloader-server on {addr}");
    info!("data directory: {}", cli.data_dir.display());

    let repo = Arc::new(Repository::new(cli.data_dir));
    match waveloader_server::run_server(&repo, &addr) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
