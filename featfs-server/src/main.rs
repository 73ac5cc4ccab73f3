//! featfs - feature configuration namespace shell

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tracing::info;

use featfs_server::registry::builtin;
use featfs_server::settings::{SettingsLoader, DEFAULT_SETTINGS_TOML};
use featfs_server::shell::{report_failure, Outcome, Shell};
use featfs_server::FeatureFs;
use featfs_utils::{init_logging_with_config, FeatfsError, LogConfig, Result};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Settings file (defaults to $XDG_CONFIG_HOME/featfs/config.toml)
    #[arg(short, long, env = "FEATFS_CONFIG")]
    config: Option<PathBuf>,

    /// Read commands from this file instead of stdin
    #[arg(short, long)]
    script: Option<PathBuf>,

    /// Log filter, overrides the settings file and FEATFS_LOG
    #[arg(long)]
    log_filter: Option<String>,

    /// Verbose logging to stderr
    #[arg(short, long)]
    verbose: bool,

    /// Print the default settings file and exit
    #[arg(long)]
    print_default_config: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if args.print_default_config {
        print!("{}", DEFAULT_SETTINGS_TOML.trim_start());
        return;
    }

    if let Err(e) = run(args).await {
        eprintln!("featfs: {}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let settings = SettingsLoader::load_and_validate(args.config.as_deref())?;

    let mut log_config = if args.verbose {
        LogConfig::development()
    } else {
        LogConfig::service(settings.logging.output, &settings.logging.filter)
    };
    if let Some(filter) = args.log_filter {
        log_config.filter = filter;
    }
    init_logging_with_config(log_config)?;

    let registry = Arc::new(builtin::registry()?);
    let fs = Arc::new(FeatureFs::mount(registry, &settings)?);
    let shell = Shell::new(Arc::clone(&fs));

    match &args.script {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .map_err(|e| FeatfsError::FileRead {
                    path: path.clone(),
                    source: e,
                })?;
            run_shell(&shell, file).await?;
        }
        None => run_shell(&shell, tokio::io::stdin()).await?,
    }

    fs.unmount();
    info!("featfs stopped");
    Ok(())
}

/// Execute commands line by line until EOF or `quit`
async fn run_shell<R>(shell: &Shell, input: R) -> Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(input).lines();
    let mut line_no = 0usize;

    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        match shell.run_line(&line) {
            Ok(Some(Outcome::Print(out))) => print!("{}", out),
            Ok(Some(Outcome::Quit)) => break,
            Ok(None) => {}
            Err(e) => eprintln!("{}", report_failure(line_no, &e)),
        }
    }

    Ok(())
}
