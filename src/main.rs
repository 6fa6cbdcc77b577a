use clap::Parser;
use plandoc::cli::commands::Cli;
use plandoc::cli::handlers;
use tracing_subscriber::EnvFilter;

/// RUST_LOG wins, then `[log] filter` from plandoc.toml, then "warn"
fn init_tracing(project_dir: Option<&str>) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        handlers::configured_log_filter(project_dir)
            .and_then(|f| EnvFilter::try_new(f).ok())
            .unwrap_or_else(|| EnvFilter::new("warn"))
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.project_dir.as_deref());

    if let Err(e) = handlers::dispatch(cli) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
