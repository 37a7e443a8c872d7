use clap::Parser;
use eyre::WrapErr;
use invwatch::{
    cli::{CLI, Options},
    config::{load_config, merge_cli_overrides},
    initializers::{
        init_alerter, init_collector, init_filter, init_tracing, shutdown_signal, watch_settings,
    },
};
use invwatch_watcher::Watcher;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let CLI { opts } = CLI::parse();

    init_tracing(&opts);

    if let Err(error) = run(opts).await {
        error!(error = ?error, "invwatch failed");
        std::process::exit(1);
    }
}

async fn run(opts: Options) -> eyre::Result<()> {
    let file_config = load_config(opts.config.as_deref()).wrap_err("loading configuration")?;
    let config = merge_cli_overrides(&file_config, &opts);
    config.validate().wrap_err("validating configuration")?;

    let collector = init_collector(&config)?;
    let filter = init_filter(&config);
    let alerter = init_alerter(&config)?;

    let cancel = CancellationToken::new();
    tokio::spawn(shutdown_signal(cancel.clone()));

    info!(
        version = env!("CARGO_PKG_VERSION"),
        interval_secs = config.watch.interval_secs,
        "starting invwatch"
    );

    let mut watcher = Watcher::new(collector, filter, alerter, watch_settings(&config));
    watcher.run(&cancel).await;

    Ok(())
}
