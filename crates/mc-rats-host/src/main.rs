use std::sync::Arc;
use std::time::Duration;

use mc_rats::RatsPlugin;
use mc_rats_host::console::{handle_console_command, ConsoleOutcome};
use mc_rats_host::{Host, HostConfig};
use tokio::io::AsyncBufReadExt;
use tracing::info;

#[tokio::main]
async fn main() {
    let config = match HostConfig::load("host.toml") {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load host.toml: {e}");
            std::process::exit(1);
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    info!(
        "mc-rats host v{} starting ({} TPS, plugin dir {})",
        env!("CARGO_PKG_VERSION"),
        config.host.tick_rate,
        config.host.plugin_dir
    );

    let mut host = match Host::from_config(&config) {
        Ok(h) => h,
        Err(e) => {
            eprintln!("Invalid host.toml: {e}");
            std::process::exit(1);
        }
    };
    host.register(Box::new(RatsPlugin::new()));
    host.start();

    let (shutdown_tx, mut shutdown_rx) = tokio::sync::watch::channel(false);
    let shutdown_tx = Arc::new(shutdown_tx);

    // Handle Ctrl+C
    let shutdown_tx_ctrlc = shutdown_tx.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Shutdown signal received");
        let _ = shutdown_tx_ctrlc.send(true);
    });

    // Console REPL: read lines from stdin
    let (console_tx, mut console_rx) = tokio::sync::mpsc::channel::<String>(32);
    tokio::spawn(async move {
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        let mut lines = stdin.lines();
        while let Ok(Some(line)) = lines.next_line().await {
            let line = line.trim().to_string();
            if !line.is_empty() && console_tx.send(line).await.is_err() {
                break;
            }
        }
    });

    let tick_millis = 1000 / u64::from(config.host.tick_rate.max(1));
    let mut tick_interval = tokio::time::interval(Duration::from_millis(tick_millis));
    loop {
        tokio::select! {
            _ = tick_interval.tick() => host.tick(),
            Some(line) = console_rx.recv() => {
                match handle_console_command(&mut host, &line) {
                    ConsoleOutcome::Reply(text) => {
                        if !text.is_empty() {
                            println!("{text}");
                        }
                    }
                    ConsoleOutcome::Stop => break,
                }
            }
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    break;
                }
            }
        }
    }

    host.stop();
    info!("Host shut down.");
}
