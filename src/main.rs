//! Post impact monitor: binary entrypoint.
//! Loads configuration, wires fetcher/classifier/notifier and runs the poll
//! loop until Ctrl-C. The browser is released on every exit path.

use std::process::ExitCode;

use post_impact_monitor::{build_monitor, logging, metrics, MonitorConfig};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> ExitCode {
    let cfg = match MonitorConfig::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            // Logging is not set up yet; config decides its format.
            eprintln!("configuration error: {e}");
            return ExitCode::from(2);
        }
    };
    logging::init(cfg.log_format);

    if let Some(addr) = cfg.metrics_addr {
        if let Err(e) = metrics::install_exporter(addr) {
            warn!(error = %e, "metrics exporter disabled");
        }
    }

    let mut monitor = match build_monitor(&cfg) {
        Ok(m) => m,
        Err(e) => {
            error!("startup failed: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    info!(url = %cfg.target_url, "starting post monitor");
    monitor
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "cannot listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        })
        .await;

    monitor.shutdown();
    info!("bye");
    ExitCode::SUCCESS
}
