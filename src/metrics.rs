use std::net::SocketAddr;

use metrics::{describe_counter, describe_gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use once_cell::sync::OnceCell;

pub const POLLS: &str = "monitor_polls_total";
pub const FETCH_ERRORS: &str = "monitor_fetch_errors_total";
pub const POSTS_DETECTED: &str = "monitor_posts_detected_total";
pub const CLASSIFY_ERRORS: &str = "monitor_classify_errors_total";
pub const NOTIFICATIONS_SENT: &str = "monitor_notifications_sent_total";
pub const NOTIFICATIONS_SUPPRESSED: &str = "monitor_notifications_suppressed_total";
pub const NOTIFY_ERRORS: &str = "monitor_notify_errors_total";
pub const LAST_POLL_TS: &str = "monitor_last_poll_ts";

/// One-time metrics registration (so series show up before the first event).
pub fn ensure_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(POLLS, "Poll cycles started.");
        describe_counter!(FETCH_ERRORS, "Fetches that failed or returned unusable data.");
        describe_counter!(POSTS_DETECTED, "New posts detected after seeding.");
        describe_counter!(CLASSIFY_ERRORS, "Classifier calls that failed.");
        describe_counter!(NOTIFICATIONS_SENT, "Emails delivered.");
        describe_counter!(
            NOTIFICATIONS_SUPPRESSED,
            "Posts not emailed because the classifier found no impact."
        );
        describe_counter!(NOTIFY_ERRORS, "Email deliveries that failed.");
        describe_gauge!(LAST_POLL_TS, "Unix ts of the last poll.");
    });
}

/// Install the Prometheus recorder with its own HTTP listener on `addr`.
/// Must be called from inside the tokio runtime.
pub fn install_exporter(addr: SocketAddr) -> anyhow::Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| anyhow::anyhow!("prometheus exporter on {addr}: {e}"))?;
    ensure_described();
    tracing::info!(%addr, "metrics exporter listening");
    Ok(())
}
