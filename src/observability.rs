use std::net::SocketAddr;

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: booking rows created by submit. Labels: status.
pub const BOOKINGS_SUBMITTED_TOTAL: &str = "roomd_bookings_submitted_total";

/// Counter: submissions/approvals refused because of an approved overlap.
pub const BOOKING_CONFLICTS_TOTAL: &str = "roomd_booking_conflicts_total";

/// Counter: pending bookings auto-rejected by an approval cascade.
pub const BOOKINGS_AUTO_REJECTED_TOTAL: &str = "roomd_bookings_auto_rejected_total";

/// Counter: notifications handed to the hub.
pub const NOTIFICATIONS_SENT_TOTAL: &str = "roomd_notifications_sent_total";

// ── Sweep metrics ───────────────────────────────────────────────

/// Counter: sweeper ticks. Labels: outcome.
pub const SWEEP_TICKS_TOTAL: &str = "roomd_sweep_ticks_total";

/// Counter: pending bookings expired past their start time.
pub const SWEEP_EXPIRED_PENDING_TOTAL: &str = "roomd_sweep_expired_pending_total";

/// Counter: approved bookings purged after their end time.
pub const SWEEP_PURGED_APPROVED_TOTAL: &str = "roomd_sweep_purged_approved_total";

/// Install the Prometheus metrics exporter on the given port. No-op if port
/// is None.
pub fn init(port: Option<u16>) {
    let Some(port) = port else { return };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .expect("failed to install Prometheus metrics exporter");
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
}
