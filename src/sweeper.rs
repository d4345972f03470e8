use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use crate::engine::Engine;

/// Background task running the two expiry sweeps on a fixed period.
///
/// Each tick is independent: an error is logged and the next tick retries.
/// The pending-expiry watermark only advances on success, so a failed tick's
/// window is re-covered. Reprocessing is harmless because expired rows leave
/// `pending`.
pub async fn run_sweeper(engine: Arc<Engine>, period: Duration) {
    let mut interval = tokio::time::interval(period);
    loop {
        interval.tick().await;
        tick(&engine).await;
    }
}

async fn tick(engine: &Engine) {
    let mut ok = true;

    match engine.expire_overdue_pending().await {
        Ok(expired) if !expired.is_empty() => {
            info!(count = expired.len(), "expired unapproved pending bookings");
        }
        Ok(_) => {}
        Err(e) => {
            ok = false;
            error!("pending-expiry sweep failed: {e}");
        }
    }

    match engine.purge_elapsed_approved().await {
        Ok(purged) if !purged.is_empty() => {
            info!(count = purged.len(), "purged elapsed approved bookings");
        }
        Ok(_) => {}
        Err(e) => {
            ok = false;
            error!("approved-expiry sweep failed: {e}");
        }
    }

    let outcome = if ok { "ok" } else { "error" };
    metrics::counter!(crate::observability::SWEEP_TICKS_TOTAL, "outcome" => outcome).increment(1);
}
