//! Heartbeat task.
//!
//! Runs alongside the read loop for the lifetime of one connection. The
//! first beat goes out after a random fraction of the interval, the rest at
//! exactly the interval. The task never touches the cache; it only reads
//! the shared sequence number and queues payloads for the writer.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, mpsc};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::protocol::GatewayPayload;
use crate::session::Outbound;

/// Last sequence number seen on the connection, shared with the read loop.
pub(crate) type SharedSequence = Arc<Mutex<Option<u64>>>;

/// Delay before the first heartbeat: uniform in `(0, interval)`.
pub(crate) fn first_delay(interval: Duration) -> Duration {
    let interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
    if interval_ms <= 1 {
        return interval;
    }
    Duration::from_millis(fastrand::u64(1..interval_ms))
}

/// Run the heartbeat loop until `cancel` fires.
///
/// A failed send means the writer is gone; the connection is cancelled so
/// the read loop, which would otherwise sit on a dead transport, returns.
pub(crate) async fn run_heartbeat(
    interval: Duration,
    sequence: SharedSequence,
    outbound: mpsc::Sender<Outbound>,
    cancel: CancellationToken,
) {
    let first = first_delay(interval);
    debug!(
        interval_ms = interval.as_millis(),
        first_delay_ms = first.as_millis(),
        "Heartbeat task started"
    );

    let start = Instant::now().checked_add(first).unwrap_or_else(Instant::now);
    let mut ticker = tokio::time::interval_at(start, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!("Heartbeat task stopped");
                return;
            }
            _ = ticker.tick() => {
                let seq = *sequence.lock().await;
                debug!(seq = ?seq, "Sending heartbeat");
                let payload = GatewayPayload::heartbeat(seq);
                if outbound.send(Outbound::Frame(payload)).await.is_err() {
                    warn!("Heartbeat send failed, cancelling connection");
                    cancel.cancel();
                    return;
                }
            }
        }
    }
}
