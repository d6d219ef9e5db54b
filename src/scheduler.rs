//! The background poller that drives scheduled messages to delivery.
//!
//! There are no event-driven timers here; a fixed 1-second tick scans the
//! whole pending list, bounding worst-case dispatch latency to roughly one
//! period past the target instant.

use crate::router::Deps;
use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration};
use tracing::{error, info, warn};

/// How often the pending list is scanned.
pub const POLL_PERIOD: Duration = Duration::from_secs(1);

/// Run the poller until the process exits.
pub fn spawn(deps: Deps) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut tick_timer = interval(POLL_PERIOD);

        loop {
            tick_timer.tick().await;
            tick(&deps, Utc::now()).await;
        }
    })
}

/// A single pass over the pending list, attempting delivery of everything due
/// at `now`.
///
/// The message store lock is held for the entire pass, so a cancellation
/// racing a dispatch resolves cleanly: either the cancel wins and the message
/// is never sent, or the dispatch wins and the cancel observes not-found.
///
/// Failures leave the entry in place for the next tick. There is no backoff
/// and no attempt limit; a workspace with a permanently broken credential is
/// retried every tick and logged each time.
pub async fn tick(deps: &Deps, now: DateTime<Utc>) {
    let mut messages = deps.messages.lock().await;

    // Snapshot, so removals don't disturb the iteration.
    let due: Vec<_> = messages
        .list()
        .iter()
        .filter(|m| m.schedule_time <= now)
        .cloned()
        .collect();

    for msg in due {
        let token = match deps.tokens.valid_token(&msg.team_id, now).await {
            Ok(t) => t,
            Err(e) => {
                warn!("Skipping scheduled message {} this tick: {}", msg.id, e);
                continue;
            }
        };

        match deps.slack.post_message(&msg.channel, &msg.message, &token).await {
            Ok(_) => {
                info!("Sent scheduled message {}", msg.id);

                // The send has happened; failing to persist the removal here
                // means the same message may be sent again next tick.
                if let Err(e) = messages.remove(&msg.id) {
                    error!(
                        "Sent scheduled message {} but could not remove it, it may be re-sent: {}",
                        msg.id, e
                    );
                }
            }
            Err(e) => warn!("Failed to send scheduled message {}, will retry: {}", msg.id, e),
        }
    }
}
