use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::db::{ListenerStatus, StatusDatabase};
use crate::error::WalletError;
use crate::flow::{ChainEvent, ChainReader};

const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// What one polling cycle did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TickOutcome {
    /// No cursor yet; started from the current sealed height.
    Initialized { height: u64 },
    /// Processed `from..=to` and published `events` events.
    Advanced { from: u64, to: u64, events: usize },
    /// Nothing new sealed since the last cycle.
    Idle,
    /// Another replica is advancing the cursor.
    Skipped,
}

pub struct ChainListener {
    reader: Arc<dyn ChainReader>,
    db: Arc<StatusDatabase>,
    event_types: Vec<String>,
    interval: Duration,
    max_blocks: u64,
    events: broadcast::Sender<ChainEvent>,
}

impl ChainListener {
    pub fn new(
        reader: Arc<dyn ChainReader>,
        db: Arc<StatusDatabase>,
        event_types: Vec<String>,
        interval: Duration,
        max_blocks: u64,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            reader,
            db,
            event_types,
            interval,
            max_blocks: max_blocks.max(1),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChainEvent> {
        self.events.subscribe()
    }

    pub fn event_types(&self) -> &[String] {
        &self.event_types
    }

    /// Runs one polling cycle.
    ///
    /// Events are fetched without holding the status lock. The lock is then
    /// taken without waiting and the cursor only moves if no other replica
    /// moved it in the meantime. Events are published inside the lock, so a
    /// failed commit means they are fetched and published again next cycle.
    pub async fn tick(&self) -> Result<TickOutcome, WalletError> {
        let latest = self
            .reader
            .latest_sealed_block()
            .await
            .map_err(|e| WalletError::Internal(format!("reading latest sealed block: {}", e)))?
            .height;

        // No row means no cursor yet; a stored height of 0 is a real cursor.
        let snapshot = self.db.listener_status()?;
        let range = match &snapshot {
            Some(status) => {
                if latest <= status.latest_height {
                    return Ok(TickOutcome::Idle);
                }
                let from = status.latest_height + 1;
                let to = latest.min(status.latest_height + self.max_blocks);
                Range::Advance {
                    from,
                    to,
                    events: self.fetch_events(from, to).await?,
                }
            }
            None => Range::Initialize { height: latest },
        };

        let db = self.db.clone();
        let sender = self.events.clone();
        let expected_version = snapshot.as_ref().map(|s| s.version).unwrap_or(0);

        tokio::task::spawn_blocking(move || commit_range(&db, &sender, expected_version, range))
        .await
        .map_err(|e| WalletError::Internal(format!("listener task failed: {}", e)))?
    }

    async fn fetch_events(&self, from: u64, to: u64) -> Result<Vec<ChainEvent>, WalletError> {
        let mut events = Vec::new();
        for event_type in &self.event_types {
            let batch = self
                .reader
                .events_in_range(event_type, from, to)
                .await
                .map_err(|e| {
                    WalletError::Internal(format!("fetching {} events: {}", event_type, e))
                })?;
            events.extend(batch);
        }
        events.sort_by_key(|e| (e.block_height, e.event_index));
        Ok(events)
    }

    /// Polls every `interval` until `cancel` fires.
    pub async fn run(&self, cancel: CancellationToken) {
        log::info!(
            "[ChainEvents] Listening for {} event types every {:?}",
            self.event_types.len(),
            self.interval
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => match self.tick().await {
                    Ok(TickOutcome::Advanced { from, to, events }) => {
                        log::info!("[ChainEvents] Blocks {}..={}: {} events", from, to, events);
                    }
                    Ok(TickOutcome::Initialized { height }) => {
                        log::info!("[ChainEvents] Starting from height {}", height);
                    }
                    Ok(TickOutcome::Skipped) => {
                        log::debug!("[ChainEvents] Another replica holds the cursor, skipping");
                    }
                    Ok(TickOutcome::Idle) => {}
                    Err(e) => log::warn!("[ChainEvents] Cycle failed: {}", e),
                },
            }
        }
        log::info!("[ChainEvents] Stopped");
    }
}

/// Work decided from the unlocked snapshot
enum Range {
    Initialize {
        height: u64,
    },
    Advance {
        from: u64,
        to: u64,
        events: Vec<ChainEvent>,
    },
}

/// Applies `range` provided the status is still at `expected_version`:
/// either adopts the starting height, or publishes the events and moves the
/// cursor. Contention and a moved cursor are `Skipped`.
fn commit_range(
    db: &StatusDatabase,
    sender: &broadcast::Sender<ChainEvent>,
    expected_version: i64,
    range: Range,
) -> Result<TickOutcome, WalletError> {
    let mut outcome = TickOutcome::Idle;
    let locked = db.with_exclusive_status(|status: &mut ListenerStatus| {
        // A row created by this call starts at version 0, matching a missing snapshot.
        if status.version != expected_version {
            return Err(WalletError::LockContention);
        }
        match range {
            Range::Initialize { height } => {
                status.latest_height = height;
                outcome = TickOutcome::Initialized { height };
            }
            Range::Advance { from, to, events } => {
                let count = events.len();
                for event in events {
                    // No subscribers is not an error.
                    let _ = sender.send(event);
                }
                status.latest_height = to;
                outcome = TickOutcome::Advanced {
                    from,
                    to,
                    events: count,
                };
            }
        }
        Ok(())
    });

    match locked {
        Ok(_) => Ok(outcome),
        Err(WalletError::LockContention) => Ok(TickOutcome::Skipped),
        Err(e) => Err(e),
    }
}
