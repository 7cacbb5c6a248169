use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use event_log::{EventLog, EventRecord, Position, Topic};
use tokio::sync::watch;

use crate::error::Result;

const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(1);
const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Reaction logic a [`Participant`] drives against its input topic.
#[async_trait]
pub trait EventHandler: Send + Sync {
    fn name(&self) -> &'static str;

    /// The topic this handler consumes.
    fn topic(&self) -> &Topic;

    async fn handle(&self, record: &EventRecord) -> Result<()>;
}

/// Long-lived consume loop for one handler on one topic.
///
/// The cursor only advances past an event once its handler returned `Ok`;
/// a failing handler is retried from the same cursor after a short delay,
/// so delivery is at-least-once and handlers must be idempotent.
pub struct Participant {
    log: Arc<dyn EventLog>,
    handler: Arc<dyn EventHandler>,
    poll_timeout: Duration,
    retry_delay: Duration,
    shutdown: watch::Receiver<bool>,
}

impl Participant {
    pub fn new(
        log: Arc<dyn EventLog>,
        handler: Arc<dyn EventHandler>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            log,
            handler,
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            retry_delay: DEFAULT_RETRY_DELAY,
            shutdown,
        }
    }

    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Consumes the topic until shutdown is signalled.
    pub async fn run(mut self) {
        let topic = self.handler.topic().clone();
        let name = self.handler.name();
        let mut cursor = Position::start();
        tracing::info!(participant = name, %topic, "participant started");

        loop {
            if *self.shutdown.borrow() {
                break;
            }

            let batch = tokio::select! {
                changed = self.shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
                result = self.log.read_from(&topic, cursor, self.poll_timeout) => result,
            };

            let batch = match batch {
                Ok(batch) => batch,
                Err(err) => {
                    tracing::error!(participant = name, error = %err, "log read failed");
                    tokio::time::sleep(self.retry_delay).await;
                    continue;
                }
            };

            for (position, record) in batch {
                match self.handler.handle(&record).await {
                    Ok(()) => {
                        cursor = position;
                        metrics::counter!(
                            "choreography_events_handled_total",
                            "participant" => name
                        )
                        .increment(1);
                    }
                    Err(err) => {
                        // Do not advance: the event comes around again on
                        // the next read.
                        tracing::error!(
                            participant = name,
                            event_id = %record.id,
                            event_type = %record.event_type,
                            error = %err,
                            "handler failed, retrying from current cursor"
                        );
                        tokio::time::sleep(self.retry_delay).await;
                        break;
                    }
                }
            }
        }

        tracing::info!(participant = name, "participant stopped");
    }
}
