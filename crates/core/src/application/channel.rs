// Update Channel - ordered, non-blocking fan-out of diagnostic events

use tokio::sync::broadcast;
use tracing::{trace, warn};

use super::constants::DEFAULT_CHANNEL_CAPACITY;
use crate::domain::DiagnosticEvent;

/// One-way channel from orchestrators to any number of subscribers
///
/// Publishing never waits on subscribers: a subscriber that falls more than
/// `capacity` events behind loses the oldest ones. There is no replay, so
/// subscribe before starting a session.
#[derive(Clone)]
pub struct UpdateChannel {
    sender: broadcast::Sender<DiagnosticEvent>,
}

impl UpdateChannel {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish an event to all current subscribers
    pub fn publish(&self, event: DiagnosticEvent) {
        if self.sender.receiver_count() == 0 {
            trace!(session_id = %event.session_id, "No subscribers, dropping update");
            return;
        }
        // Only fails when the last receiver vanished in between
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> UpdateSubscription {
        UpdateSubscription {
            receiver: self.sender.subscribe(),
            session_filter: None,
        }
    }

    /// Get number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for UpdateChannel {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

/// Receiving end of an [`UpdateChannel`]
pub struct UpdateSubscription {
    receiver: broadcast::Receiver<DiagnosticEvent>,
    session_filter: Option<String>,
}

impl UpdateSubscription {
    /// Only yield events of one session
    pub fn for_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_filter = Some(session_id.into());
        self
    }

    /// Next event, skipping over any lag; `None` once every publisher is gone
    pub async fn recv(&mut self) -> Option<DiagnosticEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => {
                    if self.accepts(&event) {
                        return Some(event);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped = skipped, "Subscriber lagged, updates dropped");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Receive until the DONE of the filtered session (or channel close)
    pub async fn collect_until_done(&mut self) -> Vec<DiagnosticEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.recv().await {
            let done = event.update.is_terminal();
            events.push(event);
            if done {
                break;
            }
        }
        events
    }

    fn accepts(&self, event: &DiagnosticEvent) -> bool {
        self.session_filter
            .as_deref()
            .map_or(true, |id| event.session_id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DiagnosticUpdate, UpdateType};

    fn event(session: &str, update_type: UpdateType, data: &str) -> DiagnosticEvent {
        DiagnosticEvent::new(session, DiagnosticUpdate::new(update_type, "", data))
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_does_not_block() {
        let channel = UpdateChannel::new(1);
        for i in 0..10 {
            channel.publish(event("s", UpdateType::StepProgress, &i.to_string()));
        }
        assert_eq!(channel.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_fan_out_preserves_order() {
        let channel = UpdateChannel::default();
        let mut a = channel.subscribe();
        let mut b = channel.subscribe();

        channel.publish(event("s", UpdateType::Start, "1"));
        channel.publish(event("s", UpdateType::Done, "2"));

        for sub in [&mut a, &mut b] {
            let data: Vec<_> = sub
                .collect_until_done()
                .await
                .into_iter()
                .map(|e| e.update.data)
                .collect();
            assert_eq!(data, ["1", "2"]);
        }
    }

    #[tokio::test]
    async fn test_lagging_subscriber_skips_oldest() {
        let channel = UpdateChannel::new(2);
        let mut slow = channel.subscribe();

        for i in 0..5 {
            channel.publish(event("s", UpdateType::StepProgress, &i.to_string()));
        }
        drop(channel);

        let mut seen = Vec::new();
        while let Some(e) = slow.recv().await {
            seen.push(e.update.data);
        }
        assert_eq!(seen, ["3", "4"]);
    }

    #[tokio::test]
    async fn test_session_filter() {
        let channel = UpdateChannel::default();
        let mut only_b = channel.subscribe().for_session("b");

        channel.publish(event("a", UpdateType::Start, "a-start"));
        channel.publish(event("b", UpdateType::Start, "b-start"));
        channel.publish(event("a", UpdateType::Done, "a-done"));
        channel.publish(event("b", UpdateType::Done, "b-done"));

        let data: Vec<_> = only_b
            .collect_until_done()
            .await
            .into_iter()
            .map(|e| e.update.data)
            .collect();
        assert_eq!(data, ["b-start", "b-done"]);
    }
}
