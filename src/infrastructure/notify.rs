use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::event::MarketEvent;
use crate::domain::ports::Notifier;

/// Emits every event as a structured log line. The default sink when the
/// hosting service has no push channel wired in.
#[derive(Default, Clone)]
pub struct TracingNotifier;

impl TracingNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Notifier for TracingNotifier {
    async fn notify(&self, event: MarketEvent) {
        tracing::info!(
            recipient = %event.recipient,
            kind = event.kind.as_str(),
            deal_id = ?event.deal_id,
            message = %event.message,
            "notification"
        );
    }
}

/// Records events in order for inspection. Test sink.
#[derive(Default)]
pub struct InMemoryNotifier {
    events: Mutex<Vec<MarketEvent>>,
}

impl InMemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<MarketEvent> {
        self.events.lock().expect("notifier mutex poisoned").clone()
    }
}

#[async_trait]
impl Notifier for InMemoryNotifier {
    async fn notify(&self, event: MarketEvent) {
        self.events
            .lock()
            .expect("notifier mutex poisoned")
            .push(event);
    }
}
