use async_trait::async_trait;
use schemawatch::dispatch::NotificationPayload;
use schemawatch::NotificationSender;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};

/// A mock sender that records every delivery it receives.
#[derive(Clone, Debug, Default)]
pub struct RecordingSender {
    pub sent: Arc<Mutex<Vec<(String, NotificationPayload)>>>,
}

impl RecordingSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<(String, NotificationPayload)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationSender for RecordingSender {
    async fn send(&self, target: &str, payload: &NotificationPayload) -> anyhow::Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((target.to_string(), payload.clone()));
        Ok(())
    }
}

/// A mock sender that can be told to fail, recording attempts either way.
#[derive(Clone, Debug, Default)]
pub struct FailableSender {
    pub fail_on_send: Arc<AtomicBool>,
    pub attempts: Arc<Mutex<Vec<String>>>,
}

impl FailableSender {
    pub fn failing() -> Self {
        let sender = Self::default();
        sender.set_fail_on_send(true);
        sender
    }

    pub fn set_fail_on_send(&self, fail: bool) {
        self.fail_on_send.store(fail, Ordering::SeqCst);
    }

    pub fn attempts(&self) -> usize {
        self.attempts.lock().unwrap().len()
    }
}

#[async_trait]
impl NotificationSender for FailableSender {
    async fn send(&self, target: &str, _payload: &NotificationPayload) -> anyhow::Result<()> {
        self.attempts.lock().unwrap().push(target.to_string());
        if self.fail_on_send.load(Ordering::SeqCst) {
            anyhow::bail!("webhook unreachable");
        }
        Ok(())
    }
}
