//! # Notifier
//!
//! Hand-off of committed change events to whatever renders and delivers
//! notifications. Delivery is best-effort: the coordinator logs a failure
//! and never undoes the commit because of it.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::event::ChangeEvent;

/// Errors returned by a [`Notifier`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotifyError {
    /// The receiving side of the channel is gone.
    #[error("notification channel closed")]
    ChannelClosed,

    #[error("notification delivery failed: {0}")]
    Delivery(String),
}

/// Consumer of change events.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, event: &ChangeEvent) -> Result<(), NotifyError>;
}

#[async_trait]
impl<T: Notifier + ?Sized> Notifier for Arc<T> {
    async fn notify(&self, event: &ChangeEvent) -> Result<(), NotifyError> {
        (**self).notify(event).await
    }
}

/// Writes each event as a structured log line.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, event: &ChangeEvent) -> Result<(), NotifyError> {
        let fields: Vec<&str> = event.changes.fields.iter().map(|c| c.field.label()).collect();
        tracing::info!(
            event_id = %event.event_id,
            subscription = %event.subscription_id,
            partner = %event.partner.name,
            status_old = %event.status.old,
            status_new = %event.status.new,
            fields = ?fields,
            "subscription updated"
        );
        Ok(())
    }
}

/// Forwards events over a bounded channel to a delivery task.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: mpsc::Sender<ChangeEvent>,
}

impl ChannelNotifier {
    /// Create a notifier and the receiver the delivery task reads from.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<ChangeEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

#[async_trait]
impl Notifier for ChannelNotifier {
    async fn notify(&self, event: &ChangeEvent) -> Result<(), NotifyError> {
        self.tx
            .send(event.clone())
            .await
            .map_err(|_| NotifyError::ChannelClosed)
    }
}
