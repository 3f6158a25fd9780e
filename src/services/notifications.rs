//! Outbound order events.
//!
//! Delivery is fire-and-forget: [`publish`] logs emitter failures and never
//! hands them back to the order operation that triggered the event.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use socketioxide::SocketIo;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::OrderEvent;

#[async_trait]
pub trait NotificationEmitter: Send + Sync {
    async fn emit(&self, event: &OrderEvent) -> Result<()>;
}

/// Room every connection of a user joins.
pub fn user_room(user_id: Uuid) -> String {
    format!("user_{}", user_id)
}

pub async fn publish(emitter: &dyn NotificationEmitter, event: OrderEvent) {
    if let Err(err) = emitter.emit(&event).await {
        tracing::warn!(
            "Failed to emit {} for order #{}: {:?}",
            event.kind.event_name(),
            event.order_id,
            err
        );
    }
}

/// Emits events to the owning user's Socket.IO room.
#[derive(Clone)]
pub struct SocketIoEmitter {
    io: SocketIo,
}

impl SocketIoEmitter {
    pub fn new(io: SocketIo) -> Self {
        Self { io }
    }
}

#[async_trait]
impl NotificationEmitter for SocketIoEmitter {
    async fn emit(&self, event: &OrderEvent) -> Result<()> {
        self.io
            .to(user_room(event.user_id))
            .emit(event.kind.event_name(), event)
            .await
            .map_err(|err| anyhow!("Socket.IO broadcast failed: {err}"))
    }
}

/// Keeps every emitted event in memory.
#[derive(Default)]
pub struct RecordingEmitter {
    events: Mutex<Vec<OrderEvent>>,
}

impl RecordingEmitter {
    pub async fn events(&self) -> Vec<OrderEvent> {
        self.events.lock().await.clone()
    }
}

#[async_trait]
impl NotificationEmitter for RecordingEmitter {
    async fn emit(&self, event: &OrderEvent) -> Result<()> {
        self.events.lock().await.push(event.clone());
        Ok(())
    }
}
