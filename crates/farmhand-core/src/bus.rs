//! NATS pub/sub for keeping serving processes consistent.
//!
//! Market re-rolls, catalog reloads and the field guard are process-wide
//! state. The process that triggers a change applies it locally and
//! publishes it; every other process applies the same change when the
//! event arrives. Events carry the origin process id so a process skips
//! its own broadcasts.
//!
//! # Subjects
//!
//! | Subject | Event |
//! |---------|-------|
//! | `farmhand.bus.market` | [`BusEvent::MarketRolled`] |
//! | `farmhand.bus.catalog` | [`BusEvent::CatalogReloaded`] |
//! | `farmhand.bus.guard` | [`BusEvent::GuardEnabled`] |

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use farmhand_catalog::Revision;
use farmhand_types::ItemId;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::context::GameContext;
use crate::error::ServiceError;

/// Wildcard matching every bus subject.
pub const ALL_SUBJECTS: &str = "farmhand.bus.*";

/// A process-wide change broadcast to every serving process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BusEvent {
    /// Market prices were re-rolled.
    MarketRolled {
        /// Revision of the snapshot carrying the new prices.
        revision: Revision,
        /// New price of every market item.
        prices: BTreeMap<ItemId, u32>,
    },
    /// The catalog file was reloaded.
    CatalogReloaded {
        /// Revision the reloaded catalog was assigned.
        revision: Revision,
    },
    /// The field guard was raised.
    GuardEnabled {
        /// When the guard drops again.
        until: DateTime<Utc>,
    },
}

impl BusEvent {
    /// Subject the event is published on.
    pub const fn subject(&self) -> &'static str {
        match self {
            Self::MarketRolled { .. } => "farmhand.bus.market",
            Self::CatalogReloaded { .. } => "farmhand.bus.catalog",
            Self::GuardEnabled { .. } => "farmhand.bus.guard",
        }
    }
}

/// Wire envelope of a [`BusEvent`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Process that published the event.
    pub origin: Uuid,
    /// The change.
    pub event: BusEvent,
}

/// NATS client wrapper for cross-process coordination.
#[derive(Debug, Clone)]
pub struct NatsBus {
    client: async_nats::Client,
    origin: Uuid,
}

impl NatsBus {
    /// Connect to a NATS server.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Bus`] if the connection cannot be established.
    pub async fn connect(url: &str) -> Result<Self, ServiceError> {
        info!(url = url, "connecting to NATS server");
        let client = async_nats::connect(url)
            .await
            .map_err(|e| ServiceError::Bus(format!("failed to connect to {url}: {e}")))?;
        let origin = Uuid::now_v7();
        info!(%origin, "NATS connection established");
        Ok(Self { client, origin })
    }

    /// Id of this process on the bus.
    pub const fn origin(&self) -> Uuid {
        self.origin
    }

    /// Broadcast an event to every other process.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Bus`] if serialization or publishing fails.
    pub async fn publish(&self, event: BusEvent) -> Result<(), ServiceError> {
        let subject = event.subject();
        let envelope = Envelope {
            origin: self.origin,
            event,
        };
        let payload = serde_json::to_vec(&envelope)
            .map_err(|e| ServiceError::Bus(format!("failed to serialize event: {e}")))?;
        debug!(subject = subject, "publishing bus event");
        self.client
            .publish(subject, payload.into())
            .await
            .map_err(|e| ServiceError::Bus(format!("failed to publish to {subject}: {e}")))?;
        Ok(())
    }

    /// Subscribe to every bus subject.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Bus`] if the subscription fails.
    pub async fn subscribe(&self) -> Result<async_nats::Subscriber, ServiceError> {
        let subscriber = self
            .client
            .subscribe(ALL_SUBJECTS)
            .await
            .map_err(|e| ServiceError::Bus(format!("failed to subscribe to {ALL_SUBJECTS}: {e}")))?;
        info!(subject = ALL_SUBJECTS, "subscribed to bus events");
        Ok(subscriber)
    }
}

/// Decode a raw payload, skipping events this process published.
pub fn decode(payload: &[u8], own_origin: Uuid) -> Option<BusEvent> {
    match serde_json::from_slice::<Envelope>(payload) {
        Ok(envelope) if envelope.origin == own_origin => None,
        Ok(envelope) => Some(envelope.event),
        Err(e) => {
            warn!(error = %e, "discarding malformed bus event");
            None
        }
    }
}

/// Apply incoming bus events to `ctx` until shutdown or the subscription
/// ends.
pub async fn run_listener(
    ctx: Arc<GameContext>,
    mut subscriber: async_nats::Subscriber,
    origin: Uuid,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            message = subscriber.next() => {
                let Some(message) = message else {
                    warn!("bus subscription closed");
                    break;
                };
                if let Some(event) = decode(&message.payload, origin) {
                    ctx.apply_bus_event(event);
                }
            }
            _ = shutdown.changed() => {
                info!("bus listener shutting down");
                break;
            }
        }
    }
}
