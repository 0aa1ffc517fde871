//! Waiting for a player to answer a confirmation prompt.

use std::time::Duration;

use chrono::Utc;
use farmhand_engine::schedule::secs_until;
use farmhand_engine::{ConfirmationInput, ConfirmationState, PendingConfirmation};
use farmhand_types::PlayerId;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::debug;

use crate::context::GameContext;

/// An answer delivered by the front end: who pressed what.
pub type Answer = (PlayerId, ConfirmationInput);

/// Offer `quote` to `player` with the configured answer window.
pub fn offer<Q>(ctx: &GameContext, player: PlayerId, quote: Q) -> PendingConfirmation<Q> {
    PendingConfirmation::offer(player, quote, Utc::now(), ctx.config().confirmation_secs)
}

/// Wait for the prompted player to answer `pending`.
///
/// Answers from other players are skipped. Returns the quote only if the
/// player confirmed before the deadline; a decline, a timeout or a closed
/// channel all yield `None`, and nothing may be mutated in that case.
pub async fn await_confirmation<Q>(
    mut pending: PendingConfirmation<Q>,
    answers: &mut mpsc::Receiver<Answer>,
) -> Option<Q> {
    let wait = Duration::from_secs(secs_until(Utc::now(), pending.expires_at()));
    let deadline = Instant::now().checked_add(wait).unwrap_or_else(Instant::now);

    while pending.state() == ConfirmationState::Offered {
        match tokio::time::timeout_at(deadline, answers.recv()).await {
            Ok(Some((from, input))) => {
                pending.respond(from, input, Utc::now());
            }
            Ok(None) => {
                debug!(player_id = %pending.player_id(), "Confirmation channel closed");
                return None;
            }
            Err(_elapsed) => {
                pending.expire(pending.expires_at());
            }
        }
    }
    debug!(player_id = %pending.player_id(), state = ?pending.state(), "Confirmation settled");
    pending.into_confirmed()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const PLAYER: PlayerId = PlayerId(1);
    const OTHER: PlayerId = PlayerId(2);

    fn offer(secs: u64) -> PendingConfirmation<u32> {
        PendingConfirmation::offer(PLAYER, 42, Utc::now(), secs)
    }

    #[tokio::test]
    async fn confirmed_quote_is_returned() {
        let (tx, mut rx) = mpsc::channel(4);
        tx.send((PLAYER, ConfirmationInput::Confirm)).await.unwrap();
        assert_eq!(await_confirmation(offer(30), &mut rx).await, Some(42));
    }

    #[tokio::test]
    async fn decline_yields_nothing() {
        let (tx, mut rx) = mpsc::channel(4);
        tx.send((PLAYER, ConfirmationInput::Decline)).await.unwrap();
        assert_eq!(await_confirmation(offer(30), &mut rx).await, None);
    }

    #[tokio::test]
    async fn other_players_cannot_answer() {
        let (tx, mut rx) = mpsc::channel(4);
        tx.send((OTHER, ConfirmationInput::Confirm)).await.unwrap();
        tx.send((PLAYER, ConfirmationInput::Decline)).await.unwrap();
        assert_eq!(await_confirmation(offer(30), &mut rx).await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn silence_expires_the_offer() {
        let (_tx, mut rx) = mpsc::channel::<Answer>(4);
        assert_eq!(await_confirmation(offer(30), &mut rx).await, None);
    }

    #[tokio::test]
    async fn closed_channel_yields_nothing() {
        let (tx, mut rx) = mpsc::channel::<Answer>(4);
        drop(tx);
        assert_eq!(await_confirmation(offer(30), &mut rx).await, None);
    }
}
