//! Pending confirmation of an interactive quote.
//!
//! ```text
//! Offered --confirm--> Confirmed
//!    |  \--decline--> Declined
//!    \----timeout---> Expired
//! ```
//!
//! Terminal states never change again. Holding a confirmed quote grants
//! nothing by itself: the operation re-validates every precondition inside
//! its transaction before committing.

use chrono::{DateTime, Utc};

use farmhand_types::PlayerId;

use crate::schedule::add_secs;

/// Default seconds a player has to answer a prompt.
pub const DEFAULT_CONFIRMATION_SECS: u64 = 30;

/// Where a pending confirmation stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmationState {
    /// Waiting for the player.
    Offered,
    /// The player accepted.
    Confirmed,
    /// The player declined.
    Declined,
    /// Nobody answered in time.
    Expired,
}

impl ConfirmationState {
    /// Whether the state can no longer change.
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Offered)
    }
}

/// A player's answer to a prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationInput {
    /// Accept the quote.
    Confirm,
    /// Reject the quote.
    Decline,
}

/// A quote offered to one player and awaiting their answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingConfirmation<Q> {
    player_id: PlayerId,
    quote: Q,
    expires_at: DateTime<Utc>,
    state: ConfirmationState,
}

impl<Q> PendingConfirmation<Q> {
    /// Offer `quote` to `player_id`, expiring after `timeout_secs`.
    pub fn offer(player_id: PlayerId, quote: Q, now: DateTime<Utc>, timeout_secs: u64) -> Self {
        Self {
            player_id,
            quote,
            expires_at: add_secs(now, timeout_secs),
            state: ConfirmationState::Offered,
        }
    }

    /// Current state.
    pub const fn state(&self) -> ConfirmationState {
        self.state
    }

    /// The offered quote.
    pub const fn quote(&self) -> &Q {
        &self.quote
    }

    /// Player the quote was offered to.
    pub const fn player_id(&self) -> PlayerId {
        self.player_id
    }

    /// When the offer lapses.
    pub const fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Apply an answer. Answers from other players are ignored, and an
    /// answer arriving after the deadline expires the offer.
    pub fn respond(
        &mut self,
        from: PlayerId,
        input: ConfirmationInput,
        now: DateTime<Utc>,
    ) -> ConfirmationState {
        if self.state.is_terminal() || from != self.player_id {
            return self.state;
        }
        self.state = if now >= self.expires_at {
            ConfirmationState::Expired
        } else {
            match input {
                ConfirmationInput::Confirm => ConfirmationState::Confirmed,
                ConfirmationInput::Decline => ConfirmationState::Declined,
            }
        };
        self.state
    }

    /// Expire the offer if its deadline has passed.
    pub fn expire(&mut self, now: DateTime<Utc>) -> ConfirmationState {
        if self.state == ConfirmationState::Offered && now >= self.expires_at {
            self.state = ConfirmationState::Expired;
        }
        self.state
    }

    /// The quote, only if the player confirmed.
    pub fn into_confirmed(self) -> Option<Q> {
        (self.state == ConfirmationState::Confirmed).then_some(self.quote)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn t0() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn pending() -> PendingConfirmation<u32> {
        PendingConfirmation::offer(PlayerId(1), 500, t0(), DEFAULT_CONFIRMATION_SECS)
    }

    #[test]
    fn confirm_in_time() {
        let mut p = pending();
        let state = p.respond(PlayerId(1), ConfirmationInput::Confirm, add_secs(t0(), 5));
        assert_eq!(state, ConfirmationState::Confirmed);
        assert_eq!(p.into_confirmed(), Some(500));
    }

    #[test]
    fn late_answer_expires() {
        let mut p = pending();
        let state = p.respond(PlayerId(1), ConfirmationInput::Confirm, add_secs(t0(), 30));
        assert_eq!(state, ConfirmationState::Expired);
        assert_eq!(p.into_confirmed(), None);
    }

    #[test]
    fn other_players_cannot_answer() {
        let mut p = pending();
        assert_eq!(
            p.respond(PlayerId(2), ConfirmationInput::Confirm, t0()),
            ConfirmationState::Offered
        );
    }

    #[test]
    fn terminal_states_are_sticky() {
        let mut p = pending();
        p.respond(PlayerId(1), ConfirmationInput::Decline, t0());
        p.respond(PlayerId(1), ConfirmationInput::Confirm, t0());
        assert_eq!(p.state(), ConfirmationState::Declined);
        assert_eq!(p.expire(add_secs(t0(), 100)), ConfirmationState::Declined);
    }

    #[test]
    fn timer_expiry() {
        let mut p = pending();
        assert_eq!(p.expire(add_secs(t0(), 29)), ConfirmationState::Offered);
        assert_eq!(p.expire(add_secs(t0(), 31)), ConfirmationState::Expired);
    }
}
