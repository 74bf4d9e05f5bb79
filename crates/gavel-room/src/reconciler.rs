//! The room fold: server events plus local bid intents in, one
//! authoritative room state out.
//!
//! The reconciler is plain synchronous state. It never does I/O and never
//! reads the clock itself; callers pass `now` in. The room actor drives it
//! from a single task, which keeps every mutation in arrival order.

use std::collections::{BTreeMap, VecDeque};
use std::time::Instant;

use gavel_protocol::{BidOutcome, Lot, LotId, Participant, RoomEvent, RoomId, RoomStatus, UserId};
use tracing::{debug, info, warn};

use crate::{
    BidEvent, LotResult, PendingBid, RankEntry, ReconcilerConfig, RoomError, RoomSnapshot,
};

/// Live state of one auction room.
#[derive(Debug, Clone)]
pub struct RoomReconciler {
    room_id: RoomId,
    config: ReconcilerConfig,
    status: RoomStatus,
    active_lot: Option<Lot>,
    queue: VecDeque<Lot>,
    ranking: Vec<RankEntry>,
    history: VecDeque<BidEvent>,
    participants: BTreeMap<UserId, Participant>,
    pending: Option<PendingBid>,
    /// The local bid that timed out, kept whole so only its own bidder's
    /// event clears it.
    unconfirmed: Option<PendingBid>,
    seconds_remaining: Option<u64>,
    results: VecDeque<LotResult>,
}

impl RoomReconciler {
    /// Creates an empty room in [`RoomStatus::Waiting`].
    pub fn new(room_id: RoomId, config: ReconcilerConfig) -> Self {
        Self {
            room_id,
            config: config.validated(),
            status: RoomStatus::Waiting,
            active_lot: None,
            queue: VecDeque::new(),
            ranking: Vec::new(),
            history: VecDeque::new(),
            participants: BTreeMap::new(),
            pending: None,
            unconfirmed: None,
            seconds_remaining: None,
            results: VecDeque::new(),
        }
    }

    /// Seeds the status, typically from the room as fetched over HTTP.
    pub fn with_status(mut self, status: RoomStatus) -> Self {
        self.status = status;
        self
    }

    /// Seeds the active lot.
    pub fn with_active_lot(mut self, lot: Lot) -> Self {
        self.active_lot = Some(admit(lot));
        self
    }

    pub fn room_id(&self) -> RoomId {
        self.room_id
    }

    pub fn status(&self) -> RoomStatus {
        self.status
    }

    pub fn active_lot(&self) -> Option<&Lot> {
        self.active_lot.as_ref()
    }

    pub fn pending(&self) -> Option<&PendingBid> {
        self.pending.as_ref()
    }

    pub fn unconfirmed(&self) -> Option<u64> {
        self.unconfirmed.map(|p| p.amount)
    }

    pub fn seconds_remaining(&self) -> Option<u64> {
        self.seconds_remaining
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// When the pending bid, if any, stops waiting for confirmation.
    pub fn pending_deadline(&self) -> Option<Instant> {
        self.pending
            .map(|p| p.submitted_at + self.config.pending_timeout)
    }

    /// A copy of the current state.
    pub fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            room_id: self.room_id,
            status: self.status,
            active_lot: self.active_lot.clone(),
            queue: self.queue.iter().cloned().collect(),
            ranking: self.ranking.clone(),
            history: self.history.iter().cloned().collect(),
            participants: self.participants.values().cloned().collect(),
            pending: self.pending,
            unconfirmed: self.unconfirmed(),
            seconds_remaining: self.seconds_remaining,
            results: self.results.iter().copied().collect(),
        }
    }

    // -----------------------------------------------------------------
    // Server events
    // -----------------------------------------------------------------

    /// Folds one event into the state.
    ///
    /// Returns `true` if anything changed. Events for other rooms,
    /// global-only events and events that would break an invariant are
    /// logged and dropped.
    pub fn apply(&mut self, event: &RoomEvent) -> bool {
        if event.room_id() != self.room_id {
            debug!(
                room_id = %self.room_id,
                other = %event.room_id(),
                kind = event.kind(),
                "event for another room, ignoring"
            );
            return false;
        }

        match event {
            RoomEvent::RoomStatusChanged { to, .. } => self.on_status(*to),
            RoomEvent::RoomStarted { .. } => self.on_status(RoomStatus::Running),
            RoomEvent::LotActivated { lot, .. } => self.on_lot_activated(lot),
            RoomEvent::LotEnqueued { lot, .. } => self.on_lot_enqueued(lot),
            RoomEvent::BidAccepted {
                user_id,
                amount,
                timestamp,
                ..
            } => self.on_bid_accepted(*user_id, *amount, *timestamp),
            RoomEvent::BidRejected {
                user_id,
                amount,
                timestamp,
                reason,
                ..
            } => self.on_bid_rejected(*user_id, *amount, *timestamp, reason.as_deref()),
            RoomEvent::ParticipantJoined { participant, .. } => {
                self.on_participant_joined(participant)
            }
            RoomEvent::ParticipantLeft { user_id, .. } => self.on_participant_left(*user_id),
            RoomEvent::TimerTick {
                seconds_remaining, ..
            } => self.on_timer_tick(*seconds_remaining),
            RoomEvent::LotEnded {
                lot_id,
                winning_price,
                winner_user_id,
                ..
            } => self.on_lot_ended(*lot_id, *winning_price, *winner_user_id),
            RoomEvent::RoomCreated { .. } => false,
        }
    }

    fn on_status(&mut self, to: RoomStatus) -> bool {
        if !self.status.can_advance_to(to) {
            warn!(
                room_id = %self.room_id,
                from = %self.status,
                %to,
                "status change is not forward, discarding"
            );
            return false;
        }
        info!(room_id = %self.room_id, from = %self.status, %to, "room status changed");
        self.status = to;
        true
    }

    fn on_lot_activated(&mut self, lot: &Lot) -> bool {
        let lot = admit(lot.clone());
        self.queue.retain(|queued| queued.id != lot.id);
        self.ranking.clear();
        self.seconds_remaining = None;
        if self.pending.is_some_and(|p| p.lot_id != lot.id) {
            self.pending = None;
        }
        info!(
            room_id = %self.room_id,
            lot_id = %lot.id,
            start_price = lot.start_price,
            "lot activated"
        );
        self.active_lot = Some(lot);
        true
    }

    fn on_lot_enqueued(&mut self, lot: &Lot) -> bool {
        let known = self.active_lot.as_ref().is_some_and(|a| a.id == lot.id)
            || self.queue.iter().any(|queued| queued.id == lot.id);
        if known {
            debug!(room_id = %self.room_id, lot_id = %lot.id, "lot already known");
            return false;
        }
        self.queue.push_back(admit(lot.clone()));
        true
    }

    fn on_timer_tick(&mut self, seconds_remaining: u64) -> bool {
        if self.seconds_remaining == Some(seconds_remaining) {
            return false;
        }
        self.seconds_remaining = Some(seconds_remaining);
        true
    }

    fn on_lot_ended(
        &mut self,
        lot_id: LotId,
        winning_price: u64,
        winner_user_id: Option<UserId>,
    ) -> bool {
        if self.results.iter().any(|r| r.lot_id == lot_id) {
            debug!(room_id = %self.room_id, %lot_id, "lot already closed");
            return false;
        }

        if self.active_lot.as_ref().is_some_and(|lot| lot.id == lot_id) {
            self.active_lot = None;
            self.ranking.clear();
            self.seconds_remaining = None;
        }
        self.queue.retain(|queued| queued.id != lot_id);
        if self.pending.is_some_and(|p| p.lot_id == lot_id) {
            self.pending = None;
        }

        if self.results.len() == self.config.history_capacity {
            self.results.pop_front();
        }
        self.results.push_back(LotResult {
            lot_id,
            winning_price,
            winner_user_id,
        });
        info!(
            room_id = %self.room_id,
            %lot_id,
            winning_price,
            winner = ?winner_user_id,
            "lot closed"
        );
        true
    }

    fn on_bid_accepted(&mut self, user_id: UserId, amount: u64, timestamp: u64) -> bool {
        let Some(lot) = self.active_lot.as_mut() else {
            warn!(
                room_id = %self.room_id,
                %user_id,
                amount,
                "accepted bid without an active lot, discarding"
            );
            return false;
        };

        let minimum = lot.minimum_next_bid();
        if amount < minimum {
            warn!(
                room_id = %self.room_id,
                %user_id,
                amount,
                minimum,
                "accepted bid below the minimum raise, discarding"
            );
            return false;
        }

        lot.current_price = amount;
        lot.leading_user_id = Some(user_id);

        match self.ranking.iter_mut().find(|e| e.user_id == user_id) {
            Some(entry) => {
                entry.amount = amount;
                entry.timestamp = timestamp;
            }
            None => self.ranking.push(RankEntry {
                user_id,
                amount,
                timestamp,
            }),
        }
        self.ranking.sort_by(|a, b| {
            b.amount
                .cmp(&a.amount)
                .then_with(|| a.timestamp.cmp(&b.timestamp))
        });

        self.record(user_id, amount, timestamp, BidOutcome::Accepted);
        self.confirm(user_id, amount);
        debug!(room_id = %self.room_id, %user_id, amount, "bid accepted");
        true
    }

    fn on_bid_rejected(
        &mut self,
        user_id: UserId,
        amount: u64,
        timestamp: u64,
        reason: Option<&str>,
    ) -> bool {
        self.record(user_id, amount, timestamp, BidOutcome::Rejected);
        self.confirm(user_id, amount);
        debug!(
            room_id = %self.room_id,
            %user_id,
            amount,
            reason = reason.unwrap_or(""),
            "bid rejected"
        );
        true
    }

    fn on_participant_joined(&mut self, participant: &Participant) -> bool {
        let mut joined = participant.clone();
        joined.online = true;

        if joined.is_host {
            for other in self.participants.values_mut() {
                if other.user_id != joined.user_id {
                    other.is_host = false;
                }
            }
        } else if let Some(existing) = self.participants.get(&joined.user_id) {
            joined.is_host = existing.is_host;
        }

        if self.participants.get(&joined.user_id) == Some(&joined) {
            return false;
        }
        debug!(room_id = %self.room_id, user_id = %joined.user_id, "participant joined");
        self.participants.insert(joined.user_id, joined);
        true
    }

    fn on_participant_left(&mut self, user_id: UserId) -> bool {
        match self.participants.get_mut(&user_id) {
            Some(participant) if participant.online => {
                participant.online = false;
                debug!(room_id = %self.room_id, %user_id, "participant left");
                true
            }
            _ => false,
        }
    }

    fn record(&mut self, user_id: UserId, amount: u64, timestamp: u64, outcome: BidOutcome) {
        if self.history.len() == self.config.history_capacity {
            self.history.pop_back();
        }
        self.history.push_front(BidEvent {
            user_id,
            amount,
            timestamp,
            outcome,
        });
    }

    /// Clears local markers that `user_id`'s bid of `amount` answers.
    fn confirm(&mut self, user_id: UserId, amount: u64) {
        if self
            .pending
            .is_some_and(|p| p.user_id == user_id && p.amount == amount)
        {
            self.pending = None;
        }
        if self
            .unconfirmed
            .is_some_and(|p| p.user_id == user_id && p.amount == amount)
        {
            self.unconfirmed = None;
        }
    }

    // -----------------------------------------------------------------
    // Local intents
    // -----------------------------------------------------------------

    /// Registers a local bid as pending after checking it against the
    /// current state.
    ///
    /// Leaves price and leader untouched; only a `BidAccepted` event moves
    /// them.
    pub fn submit_bid(
        &mut self,
        user_id: UserId,
        amount: u64,
        now: Instant,
    ) -> Result<PendingBid, RoomError> {
        if let Some(pending) = self.pending {
            return Err(RoomError::BidPending(pending.amount));
        }
        if !self.status.accepts_bids() {
            return Err(RoomError::ValidationFailed(format!(
                "room is {}, bidding is closed",
                self.status
            )));
        }
        let lot = self.active_lot.as_ref().ok_or(RoomError::NoActiveLot)?;
        let minimum = lot.minimum_next_bid();
        if amount < minimum {
            return Err(RoomError::ValidationFailed(format!(
                "bid must be at least {minimum}"
            )));
        }

        let pending = PendingBid {
            user_id,
            amount,
            lot_id: lot.id,
            submitted_at: now,
        };
        self.pending = Some(pending);
        self.unconfirmed = None;
        debug!(room_id = %self.room_id, %user_id, amount, "bid pending");
        Ok(pending)
    }

    /// Flags the pending bid as unconfirmed once its timeout has passed.
    ///
    /// Returns the expired amount. Nothing is retried.
    pub fn expire_pending(&mut self, now: Instant) -> Option<u64> {
        let deadline = self.pending_deadline()?;
        if now < deadline {
            return None;
        }
        let expired = self.pending.take()?;
        warn!(
            room_id = %self.room_id,
            amount = expired.amount,
            "bid not confirmed in time"
        );
        self.unconfirmed = Some(expired);
        Some(expired.amount)
    }

    /// Drops the pending marker because the bid request itself failed.
    pub fn abandon_pending(&mut self) -> Option<PendingBid> {
        let abandoned = self.pending.take();
        if let Some(p) = &abandoned {
            debug!(room_id = %self.room_id, amount = p.amount, "pending bid abandoned");
        }
        abandoned
    }
}

/// Lifts the price to the opening price and keeps the raise at least 1,
/// so every accepted bid strictly raises the price.
fn admit(mut lot: Lot) -> Lot {
    lot.current_price = lot.current_price.max(lot.start_price);
    lot.min_step = lot.min_step.max(1);
    lot
}
