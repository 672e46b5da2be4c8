//! Aggregate roots for the signup context.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;
use warband_core::aggregate::AggregateRoot;
use warband_core::catalog::CompositionTemplate;
use warband_core::clock::Clock;
use warband_core::error::DomainError;
use warband_core::event::EventMetadata;
use warband_core::registry::UserId;

use super::events::{
    CloseReason, Occupant, SESSION_CLOSED_EVENT_TYPE, SESSION_OPENED_EVENT_TYPE,
    SLOT_CLAIMED_EVENT_TYPE, SLOT_RELEASED_EVENT_TYPE, SessionClosed, SessionOpened,
    SignupEvent, SignupEventKind, SlotClaimed, SlotReleased,
};

/// Longest lifetime a session may be opened with (30 days).
pub const MAX_SESSION_TTL_SECS: i64 = 30 * 24 * 60 * 60;

/// Converts a lifetime in seconds into a session TTL.
///
/// # Errors
///
/// Returns `DomainError::Validation` unless `secs` lies in
/// `1..=MAX_SESSION_TTL_SECS`.
pub fn session_ttl_from_secs(secs: i64) -> Result<Duration, DomainError> {
    let invalid = || {
        DomainError::Validation(format!(
            "session ttl must be 1 to {MAX_SESSION_TTL_SECS} seconds, got {secs}"
        ))
    };
    if !(1..=MAX_SESSION_TTL_SECS).contains(&secs) {
        return Err(invalid());
    }
    Duration::try_seconds(secs).ok_or_else(invalid)
}

/// One position in a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    /// Role label copied from the template.
    pub role_label: String,
    /// Current holder, if any.
    pub occupant: Option<Occupant>,
}

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// Accepting toggles (until `expires_at`, if set).
    Open,
    /// Terminal.
    Closed(CloseReason),
}

/// Result of a successful toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// The actor took the slot.
    Claimed {
        /// The slot taken.
        slot_index: usize,
    },
    /// The actor left the slot.
    Released {
        /// The slot left.
        slot_index: usize,
    },
}

/// The aggregate root for a signup session.
#[derive(Debug)]
pub struct SignupSession {
    /// Aggregate identifier.
    pub id: Uuid,
    /// Current version (event count).
    pub(crate) version: i64,
    /// Name of the source template.
    pub(crate) template_name: String,
    /// Slots in template order.
    pub(crate) slots: Vec<Slot>,
    /// User that opened the session.
    pub(crate) created_by: Option<UserId>,
    /// When the session was opened.
    pub(crate) opened_at: Option<DateTime<Utc>>,
    /// Expiry instant, if the session has a TTL.
    pub(crate) expires_at: Option<DateTime<Utc>>,
    /// Lifecycle state.
    pub(crate) status: SessionStatus,
    /// Uncommitted events pending persistence.
    uncommitted_events: Vec<SignupEvent>,
}

impl SignupSession {
    /// Creates an empty session shell, to be opened or reconstituted.
    #[must_use]
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            version: 0,
            template_name: String::new(),
            slots: Vec::new(),
            created_by: None,
            opened_at: None,
            expires_at: None,
            status: SessionStatus::Open,
            uncommitted_events: Vec::new(),
        }
    }

    /// Returns the slots in order.
    #[must_use]
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    /// Returns the slot index held by `user_id`, if any.
    #[must_use]
    pub fn slot_held_by(&self, user_id: &UserId) -> Option<usize> {
        self.slots.iter().position(|slot| {
            slot.occupant
                .as_ref()
                .is_some_and(|o| &o.user_id == user_id)
        })
    }

    /// Returns `true` when the session can no longer be toggled at `now`.
    #[must_use]
    pub fn is_closed_at(&self, now: DateTime<Utc>) -> bool {
        matches!(self.status, SessionStatus::Closed(_))
            || self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }

    fn push_event(
        &mut self,
        event_type: &str,
        correlation_id: Uuid,
        clock: &dyn Clock,
        kind: SignupEventKind,
    ) {
        let event = SignupEvent {
            metadata: EventMetadata::for_command(
                event_type,
                self.id,
                self.next_sequence_number(),
                correlation_id,
                clock,
            ),
            kind,
        };
        self.uncommitted_events.push(event);
    }

    /// Opens the session with every slot of `template` empty, producing a
    /// `SessionOpened` event.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the template has no role slots,
    /// or if `ttl` is not positive or puts the expiry out of range.
    pub fn open(
        &mut self,
        template: &CompositionTemplate,
        created_by: UserId,
        ttl: Option<Duration>,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        if template.role_slots.is_empty() {
            return Err(DomainError::Validation(format!(
                "composition {:?} has no role slots",
                template.name
            )));
        }
        let expires_at = ttl
            .map(|ttl| {
                if ttl <= Duration::zero() {
                    return Err(DomainError::Validation(format!(
                        "session ttl must be positive, got {ttl}"
                    )));
                }
                clock.now().checked_add_signed(ttl).ok_or_else(|| {
                    DomainError::Validation(format!("session ttl {ttl} is out of range"))
                })
            })
            .transpose()?;
        self.push_event(
            SESSION_OPENED_EVENT_TYPE,
            correlation_id,
            clock,
            SignupEventKind::SessionOpened(SessionOpened {
                session_id: self.id,
                template_name: template.name.clone(),
                role_slots: template.role_slots.clone(),
                created_by,
                expires_at,
            }),
        );
        Ok(())
    }

    /// Claims or releases `slot_index` for `occupant`.
    ///
    /// Pressing the slot you hold releases it. Pressing an empty slot claims
    /// it, unless you already hold another one.
    ///
    /// # Errors
    ///
    /// - `DomainError::SessionClosed` if the session is closed or expired.
    /// - `DomainError::Validation` if `slot_index` is out of range.
    /// - `DomainError::RoleTaken` if another user holds the slot.
    /// - `DomainError::AlreadySignedUp` if the actor holds a different slot.
    pub fn toggle_slot(
        &mut self,
        slot_index: usize,
        occupant: &Occupant,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<ToggleOutcome, DomainError> {
        if self.is_closed_at(clock.now()) {
            return Err(DomainError::SessionClosed(self.id));
        }
        let current = self
            .slots
            .get(slot_index)
            .map(|slot| slot.occupant.clone())
            .ok_or_else(|| {
                DomainError::Validation(format!(
                    "slot {slot_index} does not exist; session {} has {} slots",
                    self.id,
                    self.slots.len()
                ))
            })?;

        match current {
            Some(current) if current.user_id == occupant.user_id => {
                self.push_event(
                    SLOT_RELEASED_EVENT_TYPE,
                    correlation_id,
                    clock,
                    SignupEventKind::SlotReleased(SlotReleased {
                        session_id: self.id,
                        slot_index,
                        user_id: occupant.user_id.clone(),
                    }),
                );
                Ok(ToggleOutcome::Released { slot_index })
            }
            Some(current) => Err(DomainError::RoleTaken {
                slot_index,
                occupant_name: current.in_game_name,
            }),
            None => {
                if let Some(held_slot) = self.slot_held_by(&occupant.user_id) {
                    return Err(DomainError::AlreadySignedUp { held_slot });
                }
                self.push_event(
                    SLOT_CLAIMED_EVENT_TYPE,
                    correlation_id,
                    clock,
                    SignupEventKind::SlotClaimed(SlotClaimed {
                        session_id: self.id,
                        slot_index,
                        occupant: occupant.clone(),
                    }),
                );
                Ok(ToggleOutcome::Claimed { slot_index })
            }
        }
    }

    /// Closes the session, producing a `SessionClosed` event.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::SessionClosed` if the session is already closed.
    pub fn close(
        &mut self,
        closed_by: Option<UserId>,
        reason: CloseReason,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        if matches!(self.status, SessionStatus::Closed(_)) {
            return Err(DomainError::SessionClosed(self.id));
        }
        self.push_event(
            SESSION_CLOSED_EVENT_TYPE,
            correlation_id,
            clock,
            SignupEventKind::SessionClosed(SessionClosed {
                session_id: self.id,
                closed_by,
                reason,
            }),
        );
        Ok(())
    }

    /// Closes the session with reason `Expired` if it is still open and its
    /// expiry has passed. Returns whether an event was produced.
    pub fn expire_if_due(&mut self, correlation_id: Uuid, clock: &dyn Clock) -> bool {
        let due = self.status == SessionStatus::Open
            && self
                .expires_at
                .is_some_and(|expires_at| expires_at <= clock.now());
        if due {
            self.push_event(
                SESSION_CLOSED_EVENT_TYPE,
                correlation_id,
                clock,
                SignupEventKind::SessionClosed(SessionClosed {
                    session_id: self.id,
                    closed_by: None,
                    reason: CloseReason::Expired,
                }),
            );
        }
        due
    }
}

impl AggregateRoot for SignupSession {
    type Event = SignupEvent;

    fn aggregate_id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn apply(&mut self, event: &Self::Event) {
        match &event.kind {
            SignupEventKind::SessionOpened(payload) => {
                self.template_name.clone_from(&payload.template_name);
                self.slots = payload
                    .role_slots
                    .iter()
                    .map(|label| Slot {
                        role_label: label.clone(),
                        occupant: None,
                    })
                    .collect();
                self.created_by = Some(payload.created_by.clone());
                self.opened_at = Some(event.metadata.occurred_at);
                self.expires_at = payload.expires_at;
                self.status = SessionStatus::Open;
            }
            SignupEventKind::SlotClaimed(payload) => {
                if let Some(slot) = self.slots.get_mut(payload.slot_index) {
                    slot.occupant = Some(payload.occupant.clone());
                }
            }
            SignupEventKind::SlotReleased(payload) => {
                if let Some(slot) = self.slots.get_mut(payload.slot_index) {
                    slot.occupant = None;
                }
            }
            SignupEventKind::SessionClosed(payload) => {
                self.status = SessionStatus::Closed(payload.reason);
            }
        }
        self.version += 1;
    }

    fn uncommitted_events(&self) -> &[Self::Event] {
        &self.uncommitted_events
    }

    fn clear_uncommitted_events(&mut self) {
        self.uncommitted_events.clear();
    }
}
