//! Aggregate roots for the composition context.

use uuid::Uuid;
use warband_core::aggregate::AggregateRoot;
use warband_core::catalog::CompositionTemplate;
use warband_core::clock::Clock;
use warband_core::error::DomainError;
use warband_core::event::EventMetadata;
use warband_core::registry::UserId;

use super::events::{
    CompositionEvent, CompositionEventKind, DRAFT_CANCELLED_EVENT_TYPE,
    DRAFT_PUBLISHED_EVENT_TYPE, DRAFT_REOPENED_EVENT_TYPE, DRAFT_STARTED_EVENT_TYPE,
    DraftCancelled, DraftPublished, DraftReopened, DraftStarted, ROLE_ADDED_EVENT_TYPE,
    RoleAdded,
};

/// Longest composition name, in characters.
pub const MAX_NAME_LEN: usize = 50;

/// Longest role label, in characters.
pub const MAX_ROLE_LABEL_LEN: usize = 100;

/// Most roles a composition may hold.
pub const MAX_ROLES: usize = 20;

/// Trims and checks a composition name.
///
/// # Errors
///
/// Returns `DomainError::Validation` if the trimmed name is empty or longer
/// than [`MAX_NAME_LEN`].
pub fn normalize_name(raw: &str) -> Result<String, DomainError> {
    let name = raw.trim();
    let len = name.chars().count();
    if len == 0 || len > MAX_NAME_LEN {
        return Err(DomainError::Validation(format!(
            "composition name must be 1 to {MAX_NAME_LEN} characters"
        )));
    }
    Ok(name.to_owned())
}

/// Trims and checks a role label.
///
/// # Errors
///
/// Returns `DomainError::Validation` if the trimmed label is empty or longer
/// than [`MAX_ROLE_LABEL_LEN`].
pub fn normalize_role_label(raw: &str) -> Result<String, DomainError> {
    let label = raw.trim();
    let len = label.chars().count();
    if len == 0 || len > MAX_ROLE_LABEL_LEN {
        return Err(DomainError::Validation(format!(
            "role label must be 1 to {MAX_ROLE_LABEL_LEN} characters"
        )));
    }
    Ok(label.to_owned())
}

/// Lifecycle of a draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftStatus {
    /// Accepting roles.
    Drafting,
    /// In the catalog; terminal.
    Published,
    /// Abandoned; terminal.
    Cancelled,
}

/// The aggregate root for an in-progress composition.
#[derive(Debug)]
pub struct CompositionDraft {
    /// Aggregate identifier.
    pub id: Uuid,
    /// Current version (event count).
    pub(crate) version: i64,
    /// Composition name.
    pub(crate) name: String,
    /// Role labels in order.
    pub(crate) roles: Vec<String>,
    /// The author; the only user allowed to change the draft.
    pub(crate) created_by: Option<UserId>,
    /// Lifecycle state.
    pub(crate) status: DraftStatus,
    /// Uncommitted events pending persistence.
    uncommitted_events: Vec<CompositionEvent>,
}

impl CompositionDraft {
    /// Creates an empty draft shell, to be started or reconstituted.
    #[must_use]
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            version: 0,
            name: String::new(),
            roles: Vec::new(),
            created_by: None,
            status: DraftStatus::Drafting,
            uncommitted_events: Vec::new(),
        }
    }

    fn push_event(
        &mut self,
        event_type: &str,
        correlation_id: Uuid,
        clock: &dyn Clock,
        kind: CompositionEventKind,
    ) {
        let event = CompositionEvent {
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

    fn ensure_editable_by(&self, actor: &UserId) -> Result<(), DomainError> {
        match self.status {
            DraftStatus::Drafting => {}
            DraftStatus::Published => {
                return Err(DomainError::Validation(format!(
                    "composition draft {} is already published",
                    self.id
                )));
            }
            DraftStatus::Cancelled => {
                return Err(DomainError::Validation(format!(
                    "composition draft {} was cancelled",
                    self.id
                )));
            }
        }
        if self.created_by.as_ref() != Some(actor) {
            return Err(DomainError::Validation(
                "only the author can change this composition draft".into(),
            ));
        }
        Ok(())
    }

    /// Starts the draft, producing a `DraftStarted` event.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the name is invalid.
    pub fn start(
        &mut self,
        name: &str,
        created_by: UserId,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        let name = normalize_name(name)?;
        self.push_event(
            DRAFT_STARTED_EVENT_TYPE,
            correlation_id,
            clock,
            CompositionEventKind::DraftStarted(DraftStarted {
                draft_id: self.id,
                name,
                created_by,
            }),
        );
        Ok(())
    }

    /// Appends a role, producing a `RoleAdded` event.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the draft is finished, `actor` is
    /// not the author, the label is invalid, or the draft is full.
    pub fn add_role(
        &mut self,
        role_label: &str,
        actor: &UserId,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        self.ensure_editable_by(actor)?;
        let role_label = normalize_role_label(role_label)?;
        if self.roles.len() >= MAX_ROLES {
            return Err(DomainError::Validation(format!(
                "a composition holds at most {MAX_ROLES} roles"
            )));
        }
        self.push_event(
            ROLE_ADDED_EVENT_TYPE,
            correlation_id,
            clock,
            CompositionEventKind::RoleAdded(RoleAdded {
                draft_id: self.id,
                role_label,
            }),
        );
        Ok(())
    }

    /// Finishes the draft, producing a `DraftPublished` event, and returns
    /// the template to insert into the catalog.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the draft is finished, `actor` is
    /// not the author, or no roles were added.
    pub fn publish(
        &mut self,
        actor: &UserId,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<CompositionTemplate, DomainError> {
        self.ensure_editable_by(actor)?;
        if self.roles.is_empty() {
            return Err(DomainError::Validation(
                "add at least one role before publishing".into(),
            ));
        }
        self.push_event(
            DRAFT_PUBLISHED_EVENT_TYPE,
            correlation_id,
            clock,
            CompositionEventKind::DraftPublished(DraftPublished {
                draft_id: self.id,
                name: self.name.clone(),
                role_slots: self.roles.clone(),
            }),
        );
        Ok(CompositionTemplate {
            name: self.name.clone(),
            role_slots: self.roles.clone(),
            created_by: actor.clone(),
            created_at: clock.now(),
        })
    }

    /// Returns a published draft to drafting after the catalog refused its
    /// template, producing a `DraftReopened` event.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the draft is not published.
    pub fn reopen(
        &mut self,
        reason: &str,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        if self.status != DraftStatus::Published {
            return Err(DomainError::Validation(format!(
                "composition draft {} is not published",
                self.id
            )));
        }
        self.push_event(
            DRAFT_REOPENED_EVENT_TYPE,
            correlation_id,
            clock,
            CompositionEventKind::DraftReopened(DraftReopened {
                draft_id: self.id,
                reason: reason.to_owned(),
            }),
        );
        Ok(())
    }

    /// Abandons the draft, producing a `DraftCancelled` event.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the draft is finished or `actor`
    /// is not the author.
    pub fn cancel(
        &mut self,
        actor: &UserId,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        self.ensure_editable_by(actor)?;
        self.push_event(
            DRAFT_CANCELLED_EVENT_TYPE,
            correlation_id,
            clock,
            CompositionEventKind::DraftCancelled(DraftCancelled { draft_id: self.id }),
        );
        Ok(())
    }
}

impl AggregateRoot for CompositionDraft {
    type Event = CompositionEvent;

    fn aggregate_id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn apply(&mut self, event: &Self::Event) {
        match &event.kind {
            CompositionEventKind::DraftStarted(payload) => {
                self.name.clone_from(&payload.name);
                self.created_by = Some(payload.created_by.clone());
                self.status = DraftStatus::Drafting;
            }
            CompositionEventKind::RoleAdded(payload) => {
                self.roles.push(payload.role_label.clone());
            }
            CompositionEventKind::DraftPublished(_) => {
                self.status = DraftStatus::Published;
            }
            CompositionEventKind::DraftCancelled(_) => {
                self.status = DraftStatus::Cancelled;
            }
            CompositionEventKind::DraftReopened(_) => {
                self.status = DraftStatus::Drafting;
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
