//! Chat command payloads and the helpers that decode their free-text
//! arguments.
//!
//! Every command the chat platform can deliver is one variant of
//! [`InteractionCommand`], decoded once at the HTTP boundary and dispatched
//! to the typed handlers of each context.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use warband_core::error::DomainError;
use warband_core::registry::{Profile, UserId};
use warband_settlement::domain::settlement::Settlement;
use warband_signup::application::query_handlers::SessionSummary;

/// Prefix of slot button identifiers.
pub const SLOT_TOKEN_PREFIX: &str = "signup";

static MENTION: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"<@!?(\d+)>"));

/// A command delivered by the chat platform.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum InteractionCommand {
    /// Link the invoking user to a character and guild.
    Register {
        /// Invoking user.
        user_id: UserId,
        /// Platform display name.
        #[serde(default)]
        display_name: String,
        /// Guild tag.
        guild: String,
        /// Character name.
        in_game_name: String,
    },
    /// List published compositions.
    CompList,
    /// Open a signup session from a composition.
    Signup {
        /// Invoking user.
        user_id: UserId,
        /// Composition name.
        composition: String,
    },
    /// A slot button was pressed.
    SignupButton {
        /// Invoking user.
        user_id: UserId,
        /// Platform display name.
        #[serde(default)]
        display_name: String,
        /// The button's slot token.
        custom_id: String,
    },
    /// Finalize a signup session.
    CloseSignup {
        /// Invoking user.
        user_id: UserId,
        /// The session to close.
        session_id: Uuid,
    },
    /// Split loot among the mentioned users.
    Lootsplit {
        /// Content category.
        content_type: String,
        /// Free text mentioning the participants.
        users: String,
        /// Free text mentioning the caller.
        caller: String,
        /// Gross loot.
        total_loot: i64,
        /// Repair costs.
        #[serde(default)]
        repair_fees: i64,
    },
}

impl InteractionCommand {
    /// The command's wire name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Register { .. } => "register",
            Self::CompList => "comp_list",
            Self::Signup { .. } => "signup",
            Self::SignupButton { .. } => "signup_button",
            Self::CloseSignup { .. } => "close_signup",
            Self::Lootsplit { .. } => "lootsplit",
        }
    }
}

/// Whether a toggle took or left the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotAction {
    /// The slot was taken.
    Claimed,
    /// The slot was left.
    Released,
}

/// Reply rendered back to the chat platform.
#[derive(Debug, Serialize)]
#[serde(tag = "reply", rename_all = "snake_case")]
pub enum InteractionReply {
    /// Profile stored.
    Registered {
        /// The stored profile.
        profile: Profile,
    },
    /// Published composition names.
    Compositions {
        /// Names in ascending order.
        names: Vec<String>,
    },
    /// A session was opened.
    SignupOpened {
        /// The new session.
        summary: SessionSummary,
        /// One slot token per slot, in slot order.
        buttons: Vec<String>,
    },
    /// A slot was toggled.
    SlotToggled {
        /// What happened to the slot.
        action: SlotAction,
        /// The toggled slot.
        slot_index: usize,
        /// The session after the toggle.
        summary: SessionSummary,
    },
    /// A session was finalized.
    SignupClosed {
        /// The closed session.
        summary: SessionSummary,
    },
    /// A loot split was computed.
    LootSplit {
        /// The split.
        settlement: Settlement,
    },
}

/// Identifies one slot of one session, encoded as
/// `signup:<session_id>:<slot_index>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotToken {
    /// The session.
    pub session_id: Uuid,
    /// Zero-based slot position.
    pub slot_index: usize,
}

impl SlotToken {
    /// Tokens for every slot of a session.
    #[must_use]
    pub fn for_session(session_id: Uuid, total_slots: usize) -> Vec<Self> {
        (0..total_slots)
            .map(|slot_index| Self {
                session_id,
                slot_index,
            })
            .collect()
    }
}

impl fmt::Display for SlotToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{SLOT_TOKEN_PREFIX}:{}:{}", self.session_id, self.slot_index)
    }
}

impl FromStr for SlotToken {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DomainError::Validation(format!("invalid slot token: {s:?}"));

        let mut parts = s.split(':');
        if parts.next() != Some(SLOT_TOKEN_PREFIX) {
            return Err(invalid());
        }
        let session_id = parts
            .next()
            .and_then(|raw| Uuid::parse_str(raw).ok())
            .ok_or_else(invalid)?;
        let slot_index = parts
            .next()
            .and_then(|raw| raw.parse().ok())
            .ok_or_else(invalid)?;
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(Self {
            session_id,
            slot_index,
        })
    }
}

/// Extracts mentioned user ids from free text, in order of first
/// appearance.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if the mention pattern failed to
/// compile.
pub fn parse_mentions(text: &str) -> Result<Vec<UserId>, DomainError> {
    let pattern = MENTION
        .as_ref()
        .map_err(|e| DomainError::Infrastructure(format!("mention pattern: {e}")))?;

    let mut ids: Vec<UserId> = Vec::new();
    for capture in pattern.captures_iter(text) {
        let id = UserId::from(&capture[1]);
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    Ok(ids)
}
