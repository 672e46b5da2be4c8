//! Settlement arithmetic.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use warband_core::error::DomainError;
use warband_core::registry::{Profile, UserId};

/// Category of content the loot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentType {
    /// Royal continent content.
    Royals,
    /// Hideout content.
    #[serde(rename = "HO")]
    Ho,
    /// Content that carries no guild tax.
    #[serde(rename = "No Tax")]
    NoTax,
}

impl ContentType {
    /// Every accepted content type, in display order.
    pub const ALL: [Self; 3] = [Self::Royals, Self::Ho, Self::NoTax];

    /// Returns the wire label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Royals => "Royals",
            Self::Ho => "HO",
            Self::NoTax => "No Tax",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|content_type| content_type.as_str() == s)
            .ok_or_else(|| DomainError::Validation(format!("invalid content type {s:?}")))
    }
}

/// A participant resolved against the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Participant {
    /// Platform user identifier.
    pub user_id: UserId,
    /// Character name in the game.
    pub in_game_name: String,
    /// Guild the participant is paid under.
    pub group_tag: String,
}

impl From<Profile> for Participant {
    fn from(profile: Profile) -> Self {
        Self {
            user_id: profile.user_id,
            in_game_name: profile.in_game_name,
            group_tag: profile.group_tag,
        }
    }
}

/// Raw amounts of a settlement request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SettlementTerms {
    /// Content category.
    pub content_type: ContentType,
    /// Gross loot in silver.
    pub total_loot: i64,
    /// Repair costs deducted before anything else.
    pub repair_fees: i64,
    /// Fraction of the post-repair loot paid to the caller.
    pub caller_fee_rate: f64,
}

impl SettlementTerms {
    /// Checks the amounts and rate before any profile is resolved.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` for negative amounts, repair fees
    /// exceeding the loot, or a rate outside `[0, 1]`.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.total_loot < 0 {
            return Err(DomainError::Validation(
                "total loot must not be negative".into(),
            ));
        }
        if self.repair_fees < 0 {
            return Err(DomainError::Validation(
                "repair fees must not be negative".into(),
            ));
        }
        if self.repair_fees > self.total_loot {
            return Err(DomainError::Validation(format!(
                "repair fees {} exceed total loot {}",
                self.repair_fees, self.total_loot
            )));
        }
        if !self.caller_fee_rate.is_finite() || !(0.0..=1.0).contains(&self.caller_fee_rate) {
            return Err(DomainError::Validation(format!(
                "caller fee rate {} must be between 0 and 1",
                self.caller_fee_rate
            )));
        }
        Ok(())
    }
}

/// Payout for one guild.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupShare {
    /// Guild tag.
    pub group_tag: String,
    /// Members in the order they were mentioned.
    pub members: Vec<Participant>,
    /// `per_person * members.len()`, plus the caller fee for the caller's
    /// guild.
    pub total: i64,
}

/// A computed loot split.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Settlement {
    /// Content category.
    pub content_type: ContentType,
    /// Gross loot.
    pub total_loot: i64,
    /// Repair costs.
    pub repair_fees: i64,
    /// Rate the caller fee was computed with.
    pub caller_fee_rate: f64,
    /// `total_loot - repair_fees`.
    pub net_after_repairs: i64,
    /// `floor(net_after_repairs * caller_fee_rate)`.
    pub caller_fee: i64,
    /// `net_after_repairs - caller_fee`.
    pub net_after_caller_fee: i64,
    /// Equal share paid to every participant.
    pub per_person: i64,
    /// Silver left over by rounding down the shares.
    pub remainder: i64,
    /// The organizer, also present in `participants`.
    pub caller: Participant,
    /// Deduplicated participants in mention order.
    pub participants: Vec<Participant>,
    /// Per-guild payouts, sorted by tag.
    pub groups: Vec<GroupShare>,
}

impl Settlement {
    /// Computes the split.
    ///
    /// `participants` must be non-empty, deduplicated, and contain `caller`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the terms are invalid or there
    /// is nobody to pay.
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_possible_wrap
    )]
    pub fn compute(
        terms: SettlementTerms,
        caller: Participant,
        participants: Vec<Participant>,
    ) -> Result<Self, DomainError> {
        terms.validate()?;
        if participants.is_empty() {
            return Err(DomainError::Validation("no participants to pay".into()));
        }

        let net_after_repairs = terms.total_loot - terms.repair_fees;
        let caller_fee = (net_after_repairs as f64 * terms.caller_fee_rate).floor() as i64;
        let net_after_caller_fee = net_after_repairs - caller_fee;
        let count = participants.len() as i64;
        let per_person = net_after_caller_fee / count;
        let remainder = net_after_caller_fee % count;

        let mut by_tag: BTreeMap<&str, Vec<Participant>> = BTreeMap::new();
        for participant in &participants {
            by_tag
                .entry(participant.group_tag.as_str())
                .or_default()
                .push(participant.clone());
        }
        let groups = by_tag
            .into_iter()
            .map(|(tag, members)| {
                let mut total = per_person * members.len() as i64;
                if tag == caller.group_tag {
                    total += caller_fee;
                }
                GroupShare {
                    group_tag: tag.to_owned(),
                    members,
                    total,
                }
            })
            .collect();

        Ok(Self {
            content_type: terms.content_type,
            total_loot: terms.total_loot,
            repair_fees: terms.repair_fees,
            caller_fee_rate: terms.caller_fee_rate,
            net_after_repairs,
            caller_fee,
            net_after_caller_fee,
            per_person,
            remainder,
            caller,
            participants,
            groups,
        })
    }

    /// Total paid out per guild tag.
    #[must_use]
    pub fn per_group_totals(&self) -> BTreeMap<String, i64> {
        self.groups
            .iter()
            .map(|group| (group.group_tag.clone(), group.total))
            .collect()
    }

    /// Silver actually distributed: every share plus the caller fee.
    #[must_use]
    #[allow(clippy::cast_possible_wrap)]
    pub fn distributed_total(&self) -> i64 {
        self.per_person * self.participants.len() as i64 + self.caller_fee
    }
}
