//! Command handlers for the settlement context.

use std::str::FromStr;

use warband_core::error::DomainError;
use warband_core::registry::{ProfileRegistry, UserId};

use crate::domain::commands::SettleLoot;
use crate::domain::settlement::{ContentType, Participant, Settlement, SettlementTerms};

/// Deduplicates `ids` keeping the first occurrence of each.
fn dedup_in_order(ids: &[UserId]) -> Vec<UserId> {
    let mut unique: Vec<UserId> = Vec::with_capacity(ids.len());
    for id in ids {
        if !unique.contains(id) {
            unique.push(id.clone());
        }
    }
    unique
}

/// Handles the `SettleLoot` command: validates the request, resolves every
/// participant, and computes the split.
///
/// Input checks run before any registry lookup, so a malformed request never
/// touches the registry. The caller is added to the participants when not
/// already mentioned.
///
/// # Errors
///
/// In order of precedence:
/// - `DomainError::Validation` for an unknown content type, no participants,
///   no caller, or invalid amounts or rate.
/// - `DomainError::CallerNotRegistered` if the caller has no profile.
/// - `DomainError::UnregisteredParticipants` listing, in mention order, every
///   other participant without a profile.
/// - `DomainError::Infrastructure` if a registry lookup fails.
pub async fn handle_settle_loot(
    command: &SettleLoot,
    registry: &dyn ProfileRegistry,
) -> Result<Settlement, DomainError> {
    let content_type = ContentType::from_str(command.content_type.trim())?;

    let mut participant_ids = dedup_in_order(&command.participant_ids);
    if participant_ids.is_empty() {
        return Err(DomainError::Validation(
            "mention the users participating in the loot split".into(),
        ));
    }
    let caller_id = command
        .caller_id
        .clone()
        .filter(|id| !id.is_blank())
        .ok_or_else(|| DomainError::Validation("mention the caller".into()))?;

    let terms = SettlementTerms {
        content_type,
        total_loot: command.total_loot,
        repair_fees: command.repair_fees,
        caller_fee_rate: command.caller_fee_rate,
    };
    terms.validate()?;

    let caller = registry
        .resolve_profile(&caller_id)
        .await?
        .map(Participant::from)
        .ok_or_else(|| DomainError::CallerNotRegistered(caller_id.clone()))?;

    if !participant_ids.contains(&caller_id) {
        participant_ids.push(caller_id.clone());
    }

    let mut participants = Vec::with_capacity(participant_ids.len());
    let mut unregistered = Vec::new();
    for user_id in participant_ids {
        if user_id == caller_id {
            participants.push(caller.clone());
            continue;
        }
        match registry.resolve_profile(&user_id).await? {
            Some(profile) => participants.push(Participant::from(profile)),
            None => unregistered.push(user_id),
        }
    }
    if !unregistered.is_empty() {
        return Err(DomainError::UnregisteredParticipants(unregistered));
    }

    let settlement = Settlement::compute(terms, caller, participants)?;

    tracing::info!(
        correlation_id = %command.correlation_id,
        content_type = %settlement.content_type,
        participants = settlement.participants.len(),
        per_person = settlement.per_person,
        caller_fee = settlement.caller_fee,
        "loot settled"
    );

    Ok(settlement)
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;
    use warband_core::error::DomainError;
    use warband_core::registry::UserId;
    use warband_test_support::{CountingProfileRegistry, profile};

    use super::*;

    fn ids(raw: &[&str]) -> Vec<UserId> {
        raw.iter().map(|id| UserId::from(*id)).collect()
    }

    fn command(participants: &[&str], caller: Option<&str>) -> SettleLoot {
        SettleLoot {
            correlation_id: Uuid::new_v4(),
            content_type: "Royals".to_owned(),
            participant_ids: ids(participants),
            caller_id: caller.map(UserId::from),
            total_loot: 1_000_000,
            repair_fees: 50_000,
            caller_fee_rate: 0.08,
        }
    }

    fn registry() -> CountingProfileRegistry {
        CountingProfileRegistry::new(vec![
            profile("1", "Caller", "Phoenix Rebels"),
            profile("2", "Aldric", "Phoenix Rebels"),
            profile("3", "Brena", "Iron Wolves"),
            profile("4", "Corvin", "Iron Wolves"),
            profile("5", "Dagny", "Phoenix Rebels"),
        ])
    }

    #[tokio::test]
    async fn test_handle_settle_loot_adds_caller_and_splits() {
        // Arrange
        let registry = registry();
        let command = command(&["2", "3", "4", "5", "3"], Some("1"));

        // Act
        let settlement = handle_settle_loot(&command, &registry).await.unwrap();

        // Assert
        let order: Vec<&str> = settlement
            .participants
            .iter()
            .map(|p| p.user_id.as_str())
            .collect();
        assert_eq!(order, vec!["2", "3", "4", "5", "1"]);
        assert_eq!(settlement.caller_fee, 76_000);
        assert_eq!(settlement.per_person, 174_800);
        assert_eq!(settlement.caller.in_game_name, "Caller");
    }

    #[tokio::test]
    async fn test_handle_settle_loot_does_not_duplicate_mentioned_caller() {
        let registry = registry();
        let command = command(&["1", "2"], Some("1"));

        let settlement = handle_settle_loot(&command, &registry).await.unwrap();

        assert_eq!(settlement.participants.len(), 2);
        assert_eq!(settlement.per_person, 437_000);
    }

    #[tokio::test]
    async fn test_handle_settle_loot_without_participants_skips_registry() {
        // Arrange
        let registry = registry();
        let command = command(&[], Some("1"));

        // Act
        let result = handle_settle_loot(&command, &registry).await;

        // Assert
        assert!(matches!(result, Err(DomainError::Validation(_))));
        assert_eq!(registry.lookups(), 0);
    }

    #[tokio::test]
    async fn test_handle_settle_loot_names_exactly_the_unregistered_participant() {
        let registry = registry();
        let command = command(&["2", "77", "3"], Some("1"));

        let result = handle_settle_loot(&command, &registry).await;

        match result.unwrap_err() {
            DomainError::UnregisteredParticipants(missing) => {
                assert_eq!(missing, ids(&["77"]));
            }
            other => panic!("expected UnregisteredParticipants, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_handle_settle_loot_rejects_unregistered_caller_first() {
        let registry = registry();
        let command = command(&["2", "77"], Some("88"));

        let result = handle_settle_loot(&command, &registry).await;

        assert!(matches!(
            result,
            Err(DomainError::CallerNotRegistered(id)) if id.as_str() == "88"
        ));
        assert_eq!(registry.lookups(), 1);
    }

    #[tokio::test]
    async fn test_handle_settle_loot_validates_before_lookups() {
        let registry = registry();

        let mut bad_type = command(&["2"], Some("1"));
        bad_type.content_type = "Open World Roam".to_owned();
        let no_caller = command(&["2"], None);
        let mut bad_repairs = command(&["2"], Some("1"));
        bad_repairs.repair_fees = 2_000_000;

        for cmd in [bad_type, no_caller, bad_repairs] {
            let result = handle_settle_loot(&cmd, &registry).await;
            assert!(matches!(result, Err(DomainError::Validation(_))));
        }
        assert_eq!(registry.lookups(), 0);
    }
}
