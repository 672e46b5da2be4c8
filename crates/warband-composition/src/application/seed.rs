//! Loads composition templates from a YAML file at startup.
//!
//! ```yaml
//! compositions:
//!   - name: Castle Siege
//!     created_by: "1234"
//!     roles: [Tank, Healer, Healer, DPS]
//! ```

use serde::Deserialize;
use warband_core::catalog::{CompositionCatalog, CompositionTemplate};
use warband_core::clock::Clock;
use warband_core::error::DomainError;
use warband_core::registry::UserId;

use crate::domain::aggregates::{MAX_ROLES, normalize_name, normalize_role_label};

/// Author recorded for seeded templates that do not name one.
pub const SEED_AUTHOR: &str = "seed";

#[derive(Debug, Deserialize)]
struct SeedFile {
    #[serde(default)]
    compositions: Vec<SeedComposition>,
}

#[derive(Debug, Deserialize)]
struct SeedComposition {
    name: String,
    roles: Vec<String>,
    #[serde(default)]
    created_by: Option<String>,
}

/// Parses and validates a seed document against the authoring rules.
///
/// # Errors
///
/// Returns `DomainError::Validation` if the YAML is malformed or any entry
/// breaks a name, label, or role-count rule.
pub fn parse_seed(yaml: &str, clock: &dyn Clock) -> Result<Vec<CompositionTemplate>, DomainError> {
    let file: SeedFile = serde_yaml::from_str(yaml)
        .map_err(|e| DomainError::Validation(format!("invalid composition seed: {e}")))?;

    file.compositions
        .into_iter()
        .map(|entry| {
            let name = normalize_name(&entry.name)?;
            if entry.roles.is_empty() || entry.roles.len() > MAX_ROLES {
                return Err(DomainError::Validation(format!(
                    "composition {name:?} must have 1 to {MAX_ROLES} roles"
                )));
            }
            let role_slots = entry
                .roles
                .iter()
                .map(|label| normalize_role_label(label))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(CompositionTemplate {
                name,
                role_slots,
                created_by: UserId::new(entry.created_by.unwrap_or_else(|| SEED_AUTHOR.to_owned())),
                created_at: clock.now(),
            })
        })
        .collect()
}

/// Inserts every seeded template whose exact name is not yet in the catalog.
/// Returns how many were inserted, so restarts against a durable catalog are
/// harmless.
///
/// # Errors
///
/// Returns `DomainError::Validation` for an invalid document, or a catalog
/// error.
pub async fn seed_catalog(
    yaml: &str,
    clock: &dyn Clock,
    catalog: &dyn CompositionCatalog,
) -> Result<usize, DomainError> {
    let templates = parse_seed(yaml, clock)?;
    let existing = catalog.list_names().await?;

    let mut inserted = 0;
    for template in templates {
        if existing.contains(&template.name) {
            tracing::debug!(name = %template.name, "composition already in catalog; skipping seed");
            continue;
        }
        catalog.insert(template).await?;
        inserted += 1;
    }
    tracing::info!(inserted, "composition seed applied");
    Ok(inserted)
}
