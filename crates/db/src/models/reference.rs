//! Shared reference data: the `valid_*` tables curated by administrators.
//!
//! Six of these are searchable and come with a `*SearchSubset` projection;
//! the three bridge tables (ingredient/measurement unit, preparation/instrument,
//! ingredient/preparation) only travel inside data-change messages.

use ddb_core::types::{EntityId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// ---------------------------------------------------------------------------
// Searchable reference entities
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, FromRow, Serialize, Deserialize)]
pub struct ValidIngredient {
    pub id: EntityId,
    pub name: String,
    pub plural_name: String,
    pub description: String,
    pub warning: String,
    pub slug: String,
    pub shopping_suggestions: String,
    pub created_at: Timestamp,
    pub last_updated_at: Option<Timestamp>,
    pub archived_at: Option<Timestamp>,
}

#[derive(Debug, Clone, Default, PartialEq, FromRow, Serialize, Deserialize)]
pub struct ValidInstrument {
    pub id: EntityId,
    pub name: String,
    pub plural_name: String,
    pub description: String,
    pub icon_path: String,
    pub slug: String,
    pub display_in_summary_lists: bool,
    pub created_at: Timestamp,
    pub last_updated_at: Option<Timestamp>,
    pub archived_at: Option<Timestamp>,
}

#[derive(Debug, Clone, Default, PartialEq, FromRow, Serialize, Deserialize)]
pub struct ValidMeasurementUnit {
    pub id: EntityId,
    pub name: String,
    pub plural_name: String,
    pub description: String,
    pub slug: String,
    pub volumetric: bool,
    pub universal: bool,
    pub metric: bool,
    pub imperial: bool,
    pub created_at: Timestamp,
    pub last_updated_at: Option<Timestamp>,
    pub archived_at: Option<Timestamp>,
}

#[derive(Debug, Clone, Default, PartialEq, FromRow, Serialize, Deserialize)]
pub struct ValidPreparation {
    pub id: EntityId,
    pub name: String,
    pub past_tense: String,
    pub description: String,
    pub slug: String,
    pub icon_path: String,
    pub created_at: Timestamp,
    pub last_updated_at: Option<Timestamp>,
    pub archived_at: Option<Timestamp>,
}

#[derive(Debug, Clone, Default, PartialEq, FromRow, Serialize, Deserialize)]
pub struct ValidIngredientState {
    pub id: EntityId,
    pub name: String,
    pub past_tense: String,
    pub description: String,
    pub slug: String,
    pub attribute_type: String,
    pub created_at: Timestamp,
    pub last_updated_at: Option<Timestamp>,
    pub archived_at: Option<Timestamp>,
}

#[derive(Debug, Clone, Default, PartialEq, FromRow, Serialize, Deserialize)]
pub struct ValidVessel {
    pub id: EntityId,
    pub name: String,
    pub plural_name: String,
    pub description: String,
    pub slug: String,
    pub capacity: f32,
    pub display_in_summary_lists: bool,
    pub created_at: Timestamp,
    pub last_updated_at: Option<Timestamp>,
    pub archived_at: Option<Timestamp>,
}

// ---------------------------------------------------------------------------
// Bridge entities
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, FromRow, Serialize, Deserialize)]
pub struct ValidIngredientMeasurementUnit {
    pub id: EntityId,
    pub valid_ingredient_id: EntityId,
    pub valid_measurement_unit_id: EntityId,
    pub notes: String,
    pub minimum_allowable_quantity: f32,
    pub maximum_allowable_quantity: Option<f32>,
    pub created_at: Timestamp,
    pub last_updated_at: Option<Timestamp>,
    pub archived_at: Option<Timestamp>,
}

#[derive(Debug, Clone, Default, PartialEq, FromRow, Serialize, Deserialize)]
pub struct ValidPreparationInstrument {
    pub id: EntityId,
    pub valid_preparation_id: EntityId,
    pub valid_instrument_id: EntityId,
    pub notes: String,
    pub created_at: Timestamp,
    pub last_updated_at: Option<Timestamp>,
    pub archived_at: Option<Timestamp>,
}

#[derive(Debug, Clone, Default, PartialEq, FromRow, Serialize, Deserialize)]
pub struct ValidIngredientPreparation {
    pub id: EntityId,
    pub valid_ingredient_id: EntityId,
    pub valid_preparation_id: EntityId,
    pub notes: String,
    pub created_at: Timestamp,
    pub last_updated_at: Option<Timestamp>,
    pub archived_at: Option<Timestamp>,
}

// ---------------------------------------------------------------------------
// Search subsets
// ---------------------------------------------------------------------------

/// Projection shared by the named reference entities: identity, the names a
/// person might type, and the description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceSearchSubset {
    pub id: EntityId,
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub alternate_name: String,
    pub description: String,
}

impl From<&ValidIngredient> for ReferenceSearchSubset {
    fn from(v: &ValidIngredient) -> Self {
        Self {
            id: v.id.clone(),
            name: v.name.clone(),
            alternate_name: v.plural_name.clone(),
            description: v.description.clone(),
        }
    }
}

impl From<&ValidInstrument> for ReferenceSearchSubset {
    fn from(v: &ValidInstrument) -> Self {
        Self {
            id: v.id.clone(),
            name: v.name.clone(),
            alternate_name: v.plural_name.clone(),
            description: v.description.clone(),
        }
    }
}

impl From<&ValidMeasurementUnit> for ReferenceSearchSubset {
    fn from(v: &ValidMeasurementUnit) -> Self {
        Self {
            id: v.id.clone(),
            name: v.name.clone(),
            alternate_name: v.plural_name.clone(),
            description: v.description.clone(),
        }
    }
}

impl From<&ValidPreparation> for ReferenceSearchSubset {
    fn from(v: &ValidPreparation) -> Self {
        Self {
            id: v.id.clone(),
            name: v.name.clone(),
            alternate_name: v.past_tense.clone(),
            description: v.description.clone(),
        }
    }
}

impl From<&ValidIngredientState> for ReferenceSearchSubset {
    fn from(v: &ValidIngredientState) -> Self {
        Self {
            id: v.id.clone(),
            name: v.name.clone(),
            alternate_name: v.past_tense.clone(),
            description: v.description.clone(),
        }
    }
}

impl From<&ValidVessel> for ReferenceSearchSubset {
    fn from(v: &ValidVessel) -> Self {
        Self {
            id: v.id.clone(),
            name: v.name.clone(),
            alternate_name: v.plural_name.clone(),
            description: v.description.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preparation_subset_uses_past_tense_as_alternate_name() {
        let prep = ValidPreparation {
            id: "P1".into(),
            name: "dice".into(),
            past_tense: "diced".into(),
            description: "cut into cubes".into(),
            slug: "dice".into(),
            ..Default::default()
        };
        let subset = ReferenceSearchSubset::from(&prep);
        assert_eq!(subset.alternate_name, "diced");
        assert_eq!(subset.id, "P1");
    }

    #[test]
    fn empty_alternate_name_is_omitted() {
        let subset = ReferenceSearchSubset::from(&ValidVessel {
            id: "V1".into(),
            name: "wok".into(),
            ..Default::default()
        });
        let json = serde_json::to_value(&subset).unwrap();
        assert!(json.get("alternate_name").is_none());
    }
}
