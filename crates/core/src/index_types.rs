//! Names of the text-search indexes maintained by the core.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// A search index, one per searchable entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexType {
    Users,
    Recipes,
    Meals,
    ValidIngredients,
    ValidInstruments,
    ValidPreparations,
    ValidMeasurementUnits,
    ValidIngredientStates,
    ValidVessels,
}

impl IndexType {
    pub const ALL: &'static [IndexType] = &[
        IndexType::Users,
        IndexType::Recipes,
        IndexType::Meals,
        IndexType::ValidIngredients,
        IndexType::ValidInstruments,
        IndexType::ValidPreparations,
        IndexType::ValidMeasurementUnits,
        IndexType::ValidIngredientStates,
        IndexType::ValidVessels,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            IndexType::Users => "users",
            IndexType::Recipes => "recipes",
            IndexType::Meals => "meals",
            IndexType::ValidIngredients => "valid_ingredients",
            IndexType::ValidInstruments => "valid_instruments",
            IndexType::ValidPreparations => "valid_preparations",
            IndexType::ValidMeasurementUnits => "valid_measurement_units",
            IndexType::ValidIngredientStates => "valid_ingredient_states",
            IndexType::ValidVessels => "valid_vessels",
        }
    }
}

impl fmt::Display for IndexType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IndexType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        IndexType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| CoreError::UnknownIndexType(s.to_string()))
    }
}
