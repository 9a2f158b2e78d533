//! Repository for the searchable `valid_*` reference tables.

use sqlx::PgPool;

use crate::models::{
    ValidIngredient, ValidIngredientState, ValidInstrument, ValidMeasurementUnit,
    ValidPreparation, ValidVessel,
};

const VALID_INGREDIENT_COLUMNS: &str = "\
    id, name, plural_name, description, warning, slug, shopping_suggestions, \
    created_at, last_updated_at, archived_at";

const VALID_INSTRUMENT_COLUMNS: &str = "\
    id, name, plural_name, description, icon_path, slug, display_in_summary_lists, \
    created_at, last_updated_at, archived_at";

const VALID_MEASUREMENT_UNIT_COLUMNS: &str = "\
    id, name, plural_name, description, slug, volumetric, universal, metric, imperial, \
    created_at, last_updated_at, archived_at";

const VALID_PREPARATION_COLUMNS: &str = "\
    id, name, past_tense, description, slug, icon_path, \
    created_at, last_updated_at, archived_at";

const VALID_INGREDIENT_STATE_COLUMNS: &str = "\
    id, name, past_tense, description, slug, attribute_type, \
    created_at, last_updated_at, archived_at";

const VALID_VESSEL_COLUMNS: &str = "\
    id, name, plural_name, description, slug, capacity, display_in_summary_lists, \
    created_at, last_updated_at, archived_at";

/// Lookups of single reference rows by ID. Archived rows are not returned.
pub struct ReferenceRepo;

impl ReferenceRepo {
    pub async fn find_valid_ingredient(
        pool: &PgPool,
        id: &str,
    ) -> Result<Option<ValidIngredient>, sqlx::Error> {
        let query = format!(
            "SELECT {VALID_INGREDIENT_COLUMNS} FROM valid_ingredients \
             WHERE id = $1 AND archived_at IS NULL"
        );
        sqlx::query_as::<_, ValidIngredient>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_valid_instrument(
        pool: &PgPool,
        id: &str,
    ) -> Result<Option<ValidInstrument>, sqlx::Error> {
        let query = format!(
            "SELECT {VALID_INSTRUMENT_COLUMNS} FROM valid_instruments \
             WHERE id = $1 AND archived_at IS NULL"
        );
        sqlx::query_as::<_, ValidInstrument>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_valid_measurement_unit(
        pool: &PgPool,
        id: &str,
    ) -> Result<Option<ValidMeasurementUnit>, sqlx::Error> {
        let query = format!(
            "SELECT {VALID_MEASUREMENT_UNIT_COLUMNS} FROM valid_measurement_units \
             WHERE id = $1 AND archived_at IS NULL"
        );
        sqlx::query_as::<_, ValidMeasurementUnit>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_valid_preparation(
        pool: &PgPool,
        id: &str,
    ) -> Result<Option<ValidPreparation>, sqlx::Error> {
        let query = format!(
            "SELECT {VALID_PREPARATION_COLUMNS} FROM valid_preparations \
             WHERE id = $1 AND archived_at IS NULL"
        );
        sqlx::query_as::<_, ValidPreparation>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_valid_ingredient_state(
        pool: &PgPool,
        id: &str,
    ) -> Result<Option<ValidIngredientState>, sqlx::Error> {
        let query = format!(
            "SELECT {VALID_INGREDIENT_STATE_COLUMNS} FROM valid_ingredient_states \
             WHERE id = $1 AND archived_at IS NULL"
        );
        sqlx::query_as::<_, ValidIngredientState>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_valid_vessel(
        pool: &PgPool,
        id: &str,
    ) -> Result<Option<ValidVessel>, sqlx::Error> {
        let query = format!(
            "SELECT {VALID_VESSEL_COLUMNS} FROM valid_vessels \
             WHERE id = $1 AND archived_at IS NULL"
        );
        sqlx::query_as::<_, ValidVessel>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}
