//! Repository for the `users`, `households`, and
//! `household_user_memberships` tables.

use sqlx::PgPool;

use crate::models::{Household, User};

const USER_COLUMNS: &str = "\
    id, username, email_address, first_name, last_name, \
    email_address_verified_at, created_at, last_updated_at, archived_at";

const HOUSEHOLD_COLUMNS: &str = "\
    id, name, belongs_to_user, webhook_hmac_secret, \
    created_at, last_updated_at, archived_at";

pub struct UserRepo;

impl UserRepo {
    /// Find a non-archived user by ID.
    pub async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<User>, sqlx::Error> {
        let query =
            format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1 AND archived_at IS NULL");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List the active members of a household.
    pub async fn list_household_members(
        pool: &PgPool,
        household_id: &str,
    ) -> Result<Vec<User>, sqlx::Error> {
        let query = format!(
            "SELECT {USER_COLUMNS} FROM users \
             WHERE archived_at IS NULL \
               AND id IN ( \
                   SELECT belongs_to_user FROM household_user_memberships \
                   WHERE belongs_to_household = $1 AND archived_at IS NULL \
               ) \
             ORDER BY created_at, id"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(household_id)
            .fetch_all(pool)
            .await
    }
}

pub struct HouseholdRepo;

impl HouseholdRepo {
    /// Find a non-archived household by ID.
    pub async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Household>, sqlx::Error> {
        let query = format!(
            "SELECT {HOUSEHOLD_COLUMNS} FROM households WHERE id = $1 AND archived_at IS NULL"
        );
        sqlx::query_as::<_, Household>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List the households a user is an active member of.
    pub async fn list_for_user(pool: &PgPool, user_id: &str) -> Result<Vec<Household>, sqlx::Error> {
        let query = format!(
            "SELECT {HOUSEHOLD_COLUMNS} FROM households \
             WHERE archived_at IS NULL \
               AND id IN ( \
                   SELECT belongs_to_household FROM household_user_memberships \
                   WHERE belongs_to_user = $1 AND archived_at IS NULL \
               ) \
             ORDER BY created_at, id"
        );
        sqlx::query_as::<_, Household>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }
}
