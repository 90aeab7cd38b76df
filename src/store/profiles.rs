use sqlx::{Executor, Sqlite};
use uuid::Uuid;

use crate::db::row_parsers::profile_from_row;
use crate::errors::{AppError, AppResult};
use crate::models::profile::Profile;
use crate::utils::normalize_email;

const PROFILE_COLUMNS: &str = "user_id, email, role, is_exec_board, exec_board_role";

pub async fn find_profile<'e, E>(exec: E, user_id: Uuid) -> AppResult<Option<Profile>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE user_id = ?");
    let row = sqlx::query(&sql)
        .bind(user_id.to_string())
        .fetch_optional(exec)
        .await?;

    row.as_ref().map(profile_from_row).transpose()
}

pub async fn get_profile<'e, E>(exec: E, user_id: Uuid) -> AppResult<Profile>
where
    E: Executor<'e, Database = Sqlite>,
{
    find_profile(exec, user_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("user {user_id}")))
}

pub async fn find_profile_by_email<'e, E>(exec: E, email: &str) -> AppResult<Option<Profile>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE lower(email) = ?");
    let row = sqlx::query(&sql)
        .bind(normalize_email(email))
        .fetch_optional(exec)
        .await?;

    row.as_ref().map(profile_from_row).transpose()
}
