pub mod admin;
pub mod bookings;
pub mod health;
pub mod services;

use axum::http::HeaderMap;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::User;
use crate::state::AppState;

pub(crate) fn bearer_token(headers: &HeaderMap) -> &str {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .unwrap_or("")
}

pub(crate) fn authenticate(state: &AppState, token: &str) -> Result<User, AppError> {
    if token.is_empty() {
        return Err(AppError::Unauthorized);
    }
    let db = state.conn()?;
    queries::get_user_by_token(&db, token)?.ok_or(AppError::Unauthorized)
}

pub(crate) fn current_user(state: &AppState, headers: &HeaderMap) -> Result<User, AppError> {
    authenticate(state, bearer_token(headers))
}
