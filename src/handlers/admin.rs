use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::db::queries;
use crate::errors::AppError;
use crate::models::User;
use crate::state::AppState;

use super::bearer_token;

fn check_auth(headers: &HeaderMap, expected_token: &str) -> Result<(), AppError> {
    if bearer_token(headers) != expected_token {
        return Err(AppError::Unauthorized);
    }
    Ok(())
}

fn new_token() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

// POST /api/admin/users
#[derive(Deserialize)]
pub struct CreateUserRequest {
    pub display_name: String,
}

#[derive(Serialize)]
pub struct CreateUserResponse {
    id: String,
    display_name: String,
    token: String,
}

pub async fn create_user(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<CreateUserResponse>), AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let display_name = body.display_name.trim().to_string();
    if display_name.is_empty() {
        return Err(AppError::BadRequest("display_name is required".to_string()));
    }

    let user = User {
        id: uuid::Uuid::new_v4().to_string(),
        display_name,
        api_token: new_token(),
    };
    {
        let db = state.conn()?;
        queries::create_user(&db, &user)?;
    }

    tracing::info!(user_id = %user.id, "user created");
    Ok((
        StatusCode::CREATED,
        Json(CreateUserResponse {
            id: user.id,
            display_name: user.display_name,
            token: user.api_token,
        }),
    ))
}

// POST /api/admin/users/:id/sign-out
pub async fn sign_out_user(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let rotated = {
        let db = state.conn()?;
        queries::rotate_user_token(&db, &id, &new_token())?
    };
    if !rotated {
        return Err(AppError::NotFound("user not found".to_string()));
    }

    state.identities.sign_out(&id);
    Ok(Json(serde_json::json!({ "ok": true })))
}
