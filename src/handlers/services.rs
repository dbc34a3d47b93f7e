use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{NewService, ServiceFilter, ServiceListing};
use crate::state::AppState;

use super::current_user;

// GET /api/services
#[derive(Deserialize)]
pub struct ServicesQuery {
    pub limit: Option<i64>,
    pub category: Option<String>,
    pub q: Option<String>,
    pub provider_id: Option<String>,
}

pub async fn list_services(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<ServicesQuery>,
) -> Result<Json<Vec<ServiceListing>>, AppError> {
    current_user(&state, &headers)?;

    let limit = query.limit.unwrap_or(50).clamp(1, 200);
    let filter = ServiceFilter::new(query.provider_id, query.category, query.q);
    let services = {
        let db = state.conn()?;
        queries::list_active_services(&db, &filter, limit)?
    };
    Ok(Json(services))
}

// POST /api/services
pub async fn create_service(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<NewService>,
) -> Result<(StatusCode, Json<ServiceListing>), AppError> {
    let user = current_user(&state, &headers)?;

    let title = body.title.trim().to_string();
    let description = body.description.trim().to_string();
    let category = body.category.trim().to_lowercase();
    if title.is_empty() || description.is_empty() || category.is_empty() {
        return Err(AppError::BadRequest(
            "title, description and category are required".to_string(),
        ));
    }
    if !body.daily_rate.is_finite() || body.daily_rate <= 0.0 {
        return Err(AppError::BadRequest("daily_rate must be positive".to_string()));
    }

    let service = ServiceListing {
        id: uuid::Uuid::new_v4().to_string(),
        provider_id: user.id,
        title,
        description,
        category,
        daily_rate: body.daily_rate,
        active: true,
        created_at: Utc::now(),
    };
    {
        let db = state.conn()?;
        queries::create_service(&db, &service)?;
    }

    tracing::info!(service_id = %service.id, provider_id = %service.provider_id, "service published");
    Ok((StatusCode::CREATED, Json(service)))
}
