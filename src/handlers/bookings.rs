use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::sse::{Event, Sse};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio_stream::StreamExt;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{role_of, Booking, BookingStatus, BookingView, NewBooking, Role};
use crate::services::demo::is_demo_id;
use crate::services::identity::follow_identity;
use crate::services::lifecycle::TransitionOutcome;
use crate::services::merger::{snapshot_once, MergeEvent};
use crate::state::AppState;

use super::{authenticate, current_user};

// GET /api/bookings
pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<BookingView>>, AppError> {
    let user = current_user(&state, &headers)?;
    let views = snapshot_once(state.store.as_ref(), &user.id, &state.demos).await?;
    Ok(Json(views))
}

// POST /api/bookings
pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<NewBooking>,
) -> Result<(StatusCode, Json<BookingView>), AppError> {
    let user = current_user(&state, &headers)?;

    if body.date.trim().is_empty() || body.time.trim().is_empty() {
        return Err(AppError::BadRequest("date and time are required".to_string()));
    }
    if body.room_count == 0 {
        return Err(AppError::BadRequest("room_count must be at least 1".to_string()));
    }

    let service = {
        let db = state.conn()?;
        queries::get_service(&db, &body.service_id)?
    }
    .filter(|s| s.active)
    .ok_or_else(|| AppError::NotFound("service not found".to_string()))?;

    if service.provider_id == user.id {
        return Err(AppError::BadRequest("cannot book your own service".to_string()));
    }

    let now = Utc::now();
    let booking = Booking {
        id: uuid::Uuid::new_v4().to_string(),
        customer_id: user.id,
        provider_id: service.provider_id,
        service_id: service.id,
        service_title: service.title,
        date: body.date.trim().to_string(),
        time: body.time.trim().to_string(),
        room_count: body.room_count,
        notes: body.notes.filter(|n| !n.trim().is_empty()),
        status: BookingStatus::Pending,
        created_at: Some(now),
        updated_at: Some(now),
    };
    state.store.insert_booking(&booking).await?;

    tracing::info!(
        booking_id = %booking.id,
        customer_id = %booking.customer_id,
        provider_id = %booking.provider_id,
        "booking requested"
    );
    Ok((
        StatusCode::CREATED,
        Json(BookingView::new(booking, Role::Customer)),
    ))
}

// GET /api/bookings/:id
pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<BookingView>, AppError> {
    let user = current_user(&state, &headers)?;
    let not_found = || AppError::NotFound("booking not found".to_string());

    if is_demo_id(&id) {
        return state.demos.find(&user.id, &id).map(Json).ok_or_else(not_found);
    }

    let booking = state.store.get_booking(&id).await?.ok_or_else(not_found)?;
    let role = role_of(&user.id, &booking).ok_or_else(not_found)?;
    Ok(Json(BookingView::new(booking, role)))
}

// POST /api/bookings/:id/status
#[derive(Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

#[derive(Serialize)]
pub struct StatusResponse {
    ok: bool,
    simulated: bool,
    status: BookingStatus,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    booking: Option<BookingView>,
}

pub async fn update_status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<StatusRequest>,
) -> Result<Json<StatusResponse>, AppError> {
    let user = current_user(&state, &headers)?;

    let requested = BookingStatus::parse(body.status.trim());
    if requested == BookingStatus::Unknown {
        return Err(AppError::BadRequest(format!(
            "unrecognized status: {}",
            body.status
        )));
    }

    let outcome = state
        .engine
        .request_transition(Some(&user.id), &id, requested)
        .await?;

    let message = outcome.message();
    let response = match outcome {
        TransitionOutcome::Applied(booking) => {
            let role = role_of(&user.id, &booking).unwrap_or(Role::Customer);
            StatusResponse {
                ok: true,
                simulated: false,
                status: booking.status,
                message,
                booking: Some(BookingView::new(booking, role)),
            }
        }
        TransitionOutcome::Simulated { status, .. } => StatusResponse {
            ok: true,
            simulated: true,
            status,
            message,
            booking: None,
        },
    };
    Ok(Json(response))
}

// GET /api/bookings/events (SSE stream of the merged view)
#[derive(Deserialize)]
pub struct SseQuery {
    pub token: Option<String>,
}

pub async fn events_stream(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SseQuery>,
) -> Result<Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>>, AppError> {
    // Auth via query param (EventSource can't set headers)
    let user = authenticate(&state, query.token.as_deref().unwrap_or(""))?;

    let identity = state.identities.watch(&user.id);
    let feed = follow_identity(Arc::clone(&state.store), state.demos.clone(), identity);
    tracing::debug!(user_id = %user.id, "booking feed opened");

    // The feed ends on sign-out; the trailing `None` ends the keepalives with it.
    let live_stream = feed
        .map(|event| Some(to_sse_event(&event)))
        .chain(tokio_stream::once(None));

    let keepalive_stream = tokio_stream::StreamExt::map(
        tokio_stream::wrappers::IntervalStream::new(tokio::time::interval(Duration::from_secs(
            state.config.sse_keepalive_secs,
        ))),
        |_| Some(Event::default().comment("keepalive")),
    );

    let stream = StreamExt::merge(live_stream, keepalive_stream)
        .take_while(Option::is_some)
        .filter_map(|event| event.map(Ok::<_, Infallible>));

    Ok(Sse::new(stream))
}

fn to_sse_event(event: &MergeEvent) -> Event {
    let (name, data) = sse_payload(event);
    Event::default().event(name).data(data)
}

fn sse_payload(event: &MergeEvent) -> (&'static str, String) {
    match event {
        MergeEvent::Snapshot { bookings } => serialized("bookings", bookings),
        MergeEvent::SubscriptionFailed { role, error } => (
            "subscription_error",
            serde_json::json!({ "role": role, "error": error }).to_string(),
        ),
        MergeEvent::Unavailable { error } => (
            "subscription_error",
            serde_json::json!({ "role": null, "error": error }).to_string(),
        ),
    }
}

// A snapshot that can't be encoded is reported as an error, never as an empty list.
fn serialized<T: Serialize + ?Sized>(name: &'static str, value: &T) -> (&'static str, String) {
    match serde_json::to_string(value) {
        Ok(data) => (name, data),
        Err(e) => {
            tracing::error!(event = name, error = %e, "failed to serialize event");
            (
                "subscription_error",
                serde_json::json!({ "role": null, "error": e.to_string() }).to_string(),
            )
        }
    }
}
