use std::sync::Arc;

use axum::extract::{FromRequestParts, Path, Query, State};
use axum::http::{StatusCode, request::Parts};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::engine::{BookingChanges, BookingRequest, Engine, EngineError};
use crate::model::{Actor, Booking, Room, RoomStatus, TimeRange, minutes_from_str, minutes_to_str};
use crate::recurrence::Recurrence;

/// Thin JSON surface over the engine. Authentication happens upstream; the
/// gateway forwards identity and capabilities as headers.
pub fn router(engine: Arc<Engine>) -> Router {
    Router::new()
        .route("/rooms", post(register_room).get(list_rooms))
        .route("/rooms/{id}/bookings", get(room_bookings))
        .route("/rooms/{id}/availability", get(room_availability))
        .route("/bookings", post(submit_booking))
        .route(
            "/bookings/{id}",
            get(get_booking).patch(update_booking).delete(delete_booking),
        )
        .route("/bookings/{id}/approve", post(approve_booking))
        .route("/bookings/{id}/reject", post(reject_booking))
        .route("/bookings/{id}/cancel", post(cancel_booking))
        .with_state(engine)
}

// ── Errors ───────────────────────────────────────────────────────

pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        let status = match &e {
            EngineError::ValidationFailed(_) | EngineError::InvalidRecurrence(_) => {
                StatusCode::BAD_REQUEST
            }
            EngineError::AuthorizationDenied(_) => StatusCode::FORBIDDEN,
            EngineError::NotFound(_) => StatusCode::NOT_FOUND,
            EngineError::Conflict { .. } => StatusCode::CONFLICT,
            EngineError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: e.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(serde_json::json!({ "message": self.message })),
        )
            .into_response()
    }
}

// ── Actor extraction ─────────────────────────────────────────────

impl<S: Send + Sync> FromRequestParts<S> for Actor {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned)
        };
        let user_id = header("x-user-id")
            .and_then(|s| s.parse::<Ulid>().ok())
            .ok_or_else(|| ApiError::bad_request("missing or invalid x-user-id header"))?;
        let flag = |name: &str| header(name).is_some_and(|s| s.eq_ignore_ascii_case("true"));
        Ok(Actor {
            user_id,
            can_approve_bookings: flag("x-can-approve-bookings"),
            can_act_as_other_user: flag("x-can-act-as-other-user"),
        })
    }
}

// ── Rooms ────────────────────────────────────────────────────────

fn default_room_status() -> RoomStatus {
    RoomStatus::Available
}

#[derive(Deserialize)]
struct RoomBody {
    number: String,
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    building: Option<String>,
    #[serde(default)]
    floor: Option<String>,
    #[serde(default)]
    amenities: Vec<String>,
    #[serde(default = "default_room_status")]
    status: RoomStatus,
}

async fn register_room(
    State(engine): State<Arc<Engine>>,
    actor: Actor,
    Json(body): Json<RoomBody>,
) -> Result<impl IntoResponse, ApiError> {
    let room = Room {
        id: Ulid::new(),
        number: body.number,
        name: body.name,
        description: body.description,
        building: body.building,
        floor: body.floor,
        amenities: body.amenities,
        status: body.status,
    };
    let room = engine.register_room(&actor, room).await?;
    Ok((StatusCode::CREATED, Json(room)))
}

async fn list_rooms(
    State(engine): State<Arc<Engine>>,
) -> Result<Json<Vec<Room>>, ApiError> {
    Ok(Json(engine.rooms().await?))
}

// ── Bookings ─────────────────────────────────────────────────────

#[derive(Deserialize)]
struct SubmitBody {
    room_id: Ulid,
    recurrence: Recurrence,
    slot: TimeRange,
    reserved_by: String,
    user_id: Ulid,
    email: String,
    #[serde(default)]
    notes: Option<String>,
}

async fn submit_booking(
    State(engine): State<Arc<Engine>>,
    actor: Actor,
    Json(body): Json<SubmitBody>,
) -> Result<impl IntoResponse, ApiError> {
    let created = engine
        .submit(
            &actor,
            BookingRequest {
                room_id: body.room_id,
                recurrence: body.recurrence,
                slot: body.slot,
                reserved_by: body.reserved_by,
                user_id: body.user_id,
                email: body.email,
                notes: body.notes,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn get_booking(
    State(engine): State<Arc<Engine>>,
    Path(id): Path<Ulid>,
) -> Result<Json<Booking>, ApiError> {
    Ok(Json(engine.booking(id).await?))
}

#[derive(Deserialize)]
struct UpdateBody {
    #[serde(default)]
    date: Option<NaiveDate>,
    #[serde(default)]
    slot: Option<TimeRange>,
    #[serde(default)]
    notes: Option<String>,
}

async fn update_booking(
    State(engine): State<Arc<Engine>>,
    actor: Actor,
    Path(id): Path<Ulid>,
    Json(body): Json<UpdateBody>,
) -> Result<Json<Booking>, ApiError> {
    let changes = BookingChanges {
        date: body.date,
        slot: body.slot,
        notes: body.notes,
    };
    Ok(Json(engine.update(&actor, id, changes).await?))
}

async fn delete_booking(
    State(engine): State<Arc<Engine>>,
    actor: Actor,
    Path(id): Path<Ulid>,
) -> Result<StatusCode, ApiError> {
    engine.delete(&actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn approve_booking(
    State(engine): State<Arc<Engine>>,
    actor: Actor,
    Path(id): Path<Ulid>,
) -> Result<Json<Booking>, ApiError> {
    Ok(Json(engine.approve(&actor, id).await?))
}

#[derive(Deserialize)]
struct RejectBody {
    #[serde(default)]
    reason: Option<String>,
}

async fn reject_booking(
    State(engine): State<Arc<Engine>>,
    actor: Actor,
    Path(id): Path<Ulid>,
    Json(body): Json<RejectBody>,
) -> Result<Json<Booking>, ApiError> {
    Ok(Json(engine.reject(&actor, id, body.reason).await?))
}

#[derive(Deserialize)]
struct CancelBody {
    reason: String,
}

async fn cancel_booking(
    State(engine): State<Arc<Engine>>,
    actor: Actor,
    Path(id): Path<Ulid>,
    Json(body): Json<CancelBody>,
) -> Result<Json<Booking>, ApiError> {
    Ok(Json(engine.cancel(&actor, id, &body.reason).await?))
}

// ── Listings & availability ──────────────────────────────────────

#[derive(Deserialize)]
struct DateQuery {
    date: NaiveDate,
}

async fn room_bookings(
    State(engine): State<Arc<Engine>>,
    Path(id): Path<Ulid>,
    Query(query): Query<DateQuery>,
) -> Result<Json<Vec<Booking>>, ApiError> {
    Ok(Json(engine.bookings_for(id, query.date).await?))
}

#[derive(Deserialize)]
struct AvailabilityQuery {
    date: NaiveDate,
    /// Optional "HH:MM" start time; when present the response also carries
    /// the valid end slots for it.
    #[serde(default)]
    start: Option<String>,
}

#[derive(Serialize)]
struct AvailabilityResponse {
    date: NaiveDate,
    busy: Vec<TimeRange>,
    free: Vec<TimeRange>,
    start_slots: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    end_slots: Option<Vec<String>>,
    pending: Vec<Booking>,
}

async fn room_availability(
    State(engine): State<Arc<Engine>>,
    Path(id): Path<Ulid>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<AvailabilityResponse>, ApiError> {
    let avail = engine.availability(id, query.date).await?;
    let end_slots = match &query.start {
        Some(raw) => {
            let start = minutes_from_str(raw)
                .ok_or_else(|| ApiError::bad_request(format!("invalid start time {raw:?}")))?;
            let ends = engine.end_slots_for(id, query.date, start).await?;
            Some(ends.into_iter().map(minutes_to_str).collect())
        }
        None => None,
    };
    Ok(Json(AvailabilityResponse {
        date: avail.date,
        busy: avail.busy,
        free: avail.free,
        start_slots: avail.start_slots.into_iter().map(minutes_to_str).collect(),
        end_slots,
        pending: avail.pending,
    }))
}
