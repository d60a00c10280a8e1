use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use super::error::ApiError;
use super::validation::validate_id;
use crate::db::{Room, RoomWithAssets};
use crate::AppState;

/// List rooms, ordered by room number
pub async fn list_rooms(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Room>>, ApiError> {
    Ok(Json(Room::list(&state.db).await?))
}

/// Get a room with its assets
pub async fn get_room(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<RoomWithAssets>, ApiError> {
    validate_id(&id, "id").map_err(|_| ApiError::not_found("Room not found"))?;

    let room = Room::get_by_id(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::not_found("Room not found"))?;
    let assets = Room::list_assets(&state.db, &room.id).await?;

    Ok(Json(RoomWithAssets { room, assets }))
}
