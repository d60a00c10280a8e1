//! Room and room asset models.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

use super::common::now_timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomType {
    Classroom,
    Lab,
    PublicArea,
}

impl RoomType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoomType::Classroom => "classroom",
            RoomType::Lab => "lab",
            RoomType::PublicArea => "publicarea",
        }
    }
}

impl std::fmt::Display for RoomType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RoomType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['_', '-', ' '], "").as_str() {
            "classroom" => Ok(RoomType::Classroom),
            "lab" => Ok(RoomType::Lab),
            "publicarea" => Ok(RoomType::PublicArea),
            _ => Err(format!("Unknown room type: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Room {
    pub id: String,
    pub room_number: String,
    pub room_type: String,
    pub capacity: Option<i64>,
    pub location: Option<String>,
    pub floor_number: Option<i64>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RoomAsset {
    pub id: String,
    pub room_id: String,
    pub asset: String,
    pub created_at: String,
}

/// A room with its equipment, as returned by the room detail endpoint
#[derive(Debug, Clone, Serialize)]
pub struct RoomWithAssets {
    #[serde(flatten)]
    pub room: Room,
    pub assets: Vec<RoomAsset>,
}

#[derive(Debug, Clone)]
pub struct NewRoom {
    pub room_number: String,
    pub room_type: RoomType,
    pub capacity: Option<i64>,
    pub location: Option<String>,
    pub floor_number: Option<i64>,
}

impl Room {
    pub async fn get_by_id(db: &SqlitePool, id: &str) -> Result<Option<Room>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM rooms WHERE id = ?")
            .bind(id)
            .fetch_optional(db)
            .await
    }

    pub async fn get_by_room_number(
        db: &SqlitePool,
        room_number: &str,
    ) -> Result<Option<Room>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM rooms WHERE room_number = ?")
            .bind(room_number)
            .fetch_optional(db)
            .await
    }

    pub async fn list(db: &SqlitePool) -> Result<Vec<Room>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM rooms ORDER BY room_number ASC")
            .fetch_all(db)
            .await
    }

    pub async fn create(db: &SqlitePool, new: NewRoom) -> Result<Room, sqlx::Error> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = now_timestamp();

        sqlx::query(
            r#"
            INSERT INTO rooms (id, room_number, room_type, capacity, location, floor_number, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&new.room_number)
        .bind(new.room_type.as_str())
        .bind(new.capacity)
        .bind(&new.location)
        .bind(new.floor_number)
        .bind(&now)
        .execute(db)
        .await?;

        Self::get_by_id(db, &id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn add_asset(
        db: &SqlitePool,
        room_id: &str,
        asset: &str,
    ) -> Result<RoomAsset, sqlx::Error> {
        let asset = RoomAsset {
            id: uuid::Uuid::new_v4().to_string(),
            room_id: room_id.to_string(),
            asset: asset.to_string(),
            created_at: now_timestamp(),
        };

        sqlx::query("INSERT INTO room_assets (id, room_id, asset, created_at) VALUES (?, ?, ?, ?)")
            .bind(&asset.id)
            .bind(&asset.room_id)
            .bind(&asset.asset)
            .bind(&asset.created_at)
            .execute(db)
            .await?;

        Ok(asset)
    }

    pub async fn list_assets(db: &SqlitePool, room_id: &str) -> Result<Vec<RoomAsset>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM room_assets WHERE room_id = ? ORDER BY asset ASC")
            .bind(room_id)
            .fetch_all(db)
            .await
    }
}
