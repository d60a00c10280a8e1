//! Booking models and queries.
//!
//! Queries that take part in the conflict-checked write path are generic over
//! the executor so they run either on the pool or inside a transaction.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Sqlite, SqlitePool};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Active,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Active => "active",
            BookingStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "active" => Ok(BookingStatus::Active),
            "cancelled" | "canceled" => Ok(BookingStatus::Cancelled),
            _ => Err(format!("Unknown booking status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Booking {
    pub id: String,
    pub room_id: String,
    pub user_id: String,
    pub start_time: String,
    pub end_time: String,
    pub status: String,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Booking {
    /// Anything that is not explicitly active is treated as cancelled
    pub fn status(&self) -> BookingStatus {
        self.status.parse().unwrap_or(BookingStatus::Cancelled)
    }

    pub fn is_active(&self) -> bool {
        self.status() == BookingStatus::Active
    }
}

/// A booking joined with the room it occupies, as returned by list endpoints
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct BookingWithRoom {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub booking: Booking,
    pub room_number: String,
    pub room_location: Option<String>,
}

/// Request body for creating a booking. Every field is optional here so
/// missing fields surface as validation errors instead of a rejected body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateBookingRequest {
    pub room_id: Option<String>,
    pub user_id: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub notes: Option<String>,
}

/// Partial update; absent fields keep their stored value
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateBookingRequest {
    pub room_id: Option<String>,
    pub user_id: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub status: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingListQuery {
    #[serde(rename = "userId", alias = "user_id")]
    pub user_id: Option<String>,
}

const SELECT_WITH_ROOM: &str = r#"
    SELECT b.*, r.room_number AS room_number, r.location AS room_location
    FROM bookings b
    JOIN rooms r ON r.id = b.room_id
"#;

impl Booking {
    pub async fn get_by_id<'e, E>(executor: E, id: &str) -> Result<Option<Booking>, sqlx::Error>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as("SELECT * FROM bookings WHERE id = ?")
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn insert<'e, E>(executor: E, booking: &Booking) -> Result<(), sqlx::Error>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        sqlx::query(
            r#"
            INSERT INTO bookings (id, room_id, user_id, start_time, end_time, status, notes, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&booking.id)
        .bind(&booking.room_id)
        .bind(&booking.user_id)
        .bind(&booking.start_time)
        .bind(&booking.end_time)
        .bind(&booking.status)
        .bind(&booking.notes)
        .bind(&booking.created_at)
        .bind(&booking.updated_at)
        .execute(executor)
        .await?;
        Ok(())
    }

    /// Write every mutable column of `booking` back to its row, but only if
    /// the row still matches `expected` (same status and `updated_at`).
    /// Returns false when another write got there first.
    pub async fn update_if_unchanged<'e, E>(
        executor: E,
        booking: &Booking,
        expected: &Booking,
    ) -> Result<bool, sqlx::Error>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            r#"
            UPDATE bookings
            SET room_id = ?, user_id = ?, start_time = ?, end_time = ?, status = ?, notes = ?, updated_at = ?
            WHERE id = ? AND status = ? AND updated_at = ?
            "#,
        )
        .bind(&booking.room_id)
        .bind(&booking.user_id)
        .bind(&booking.start_time)
        .bind(&booking.end_time)
        .bind(&booking.status)
        .bind(&booking.notes)
        .bind(&booking.updated_at)
        .bind(&booking.id)
        .bind(&expected.status)
        .bind(&expected.updated_at)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Move an active booking to cancelled. Returns false if it was not active.
    pub async fn cancel_if_active(
        db: &SqlitePool,
        id: &str,
        updated_at: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE bookings SET status = ?, updated_at = ? WHERE id = ? AND status = ?",
        )
        .bind(BookingStatus::Cancelled.as_str())
        .bind(updated_at)
        .bind(id)
        .bind(BookingStatus::Active.as_str())
        .execute(db)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete(db: &SqlitePool, id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM bookings WHERE id = ?")
            .bind(id)
            .execute(db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn list_with_room(db: &SqlitePool) -> Result<Vec<BookingWithRoom>, sqlx::Error> {
        let sql = format!("{} ORDER BY b.start_time ASC", SELECT_WITH_ROOM);
        sqlx::query_as(&sql).fetch_all(db).await
    }

    pub async fn list_for_user_with_room(
        db: &SqlitePool,
        user_id: &str,
    ) -> Result<Vec<BookingWithRoom>, sqlx::Error> {
        let sql = format!(
            "{} WHERE b.user_id = ? ORDER BY b.start_time ASC",
            SELECT_WITH_ROOM
        );
        sqlx::query_as(&sql).bind(user_id).fetch_all(db).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parsing() {
        assert_eq!("Active".parse::<BookingStatus>().unwrap(), BookingStatus::Active);
        assert_eq!("canceled".parse::<BookingStatus>().unwrap(), BookingStatus::Cancelled);
        assert!("pending".parse::<BookingStatus>().is_err());
    }

    #[test]
    fn test_list_query_accepts_both_spellings() {
        let q: BookingListQuery = serde_json::from_str(r#"{"userId":"u1"}"#).unwrap();
        assert_eq!(q.user_id.as_deref(), Some("u1"));
        let q: BookingListQuery = serde_json::from_str(r#"{"user_id":"u2"}"#).unwrap();
        assert_eq!(q.user_id.as_deref(), Some("u2"));
        let q: BookingListQuery = serde_json::from_str("{}").unwrap();
        assert!(q.user_id.is_none());
    }

    #[test]
    fn test_booking_with_room_serializes_flat() {
        let row = BookingWithRoom {
            booking: Booking {
                id: "b1".to_string(),
                room_id: "r1".to_string(),
                user_id: "u1".to_string(),
                start_time: "2025-03-04T09:00:00.000Z".to_string(),
                end_time: "2025-03-04T10:00:00.000Z".to_string(),
                status: "active".to_string(),
                notes: None,
                created_at: "2025-03-01T00:00:00.000Z".to_string(),
                updated_at: "2025-03-01T00:00:00.000Z".to_string(),
            },
            room_number: "B204".to_string(),
            room_location: Some("North wing".to_string()),
        };
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["id"], "b1");
        assert_eq!(json["room_number"], "B204");
        assert_eq!(json["room_location"], "North wing");
        assert!(json.get("booking").is_none());
    }
}
