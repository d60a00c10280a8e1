//! Booking overlap detection.
//!
//! Intervals are half-open: `[start, end)`. Two ranges overlap when
//! `a.start < b.end && a.end > b.start`, so back-to-back bookings are fine.
//! Cancelled bookings never conflict.

use chrono::{DateTime, SubsecRound, Utc};
use sqlx::Sqlite;

use crate::db::{format_timestamp, parse_timestamp, Booking};
use crate::error::{ServiceError, ValidationErrorBuilder};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeRange {
    /// Build a range at stored (millisecond) precision, rejecting empty or
    /// inverted ones
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, ServiceError> {
        let (start, end) = (start.trunc_subsecs(3), end.trunc_subsecs(3));
        if start >= end {
            return Err(ServiceError::validation_field(
                "end_time",
                "start_time must be before end_time",
            ));
        }
        Ok(Self { start, end })
    }

    /// Parse both ends from client input, reporting each bad field
    pub fn parse(start: &str, end: &str) -> Result<Self, ServiceError> {
        let start_dt = parse_timestamp(start);
        let end_dt = parse_timestamp(end);

        let mut errors = ValidationErrorBuilder::new();
        if start_dt.is_none() {
            errors.add("start_time", "start_time is not a valid date-time");
        }
        if end_dt.is_none() {
            errors.add("end_time", "end_time is not a valid date-time");
        }

        match (start_dt, end_dt) {
            (Some(start), Some(end)) => Self::new(start, end),
            _ => Err(errors.into_error()),
        }
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn start_str(&self) -> String {
        format_timestamp(self.start)
    }

    pub fn end_str(&self) -> String {
        format_timestamp(self.end)
    }

    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start < other.end && self.end > other.start
    }
}

/// Every non-cancelled booking of `room_id` that overlaps `range`,
/// optionally ignoring one booking (the one being edited).
pub async fn find_overlapping<'e, E>(
    executor: E,
    room_id: &str,
    range: &TimeRange,
    exclude_booking_id: Option<&str>,
) -> Result<Vec<Booking>, sqlx::Error>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    sqlx::query_as(
        r#"
        SELECT * FROM bookings
        WHERE room_id = ?
          AND status != 'cancelled'
          AND start_time < ?
          AND end_time > ?
          AND (? IS NULL OR id != ?)
        ORDER BY start_time ASC
        "#,
    )
    .bind(room_id)
    .bind(range.end_str())
    .bind(range.start_str())
    .bind(exclude_booking_id)
    .bind(exclude_booking_id)
    .fetch_all(executor)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{now_timestamp, NewRoom, NewUser, Role, Room, RoomType, User};
    use crate::DbPool;
    use chrono::TimeZone;

    fn at(hour: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 4, hour, min, 0).unwrap()
    }

    fn range(h1: u32, m1: u32, h2: u32, m2: u32) -> TimeRange {
        TimeRange::new(at(h1, m1), at(h2, m2)).unwrap()
    }

    #[test]
    fn test_inverted_and_empty_ranges_rejected() {
        assert!(matches!(
            TimeRange::new(at(10, 0), at(9, 0)),
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            TimeRange::new(at(10, 0), at(10, 0)),
            Err(ServiceError::Validation(_))
        ));
    }

    #[test]
    fn test_sub_millisecond_range_is_empty() {
        assert!(matches!(
            TimeRange::parse("2025-03-04T09:00:00.0001Z", "2025-03-04T09:00:00.0009Z"),
            Err(ServiceError::Validation(_))
        ));
        let range =
            TimeRange::parse("2025-03-04T09:00:00.0001Z", "2025-03-04T09:00:00.0019Z").unwrap();
        assert_eq!(range.start_str(), "2025-03-04T09:00:00.000Z");
        assert_eq!(range.end_str(), "2025-03-04T09:00:00.001Z");
    }

    #[test]
    fn test_parse_reports_each_bad_field() {
        match TimeRange::parse("soon", "later") {
            Err(ServiceError::Validation(errors)) => {
                assert!(errors.contains_key("start_time"));
                assert!(errors.contains_key("end_time"));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
        let ok = TimeRange::parse("2025-03-04T09:00", "2025-03-04T10:00").unwrap();
        assert_eq!(ok.start_str(), "2025-03-04T09:00:00.000Z");
    }

    #[test]
    fn test_touching_ranges_do_not_overlap() {
        let a = range(9, 0, 10, 0);
        let b = range(10, 0, 11, 0);
        assert!(!a.overlaps(&b));
        assert!(!b.overlaps(&a));
    }

    #[test]
    fn test_overlap_cases() {
        let base = range(9, 0, 11, 0);
        // partial at either end, containment, identity
        assert!(base.overlaps(&range(8, 0, 9, 30)));
        assert!(base.overlaps(&range(10, 30, 12, 0)));
        assert!(base.overlaps(&range(9, 30, 10, 0)));
        assert!(base.overlaps(&range(8, 0, 12, 0)));
        assert!(base.overlaps(&base));
        // disjoint
        assert!(!base.overlaps(&range(12, 0, 13, 0)));
        assert!(!base.overlaps(&range(7, 0, 8, 59)));
    }

    #[test]
    fn test_overlap_is_symmetric() {
        let ranges = [
            range(8, 0, 9, 0),
            range(8, 30, 9, 30),
            range(9, 0, 10, 0),
            range(7, 0, 12, 0),
            range(11, 0, 11, 15),
        ];
        for a in &ranges {
            for b in &ranges {
                assert_eq!(a.overlaps(b), b.overlaps(a));
            }
        }
    }

    async fn insert_booking(db: &DbPool, room: &Room, user: &User, r: &TimeRange, status: &str) -> Booking {
        let now = now_timestamp();
        let booking = Booking {
            id: uuid::Uuid::new_v4().to_string(),
            room_id: room.id.clone(),
            user_id: user.id.clone(),
            start_time: r.start_str(),
            end_time: r.end_str(),
            status: status.to_string(),
            notes: None,
            created_at: now.clone(),
            updated_at: now,
        };
        Booking::insert(db, &booking).await.unwrap();
        booking
    }

    async fn fixtures() -> (tempfile::TempDir, DbPool, Room, Room, User) {
        let dir = tempfile::tempdir().unwrap();
        let db = crate::db::init(dir.path()).await.unwrap();
        let new_room = |n: &str| NewRoom {
            room_number: n.to_string(),
            room_type: RoomType::Classroom,
            capacity: None,
            location: None,
            floor_number: None,
        };
        let a = Room::create(&db, new_room("A1")).await.unwrap();
        let b = Room::create(&db, new_room("B1")).await.unwrap();
        let user = User::create(
            &db,
            NewUser {
                email: "t@school.test".to_string(),
                password_hash: "x:y".to_string(),
                role: Role::Teacher,
                display_name: "T".to_string(),
                class_name: None,
            },
        )
        .await
        .unwrap();
        (dir, db, a, b, user)
    }

    #[tokio::test]
    async fn test_find_overlapping_in_database() {
        let (_dir, db, room_a, room_b, user) = fixtures().await;
        let existing = insert_booking(&db, &room_a, &user, &range(9, 0, 10, 0), "active").await;
        insert_booking(&db, &room_a, &user, &range(9, 30, 10, 30), "cancelled").await;
        insert_booking(&db, &room_b, &user, &range(9, 0, 10, 0), "active").await;

        let hits = find_overlapping(&db, &room_a.id, &range(9, 30, 11, 0), None)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, existing.id);

        // Touching the end is fine
        let hits = find_overlapping(&db, &room_a.id, &range(10, 0, 11, 0), None)
            .await
            .unwrap();
        assert!(hits.is_empty());

        // The booking itself is ignored when excluded
        let hits = find_overlapping(&db, &room_a.id, &range(9, 0, 10, 0), Some(&existing.id))
            .await
            .unwrap();
        assert!(hits.is_empty());
    }
}
