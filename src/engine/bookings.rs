//! Booking lifecycle: create, read, update, cancel, delete and list.
//!
//! Writes that can introduce an overlap hold a per-room lock and run the
//! write plus the overlap query in one transaction, so two requests for the
//! same slot cannot both succeed.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use super::conflicts::{find_overlapping, TimeRange};
use crate::db::{
    now_timestamp, AuthUser, Booking, BookingListQuery, BookingStatus, BookingWithRoom,
    CreateBookingRequest, Role, Room, UpdateBookingRequest, User,
};
use crate::error::{ServiceError, ValidationErrorBuilder};
use crate::DbPool;

/// Fail with `Forbidden` unless the user's role is one of `allowed`
pub fn authorize(user: &AuthUser, allowed: &[Role]) -> Result<(), ServiceError> {
    if allowed.contains(&user.role) {
        Ok(())
    } else {
        Err(ServiceError::forbidden(
            "You do not have permission to perform this action",
        ))
    }
}

fn ensure_can_access(requester: &AuthUser, booking: &Booking) -> Result<(), ServiceError> {
    if requester.is_staff() || booking.user_id == requester.id {
        Ok(())
    } else {
        Err(ServiceError::forbidden(
            "You can only access your own bookings",
        ))
    }
}

/// Treat absent and blank strings alike
fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Merge-and-write rounds before an update gives up on a contended row
const UPDATE_ATTEMPTS: usize = 3;

fn is_valid_id(id: &str) -> bool {
    uuid::Uuid::parse_str(id).is_ok()
}

#[derive(Clone)]
pub struct BookingManager {
    db: DbPool,
    room_locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl BookingManager {
    pub fn new(db: DbPool) -> Self {
        Self {
            db,
            room_locks: Arc::new(DashMap::new()),
        }
    }

    fn room_lock(&self, room_id: &str) -> Arc<Mutex<()>> {
        self.room_locks
            .entry(room_id.to_string())
            .or_default()
            .clone()
    }

    async fn require_room(&self, room_id: &str) -> Result<Room, ServiceError> {
        Room::get_by_id(&self.db, room_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Room not found"))
    }

    async fn require_user(&self, user_id: &str) -> Result<User, ServiceError> {
        User::get_by_id(&self.db, user_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("User not found"))
    }

    async fn require_booking(&self, id: &str) -> Result<Booking, ServiceError> {
        Booking::get_by_id(&self.db, id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Booking not found"))
    }

    pub async fn create(
        &self,
        requester: &AuthUser,
        req: CreateBookingRequest,
    ) -> Result<Booking, ServiceError> {
        let room_id = non_blank(req.room_id);
        let user_id = non_blank(req.user_id);
        let start_time = non_blank(req.start_time);
        let end_time = non_blank(req.end_time);

        let mut errors = ValidationErrorBuilder::new();
        for (field, value) in [
            ("room_id", &room_id),
            ("user_id", &user_id),
            ("start_time", &start_time),
            ("end_time", &end_time),
        ] {
            if value.is_none() {
                errors.add(field, format!("{} is required", field));
            }
        }
        let (Some(room_id), Some(user_id), Some(start_time), Some(end_time)) =
            (room_id, user_id, start_time, end_time)
        else {
            return Err(errors.into_error());
        };

        let range = TimeRange::parse(&start_time, &end_time)?;

        if !requester.is_staff() && user_id != requester.id {
            return Err(ServiceError::forbidden(
                "Students can only create bookings for themselves",
            ));
        }

        self.require_room(&room_id).await?;
        self.require_user(&user_id).await?;

        let now = now_timestamp();
        let booking = Booking {
            id: uuid::Uuid::new_v4().to_string(),
            room_id,
            user_id,
            start_time: range.start_str(),
            end_time: range.end_str(),
            status: BookingStatus::Active.to_string(),
            notes: non_blank(req.notes),
            created_at: now.clone(),
            updated_at: now,
        };

        let lock = self.room_lock(&booking.room_id);
        let _guard = lock.lock().await;

        // Writing first takes SQLite's write lock before the overlap query reads
        let mut tx = self.db.begin().await?;
        Booking::insert(&mut *tx, &booking).await?;
        let conflicts =
            find_overlapping(&mut *tx, &booking.room_id, &range, Some(&booking.id)).await?;
        if !conflicts.is_empty() {
            tx.rollback().await?;
            return Err(ServiceError::Conflict { conflicts });
        }
        tx.commit().await?;

        info!(
            booking_id = %booking.id,
            room_id = %booking.room_id,
            user_id = %booking.user_id,
            "Booking created"
        );
        Ok(booking)
    }

    pub async fn get(&self, requester: &AuthUser, id: &str) -> Result<Booking, ServiceError> {
        let booking = self.require_booking(id).await?;
        ensure_can_access(requester, &booking)?;
        Ok(booking)
    }

    /// Cancel a booking. Cancelling twice is not an error.
    pub async fn cancel(&self, requester: &AuthUser, id: &str) -> Result<Booking, ServiceError> {
        let booking = self.require_booking(id).await?;
        ensure_can_access(requester, &booking)?;

        if !booking.is_active() {
            return Ok(booking);
        }

        if Booking::cancel_if_active(&self.db, &booking.id, &now_timestamp()).await? {
            info!(booking_id = %booking.id, cancelled_by = %requester.id, "Booking cancelled");
        }

        // Either this call or a concurrent one settled the final state
        self.require_booking(id).await
    }

    /// Apply a partial update.
    ///
    /// The write only lands if the row is unchanged since it was read; on a
    /// lost race the patch is merged again onto the fresh row.
    pub async fn update(
        &self,
        requester: &AuthUser,
        id: &str,
        patch: UpdateBookingRequest,
    ) -> Result<Booking, ServiceError> {
        let new_user_id = non_blank(patch.user_id);
        let new_room_id = non_blank(patch.room_id);
        let start_time = non_blank(patch.start_time);
        let end_time = non_blank(patch.end_time);
        let notes = patch.notes.map(|n| non_blank(Some(n)));
        let new_status = match non_blank(patch.status) {
            Some(s) => Some(
                s.parse::<BookingStatus>()
                    .map_err(|e| ServiceError::validation_field("status", e))?,
            ),
            None => None,
        };
        let placement_changed =
            new_room_id.is_some() || start_time.is_some() || end_time.is_some();

        for _ in 0..UPDATE_ATTEMPTS {
            let existing = self.require_booking(id).await?;
            ensure_can_access(requester, &existing)?;

            if let Some(user_id) = &new_user_id {
                if !requester.is_staff() && *user_id != existing.user_id {
                    return Err(ServiceError::forbidden(
                        "Students cannot reassign bookings",
                    ));
                }
            }
            if existing.status() == BookingStatus::Cancelled
                && new_status == Some(BookingStatus::Active)
            {
                return Err(ServiceError::validation_field(
                    "status",
                    "A cancelled booking cannot be reactivated",
                ));
            }

            let range = TimeRange::parse(
                start_time.as_deref().unwrap_or(&existing.start_time),
                end_time.as_deref().unwrap_or(&existing.end_time),
            )?;

            if let Some(room_id) = &new_room_id {
                self.require_room(room_id).await?;
            }
            if let Some(user_id) = &new_user_id {
                self.require_user(user_id).await?;
            }

            let mut booking = existing.clone();
            if let Some(room_id) = &new_room_id {
                booking.room_id = room_id.clone();
            }
            if let Some(user_id) = &new_user_id {
                booking.user_id = user_id.clone();
            }
            if let Some(status) = new_status {
                booking.status = status.to_string();
            }
            if let Some(notes) = &notes {
                booking.notes = notes.clone();
            }
            booking.start_time = range.start_str();
            booking.end_time = range.end_str();
            booking.updated_at = now_timestamp();

            let check_conflicts = booking.is_active() && placement_changed;
            if self
                .write_update(&booking, &existing, &range, check_conflicts)
                .await?
            {
                info!(booking_id = %booking.id, updated_by = %requester.id, "Booking updated");
                return Ok(booking);
            }
        }

        Err(ServiceError::ConcurrentUpdate)
    }

    /// Returns false when the row changed after `expected` was read
    async fn write_update(
        &self,
        booking: &Booking,
        expected: &Booking,
        range: &TimeRange,
        check_conflicts: bool,
    ) -> Result<bool, ServiceError> {
        if !check_conflicts {
            return Ok(Booking::update_if_unchanged(&self.db, booking, expected).await?);
        }

        let lock = self.room_lock(&booking.room_id);
        let _guard = lock.lock().await;

        let mut tx = self.db.begin().await?;
        if !Booking::update_if_unchanged(&mut *tx, booking, expected).await? {
            tx.rollback().await?;
            return Ok(false);
        }
        let conflicts =
            find_overlapping(&mut *tx, &booking.room_id, range, Some(&booking.id)).await?;
        if !conflicts.is_empty() {
            tx.rollback().await?;
            return Err(ServiceError::Conflict { conflicts });
        }
        tx.commit().await?;
        Ok(true)
    }

    /// Hard delete, admins only
    pub async fn delete(&self, requester: &AuthUser, id: &str) -> Result<(), ServiceError> {
        authorize(requester, &[Role::Admin])?;

        if !Booking::delete(&self.db, id).await? {
            return Err(ServiceError::not_found("Booking not found"));
        }

        info!(booking_id = %id, deleted_by = %requester.id, "Booking deleted");
        Ok(())
    }

    /// Students always get their own bookings; staff get everything or one
    /// user's bookings when filtered.
    pub async fn list(
        &self,
        requester: &AuthUser,
        filter: BookingListQuery,
    ) -> Result<Vec<BookingWithRoom>, ServiceError> {
        if !requester.is_staff() {
            return Ok(Booking::list_for_user_with_room(&self.db, &requester.id).await?);
        }

        match filter.user_id {
            Some(user_id) => {
                if !is_valid_id(&user_id) {
                    return Err(ServiceError::validation_field(
                        "userId",
                        "userId must be a valid id",
                    ));
                }
                Ok(Booking::list_for_user_with_room(&self.db, &user_id).await?)
            }
            None => Ok(Booking::list_with_room(&self.db).await?),
        }
    }

    pub async fn list_for_user(
        &self,
        requester: &AuthUser,
        user_id: &str,
    ) -> Result<Vec<BookingWithRoom>, ServiceError> {
        if !requester.is_staff() && requester.id != user_id {
            return Err(ServiceError::forbidden(
                "You can only view your own bookings",
            ));
        }
        Ok(Booking::list_for_user_with_room(&self.db, user_id).await?)
    }
}
