//! Database seeders for bootstrap data
//!
//! Runs on every startup. Both seeders only insert what is missing, so an
//! existing instance is never modified.

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use tracing::{info, warn};

use super::models::{NewRoom, NewUser, Role, Room, RoomType, User};
use crate::config::{AuthConfig, SeedRoom};
use crate::crypto;

/// Create the configured admin account if it does not exist yet
pub async fn ensure_admin_user(pool: &SqlitePool, auth: &AuthConfig) -> Result<Option<User>> {
    let (email, password) = match (&auth.admin_email, &auth.admin_password) {
        (Some(email), Some(password)) if !email.trim().is_empty() && !password.is_empty() => {
            (email.trim().to_lowercase(), password)
        }
        (Some(_), None) | (None, Some(_)) => {
            warn!("Both auth.admin_email and auth.admin_password must be set to seed an admin");
            return Ok(None);
        }
        _ => return Ok(None),
    };

    if User::get_by_email(pool, &email).await?.is_some() {
        return Ok(None);
    }

    let password_hash = crypto::hash_password(password)
        .map_err(|e| anyhow::anyhow!("Failed to hash admin password: {}", e))?;

    let user = User::create(
        pool,
        NewUser {
            email: email.clone(),
            password_hash,
            role: Role::Admin,
            display_name: auth.admin_name.clone(),
            class_name: None,
        },
    )
    .await
    .context("Failed to create admin user")?;

    info!(email = %email, "Seeded admin user");
    Ok(Some(user))
}

/// Insert configured rooms whose room number is not taken yet
pub async fn seed_rooms(pool: &SqlitePool, rooms: &[SeedRoom]) -> Result<usize> {
    let mut created = 0;

    for seed in rooms {
        if Room::get_by_room_number(pool, &seed.room_number)
            .await?
            .is_some()
        {
            continue;
        }

        let room_type = match seed.room_type.parse::<RoomType>() {
            Ok(t) => t,
            Err(e) => {
                warn!(room = %seed.room_number, "Skipping seed room: {}", e);
                continue;
            }
        };

        let room = Room::create(
            pool,
            NewRoom {
                room_number: seed.room_number.clone(),
                room_type,
                capacity: seed.capacity,
                location: seed.location.clone(),
                floor_number: seed.floor_number,
            },
        )
        .await
        .with_context(|| format!("Failed to seed room {}", seed.room_number))?;

        for asset in &seed.assets {
            Room::add_asset(pool, &room.id, asset).await?;
        }
        created += 1;
    }

    if created > 0 {
        info!("Seeded {} room(s)", created);
    }
    Ok(created)
}
