//! Profile repository
//!
//! One row per user, created on first save.

use crate::db::DynDatabasePool;
use crate::models::{Profile, MEDIA_SLOT_COUNT};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row};
use std::sync::Arc;

#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// Stored profile of a user; `None` if they never saved one
    async fn get(&self, user_id: i64) -> Result<Option<Profile>>;

    /// Insert or replace the user's profile
    async fn upsert(&self, profile: &Profile) -> Result<Profile>;
}

/// SQLx-based profile repository implementation
pub struct SqlxProfileRepository {
    pool: DynDatabasePool,
}

impl SqlxProfileRepository {
    /// Create a new SQLx profile repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ProfileRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl ProfileRepository for SqlxProfileRepository {
    async fn get(&self, user_id: i64) -> Result<Option<Profile>> {
        let row = sqlx::query("SELECT * FROM profiles WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(self.pool.sqlite())
            .await
            .context("Failed to get profile")?;
        row.map(|r| row_to_profile(&r)).transpose()
    }

    async fn upsert(&self, profile: &Profile) -> Result<Profile> {
        let now = Utc::now();
        let mut slots = profile.media_slots.clone();
        slots.resize(MEDIA_SLOT_COUNT, None);

        sqlx::query(
            r#"
            INSERT INTO profiles
                (user_id, display_name, bio, location, website, avatar_url, banner_url, media_slots, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                display_name = excluded.display_name,
                bio = excluded.bio,
                location = excluded.location,
                website = excluded.website,
                avatar_url = excluded.avatar_url,
                banner_url = excluded.banner_url,
                media_slots = excluded.media_slots,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(profile.user_id)
        .bind(&profile.display_name)
        .bind(&profile.bio)
        .bind(&profile.location)
        .bind(&profile.website)
        .bind(&profile.avatar_url)
        .bind(&profile.banner_url)
        .bind(serde_json::to_string(&slots)?)
        .bind(now)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to save profile")?;

        Ok(Profile {
            media_slots: slots,
            updated_at: now,
            ..profile.clone()
        })
    }
}

fn row_to_profile(row: &SqliteRow) -> Result<Profile> {
    let slots: String = row.get("media_slots");
    let mut media_slots: Vec<Option<String>> =
        serde_json::from_str(&slots).context("Corrupt profile media slots")?;
    media_slots.resize(MEDIA_SLOT_COUNT, None);

    Ok(Profile {
        user_id: row.get("user_id"),
        display_name: row.get("display_name"),
        bio: row.get("bio"),
        location: row.get("location"),
        website: row.get("website"),
        avatar_url: row.get("avatar_url"),
        banner_url: row.get("banner_url"),
        media_slots,
        updated_at: row.get("updated_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};
    use crate::models::ProfileSlot;

    #[tokio::test]
    async fn test_upsert_and_get() {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let user_id = sqlx::query("INSERT INTO users (username, email, password_hash) VALUES ('p', 'p@x.test', 'h')")
            .execute(pool.sqlite())
            .await
            .unwrap()
            .last_insert_rowid();
        let repo = SqlxProfileRepository::new(pool);

        assert!(repo.get(user_id).await.unwrap().is_none());

        let mut profile = Profile::empty(user_id);
        profile.display_name = Some("Pat".to_string());
        profile.set_slot(ProfileSlot::Media(4), Some("https://x.test/4.jpg".to_string()));
        repo.upsert(&profile).await.unwrap();

        profile.bio = Some("hello".to_string());
        repo.upsert(&profile).await.unwrap();

        let loaded = repo.get(user_id).await.unwrap().unwrap();
        assert_eq!(loaded.display_name.as_deref(), Some("Pat"));
        assert_eq!(loaded.bio.as_deref(), Some("hello"));
        assert_eq!(loaded.slot(ProfileSlot::Media(4)), Some("https://x.test/4.jpg"));
        assert_eq!(loaded.media_slots.len(), MEDIA_SLOT_COUNT);
    }
}
