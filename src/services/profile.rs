//! Profile service
//!
//! Profiles are public to read. Only the profile's own user may write it.

use crate::db::repositories::{ProfileRepository, UserRepository};
use crate::models::{Profile, ProfileSlot, UpdateProfileInput, User};
use anyhow::Context;
use std::sync::Arc;

const MAX_DISPLAY_NAME: usize = 100;
const MAX_LOCATION: usize = 100;
const MAX_BIO: usize = 2000;
const MAX_WEBSITE: usize = 500;

#[derive(Debug, thiserror::Error)]
pub enum ProfileServiceError {
    #[error("User not found: {0}")]
    NotFound(i64),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Profile service; every write is limited to the profile owner
pub struct ProfileService {
    repo: Arc<dyn ProfileRepository>,
    user_repo: Arc<dyn UserRepository>,
}

impl ProfileService {
    /// Create a new profile service
    pub fn new(repo: Arc<dyn ProfileRepository>, user_repo: Arc<dyn UserRepository>) -> Self {
        Self { repo, user_repo }
    }

    /// Profile of an existing user; an empty one if they never saved it
    pub async fn get(&self, user_id: i64) -> Result<Profile, ProfileServiceError> {
        if self.user_repo.get_by_id(user_id).await?.is_none() {
            return Err(ProfileServiceError::NotFound(user_id));
        }
        Ok(self
            .repo
            .get(user_id)
            .await
            .context("Failed to load profile")?
            .unwrap_or_else(|| Profile::empty(user_id)))
    }

    /// Update the text fields of `user_id`'s profile
    pub async fn update(
        &self,
        actor: &User,
        user_id: i64,
        input: UpdateProfileInput,
    ) -> Result<Profile, ProfileServiceError> {
        check_owner(actor, user_id)?;
        let mut profile = self.get(user_id).await?;

        if let Some(name) = input.display_name {
            profile.display_name = limited("Display name", name, MAX_DISPLAY_NAME)?;
        }
        if let Some(bio) = input.bio {
            profile.bio = limited("Bio", bio, MAX_BIO)?;
        }
        if let Some(location) = input.location {
            profile.location = limited("Location", location, MAX_LOCATION)?;
        }
        if let Some(website) = input.website {
            let website = limited("Website", website, MAX_WEBSITE)?;
            if let Some(url) = &website {
                if !(url.starts_with("http://") || url.starts_with("https://")) {
                    return Err(ProfileServiceError::ValidationError(
                        "Website must start with http:// or https://".to_string(),
                    ));
                }
            }
            profile.website = website;
        }

        Ok(self.repo.upsert(&profile).await.context("Failed to save profile")?)
    }

    /// Write (or clear, with `None`) one image slot
    pub async fn set_slot(
        &self,
        actor: &User,
        user_id: i64,
        slot: ProfileSlot,
        url: Option<String>,
    ) -> Result<Profile, ProfileServiceError> {
        check_owner(actor, user_id)?;
        let mut profile = self.get(user_id).await?;
        profile.set_slot(slot, url.filter(|u| !u.trim().is_empty()));

        let saved = self.repo.upsert(&profile).await.context("Failed to save profile")?;
        tracing::info!(user_id, slot = %slot, "Updated profile slot");
        Ok(saved)
    }
}

fn check_owner(actor: &User, user_id: i64) -> Result<(), ProfileServiceError> {
    if actor.id != user_id {
        return Err(ProfileServiceError::PermissionDenied(
            "You can only edit your own profile".to_string(),
        ));
    }
    Ok(())
}

/// Trimmed value, `None` when blank, error when over `max` characters
fn limited(field: &str, value: String, max: usize) -> Result<Option<String>, ProfileServiceError> {
    let value = value.trim();
    if value.chars().count() > max {
        return Err(ProfileServiceError::ValidationError(format!(
            "{} must be at most {} characters",
            field, max
        )));
    }
    Ok((!value.is_empty()).then(|| value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxProfileRepository, SqlxUserRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::UserRole;

    async fn setup() -> (ProfileService, User, User) {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let users = SqlxUserRepository::boxed(pool.clone());
        let owner = users
            .create(&User::new("owner".into(), "o@x.test".into(), "h".into(), UserRole::Visitor))
            .await
            .unwrap();
        let admin = users
            .create(&User::new("admin".into(), "a@x.test".into(), "h".into(), UserRole::Admin))
            .await
            .unwrap();
        (ProfileService::new(SqlxProfileRepository::boxed(pool), users), owner, admin)
    }

    #[tokio::test]
    async fn test_missing_profile_is_empty() {
        let (service, owner, _) = setup().await;
        let profile = service.get(owner.id).await.unwrap();
        assert!(profile.display_name.is_none());
        assert!(matches!(service.get(404).await, Err(ProfileServiceError::NotFound(404))));
    }

    #[tokio::test]
    async fn test_owner_updates_fields() {
        let (service, owner, _) = setup().await;
        let input = UpdateProfileInput {
            display_name: Some(" Olive ".to_string()),
            website: Some("https://olive.test".to_string()),
            ..UpdateProfileInput::default()
        };
        let profile = service.update(&owner, owner.id, input).await.unwrap();
        assert_eq!(profile.display_name.as_deref(), Some("Olive"));

        let bad = UpdateProfileInput {
            website: Some("ftp://olive.test".to_string()),
            ..UpdateProfileInput::default()
        };
        assert!(matches!(
            service.update(&owner, owner.id, bad).await,
            Err(ProfileServiceError::ValidationError(_))
        ));

        let long = UpdateProfileInput {
            bio: Some("x".repeat(MAX_BIO + 1)),
            ..UpdateProfileInput::default()
        };
        assert!(service.update(&owner, owner.id, long).await.is_err());
    }

    #[tokio::test]
    async fn test_non_owner_is_denied() {
        let (service, owner, admin) = setup().await;
        let result = service
            .set_slot(&admin, owner.id, ProfileSlot::Avatar, Some("https://x.test/a.jpg".into()))
            .await;
        assert!(matches!(result, Err(ProfileServiceError::PermissionDenied(_))));
    }

    #[tokio::test]
    async fn test_set_and_clear_slot() {
        let (service, owner, _) = setup().await;
        let url = "https://x.test/m.jpg".to_string();
        let profile = service
            .set_slot(&owner, owner.id, ProfileSlot::Media(5), Some(url.clone()))
            .await
            .unwrap();
        assert_eq!(profile.slot(ProfileSlot::Media(5)), Some(url.as_str()));

        let cleared = service.set_slot(&owner, owner.id, ProfileSlot::Media(5), None).await.unwrap();
        assert_eq!(cleared.slot(ProfileSlot::Media(5)), None);
    }
}
