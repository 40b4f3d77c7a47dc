//! Accounts: registration, login and password change.

use chrono::Utc;
use metrics::counter;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, IntoActiveModel,
    QueryFilter, Set,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use validator::Validate;

use crate::auth::password::{hash_password, verify_password};
use crate::auth::{user, AuthService};
use crate::errors::ServiceError;

const ALL_FIELDS_REQUIRED: &str = "All fields are required";

fn required(value: &Option<String>) -> Result<&str, ServiceError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ServiceError::ValidationError(ALL_FIELDS_REQUIRED.to_string()))
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct CreateUserInput {
    #[validate(length(max = 64, message = "username must be at most 64 characters"))]
    pub username: Option<String>,
    #[validate(email(message = "email must be a valid address"))]
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginInput {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePasswordInput {
    /// Legacy field; must match the token's user when present.
    pub user_id: Option<i32>,
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

#[derive(Clone)]
pub struct UserService {
    db: Arc<DatabaseConnection>,
    auth: Arc<AuthService>,
}

impl UserService {
    pub fn new(db: Arc<DatabaseConnection>, auth: Arc<AuthService>) -> Self {
        Self { db, auth }
    }

    /// Registers an account. Username and email must both be unused.
    #[instrument(skip(self, input), fields(username = ?input.username))]
    pub async fn create_user(&self, input: CreateUserInput) -> Result<user::Model, ServiceError> {
        let username = required(&input.username)?;
        let email = required(&input.email)?;
        // Passwords are taken verbatim, spaces included.
        let password = input
            .password
            .as_deref()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| ServiceError::ValidationError(ALL_FIELDS_REQUIRED.to_string()))?;
        input.validate()?;

        let taken = user::Entity::find()
            .filter(
                Condition::any()
                    .add(user::Column::Username.eq(username))
                    .add(user::Column::Email.eq(email)),
            )
            .one(&*self.db)
            .await?;
        if taken.is_some() {
            return Err(ServiceError::ValidationError(
                "Username or email already in use".to_string(),
            ));
        }

        let now = Utc::now();
        let created = user::ActiveModel {
            username: Set(username.to_string()),
            email: Set(email.to_string()),
            password: Set(hash_password(password)?),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&*self.db)
        .await?;

        counter!("storefront.users.created", 1);
        info!(user_id = created.id, "Created user");
        Ok(created)
    }

    /// Returns a signed token. Unknown email and wrong password fail alike.
    #[instrument(skip(self, input))]
    pub async fn login(&self, input: LoginInput) -> Result<String, ServiceError> {
        let email = required(&input.email)?;
        let password = input
            .password
            .as_deref()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| ServiceError::ValidationError(ALL_FIELDS_REQUIRED.to_string()))?;

        let account = user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .one(&*self.db)
            .await?;

        let account = match account {
            Some(account) if verify_password(password, &account.password)? => account,
            _ => {
                counter!("storefront.auth.login_failed", 1);
                warn!("Rejected login attempt");
                return Err(ServiceError::InvalidCredentials);
            }
        };

        let token = self.auth.generate_token(account.id)?;
        info!(user_id = account.id, "User logged in");
        Ok(token)
    }

    /// Changes the password of `user_id`, the caller identified by the token.
    #[instrument(skip(self, input))]
    pub async fn update_password(
        &self,
        user_id: i32,
        input: UpdatePasswordInput,
    ) -> Result<user::Model, ServiceError> {
        if matches!(input.user_id, Some(claimed) if claimed != user_id) {
            return Err(ServiceError::Unauthorized(
                "Cannot change another user's password".to_string(),
            ));
        }
        let (current, new) = match (
            input.current_password.as_deref().filter(|p| !p.is_empty()),
            input.new_password.as_deref().filter(|p| !p.is_empty()),
        ) {
            (Some(current), Some(new)) => (current, new),
            _ => {
                return Err(ServiceError::ValidationError(
                    ALL_FIELDS_REQUIRED.to_string(),
                ))
            }
        };

        let account = user::Entity::find_by_id(user_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))?;

        if !verify_password(current, &account.password)? {
            return Err(ServiceError::Unauthorized(
                "Current password is incorrect".to_string(),
            ));
        }

        let mut model = account.into_active_model();
        model.password = Set(hash_password(new)?);
        model.updated_at = Set(Utc::now());
        let updated = model.update(&*self.db).await?;

        info!(user_id, "Password updated");
        Ok(updated)
    }
}
