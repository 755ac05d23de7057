use std::sync::Arc;

use tracing::info;

use crate::auth::credentials::CredentialHasher;
use crate::models::{NewUser, Role, User, UserPatch, UserRecord};
use crate::policy::{authorize, Action, Caller};
use crate::store::Store;
use crate::utils::error::AppError;

/// Identity and role store.
#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn Store>,
    hasher: Arc<dyn CredentialHasher>,
}

impl UserService {
    pub fn new(store: Arc<dyn Store>, hasher: Arc<dyn CredentialHasher>) -> Self {
        Self { store, hasher }
    }

    pub async fn register(&self, caller: &Caller, candidate: NewUser) -> Result<User, AppError> {
        authorize(caller, Action::RegisterUser)?;
        self.insert(candidate).await
    }

    /// Creates the configured administrator at startup unless a user with
    /// that email already exists, in which case that user is returned as is.
    pub async fn bootstrap_admin(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<User, AppError> {
        if let Some(existing) = self.lookup_by_email(email).await? {
            return Ok(existing);
        }
        self.insert(NewUser {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            role: Role::Admin,
        })
        .await
    }

    async fn hash_password(&self, plaintext: String) -> Result<String, AppError> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&plaintext))
            .await
            .map_err(|e| AppError::InternalServerError(format!("password hashing failed: {}", e)))?
    }

    async fn insert(&self, candidate: NewUser) -> Result<User, AppError> {
        candidate.validate()?;
        if self.lookup_by_email(&candidate.email).await?.is_some() {
            return Err(AppError::DuplicateEmail(format!(
                "Email '{}' is already registered",
                candidate.email
            )));
        }

        let user = self
            .store
            .insert_user(UserRecord {
                username: candidate.username,
                email: candidate.email,
                hashed_password: self.hash_password(candidate.password).await?,
                role: candidate.role,
            })
            .await?;
        info!(user_id = user.id, role = user.role.as_str(), "User registered");
        Ok(user)
    }

    pub async fn lookup_by_id(&self, id: i64) -> Result<User, AppError> {
        self.store
            .user_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("User", id))
    }

    pub async fn lookup_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        self.store.user_by_email(email).await
    }

    pub async fn list(&self, caller: &Caller) -> Result<Vec<User>, AppError> {
        authorize(caller, Action::ListUsers)?;
        self.store.list_users().await
    }

    /// `None` for an unknown email and for a wrong password alike.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<Option<User>, AppError> {
        let Some(user) = self.lookup_by_email(email).await? else {
            return Ok(None);
        };
        let hasher = self.hasher.clone();
        let (password, stored) = (password.to_string(), user.hashed_password.clone());
        let matches = tokio::task::spawn_blocking(move || hasher.verify(&password, &stored))
            .await
            .map_err(|e| AppError::InternalServerError(format!("password check failed: {}", e)))?;
        Ok(matches.then_some(user))
    }

    pub async fn update(&self, caller: &Caller, id: i64, patch: UserPatch) -> Result<User, AppError> {
        let mut user = self.lookup_by_id(id).await?;
        let changes_role = patch.role.is_some_and(|role| role != user.role);
        authorize(
            caller,
            Action::UpdateUser {
                target: id,
                changes_role,
            },
        )?;
        patch.validate()?;

        if let Some(email) = &patch.email {
            if let Some(owner) = self.lookup_by_email(email).await? {
                if owner.id != user.id {
                    return Err(AppError::DuplicateEmail(format!(
                        "Email '{}' is already registered",
                        email
                    )));
                }
            }
        }

        if let Some(username) = patch.username {
            user.username = username;
        }
        if let Some(email) = patch.email {
            user.email = email;
        }
        if let Some(password) = patch.password {
            user.hashed_password = self.hash_password(password).await?;
        }
        if let Some(role) = patch.role {
            user.role = role;
        }

        let user = self.store.update_user(&user).await?;
        info!(user_id = user.id, caller_id = caller.id, "User updated");
        Ok(user)
    }
}
