//! Thin identity layer: signup and credential verification.
//!
//! Credential handling is a boundary concern here, kept deliberately small.
//! Passwords are stored as hex SHA-256 over a server-side pepper and the
//! password, compared in constant time.

use std::sync::Arc;

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use uuid::Uuid;

use crate::application::repos::{CreateUserParams, RepoError, UsersRepo};
use crate::domain::entities::UserRecord;
use crate::domain::slug::is_valid_slug;

const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignupErrors {
    pub username: Option<&'static str>,
    pub password: Option<&'static str>,
}

impl SignupErrors {
    pub fn is_empty(&self) -> bool {
        self.username.is_none() && self.password.is_none()
    }
}

#[derive(Debug)]
pub enum SignupOutcome {
    Created(UserRecord),
    Invalid(SignupErrors),
}

#[derive(Clone)]
pub struct IdentityService {
    users: Arc<dyn UsersRepo>,
    pepper: Arc<str>,
}

impl IdentityService {
    pub fn new(users: Arc<dyn UsersRepo>, pepper: &str) -> Self {
        Self {
            users,
            pepper: Arc::from(pepper),
        }
    }

    fn hash_password(&self, password: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.pepper.as_bytes());
        hasher.update(b"\x00");
        hasher.update(password.as_bytes());
        hex::encode(hasher.finalize())
    }

    pub async fn signup(
        &self,
        username: &str,
        display_name: &str,
        password: &str,
    ) -> Result<SignupOutcome, RepoError> {
        let mut errors = SignupErrors::default();
        let username = username.trim();
        if !is_valid_slug(username) {
            errors.username = Some("Usernames use lowercase letters, digits and hyphens.");
        } else if self.users.find_by_username(username).await?.is_some() {
            errors.username = Some("That username is taken.");
        }
        if password.len() < MIN_PASSWORD_LEN {
            errors.password = Some("Passwords need at least 8 characters.");
        }
        if !errors.is_empty() {
            return Ok(SignupOutcome::Invalid(errors));
        }

        let display_name = if display_name.trim().is_empty() {
            username.to_string()
        } else {
            display_name.trim().to_string()
        };
        let record = self
            .users
            .create_user(CreateUserParams {
                username: username.to_string(),
                display_name,
                password_hash: self.hash_password(password),
            })
            .await?;
        Ok(SignupOutcome::Created(record))
    }

    /// `Some(user)` only when the username exists and the password matches.
    pub async fn verify_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<UserRecord>, RepoError> {
        let Some(user) = self.users.find_by_username(username.trim()).await? else {
            return Ok(None);
        };
        let candidate = self.hash_password(password);
        if candidate.as_bytes().ct_eq(user.password_hash.as_bytes()).into() {
            Ok(Some(user))
        } else {
            Ok(None)
        }
    }

    pub async fn user_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, RepoError> {
        self.users.find_by_id(id).await
    }
}
