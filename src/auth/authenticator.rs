use crate::auth::digest::{self, DigestError, PasswordScheme};
use crate::model::{UserId, UserRecord};
use crate::store::{StoreError, UserStore};
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;

/// Why a login attempt failed.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No user has this email.
    #[error("No user with that email address found.")]
    UnknownIdentifier,
    /// The password does not match the stored digest.
    #[error("You've entered a wrong password.")]
    BadSecret,
    /// The stored digest could not be checked.
    #[error(transparent)]
    Digest(#[from] DigestError),
    /// The user store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Why a registration was refused.
#[derive(Debug, Error)]
pub enum RegisterError {
    /// A required form field is empty.
    #[error("Please enter your {0}.")]
    MissingField(&'static str),
    /// The repeated password differs.
    #[error("Passwords do not match")]
    PasswordMismatch,
    /// The email is already taken.
    #[error("This email address is already registered.")]
    DuplicateEmail,
    /// Digesting the password failed.
    #[error(transparent)]
    Digest(#[from] DigestError),
    /// Any other store failure.
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for RegisterError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateEmail => RegisterError::DuplicateEmail,
            other => RegisterError::Store(other),
        }
    }
}

impl RegisterError {
    /// Whether the message is meant for the person filling the form.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            RegisterError::MissingField(_)
                | RegisterError::PasswordMismatch
                | RegisterError::DuplicateEmail
        )
    }
}

/// Registration form content.
#[derive(Deserialize)]
pub struct SignUp {
    /// Email to register.
    pub email: String,
    /// Chosen password.
    pub password: String,
    /// Must equal `password`.
    pub repeat_password: String,
}

impl SignUp {
    /// Builds the form content from borrowed fields.
    pub fn new(email: &str, password: &str, repeat_password: &str) -> SignUp {
        SignUp {
            email: email.to_string(),
            password: password.to_string(),
            repeat_password: repeat_password.to_string(),
        }
    }
}

/// Verifies email/password pairs and maps users to and from their session
/// form. Holds no state of its own besides the store handle, so clones are
/// cheap and interchangeable.
#[derive(Clone)]
pub struct Authenticator {
    users: Arc<dyn UserStore>,
    scheme: PasswordScheme,
}

impl Authenticator {
    /// Checks credentials against `users`; new passwords are digested with
    /// `scheme`.
    pub fn new(users: Arc<dyn UserStore>, scheme: PasswordScheme) -> Authenticator {
        Authenticator { users, scheme }
    }

    /// The underlying user store.
    pub fn users(&self) -> &Arc<dyn UserStore> {
        &self.users
    }

    /// Returns the user whose email and password match.
    pub async fn authenticate(&self, email: &str, secret: &str) -> Result<UserRecord, AuthError> {
        let user = self
            .users
            .find_by_email(email)
            .await?
            .ok_or(AuthError::UnknownIdentifier)?;
        if digest::verify(secret, &user.password_hash)? {
            Ok(user)
        } else {
            Err(AuthError::BadSecret)
        }
    }

    /// Validates the form, digests the password and creates the user.
    pub async fn register(&self, sign_up: &SignUp) -> Result<UserRecord, RegisterError> {
        if sign_up.email.is_empty() {
            return Err(RegisterError::MissingField("email address"));
        }
        if sign_up.password.is_empty() {
            return Err(RegisterError::MissingField("password"));
        }
        if sign_up.password != sign_up.repeat_password {
            return Err(RegisterError::PasswordMismatch);
        }
        let password_hash = self.scheme.digest(&sign_up.password)?;
        Ok(self.users.create(&sign_up.email, &password_hash).await?)
    }

    /// The value kept in the session for an authenticated user.
    pub fn serialize_identity(&self, user: &UserRecord) -> String {
        user.id.to_string()
    }

    /// Resolves a session value back to its user. `None` when the value does
    /// not name an existing user any more.
    pub async fn deserialize_identity(
        &self,
        serialized: &str,
    ) -> Result<Option<UserRecord>, StoreError> {
        match serialized.parse::<UserId>() {
            Ok(id) => self.users.find_by_id(id).await,
            Err(_) => Ok(None),
        }
    }
}
