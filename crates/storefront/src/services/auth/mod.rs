//! Authentication state for the storefront.
//!
//! [`AuthStore`] wraps the shared [`Session`](crate::backend::Session) with
//! the user-facing flows: login, registration, logout, password change and
//! the auth prompt. Password recovery lives in [`PasswordRecovery`].

mod error;
mod recovery;

pub use error::AuthError;
pub use recovery::{PasswordRecovery, RecoveryStep};

use std::sync::Arc;

use apparel_core::{Email, User};
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::RwLock;
use tracing::{info, instrument, warn};

use crate::backend::{BackendClient, BackendError};
use crate::error::{clear_sentry_user, set_sentry_user};

/// Minimum password length accepted at registration.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Which form the auth prompt shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthView {
    #[default]
    Login,
    Registration,
}

/// Auth prompt (login/registration modal) state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AuthPrompt {
    pub visible: bool,
    pub view: AuthView,
}

/// Handle to the signed-in user and the auth prompt.
#[derive(Clone)]
pub struct AuthStore {
    client: BackendClient,
    prompt: Arc<RwLock<AuthPrompt>>,
}

impl AuthStore {
    #[must_use]
    pub fn new(client: BackendClient) -> Self {
        Self {
            client,
            prompt: Arc::new(RwLock::new(AuthPrompt::default())),
        }
    }

    #[must_use]
    pub const fn client(&self) -> &BackendClient {
        &self.client
    }

    /// Reload the cached user at startup.
    pub async fn restore(&self) -> Option<User> {
        let user = self.client.session().restore().await;
        if let Some(user) = &user {
            set_sentry_user(&user.username, Some(user.email.as_str()));
        }
        user
    }

    pub async fn current_user(&self) -> Option<User> {
        self.client.session().current_user().await
    }

    pub async fn is_authenticated(&self) -> bool {
        self.client.session().is_authenticated().await
    }

    /// The signed-in user, raising the login prompt if there is none.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::NotSignedIn` when nobody is logged in.
    pub async fn require_user(&self) -> Result<User, AuthError> {
        if let Some(user) = self.current_user().await {
            return Ok(user);
        }
        self.show_prompt(AuthView::Login).await;
        Err(AuthError::NotSignedIn)
    }

    // =========================================================================
    // Login / Registration / Logout
    // =========================================================================

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` for a malformed address, and the
    /// backend's message (e.g. wrong password) as `AuthError::Backend`.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &SecretString) -> Result<User, AuthError> {
        let email = Email::parse(email)?;
        if password.expose_secret().is_empty() {
            return Err(AuthError::MissingFields);
        }

        let user = self
            .client
            .login(&email, password.expose_secret())
            .await?;
        self.client.session().sign_in(user.clone()).await;
        set_sentry_user(&user.username, Some(user.email.as_str()));
        self.hide_prompt().await;
        Ok(user)
    }

    /// Create an account. On success the prompt switches to the login view;
    /// registration does not sign the user in.
    ///
    /// # Errors
    ///
    /// Returns a validation error before any network call, or the backend's
    /// message (e.g. duplicate email).
    #[instrument(skip(self, password))]
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &SecretString,
    ) -> Result<(), AuthError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(AuthError::MissingFields);
        }
        let email = Email::parse(email)?;
        validate_password(password.expose_secret())?;

        self.client
            .register(username, &email, password.expose_secret())
            .await?;
        info!(username, "registered");
        self.prompt.write().await.view = AuthView::Login;
        Ok(())
    }

    /// Sign out locally, then tell the backend.
    ///
    /// The local user and cache are cleared before the network call, so the
    /// client is signed out even if the backend cannot be reached.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Backend` if the backend call failed for a reason
    /// other than the session already being gone.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<(), AuthError> {
        self.client.session().sign_out().await;
        clear_sentry_user();

        match self.client.logout().await {
            Ok(()) | Err(BackendError::SessionExpired) => Ok(()),
            Err(e) => {
                warn!(error = %e, "backend logout failed");
                Err(e.into())
            }
        }
    }

    /// Change the signed-in user's password.
    ///
    /// # Errors
    ///
    /// Returns a validation error for blank fields or a confirmation
    /// mismatch, otherwise the backend's message (e.g. wrong old password).
    #[instrument(skip_all)]
    pub async fn change_password(
        &self,
        old_password: &SecretString,
        new_password: &SecretString,
        confirm_password: &SecretString,
    ) -> Result<(), AuthError> {
        self.require_user().await?;
        let (old, new, confirm) = (
            old_password.expose_secret(),
            new_password.expose_secret(),
            confirm_password.expose_secret(),
        );
        if old.is_empty() || new.is_empty() || confirm.is_empty() {
            return Err(AuthError::MissingFields);
        }
        if new != confirm {
            return Err(AuthError::PasswordMismatch);
        }

        self.client.change_password(old, new).await?;
        Ok(())
    }

    /// Start a forgot-password flow.
    #[must_use]
    pub fn password_recovery(&self) -> PasswordRecovery {
        PasswordRecovery::new(self.client.clone())
    }

    // =========================================================================
    // Auth prompt
    // =========================================================================

    pub async fn prompt(&self) -> AuthPrompt {
        *self.prompt.read().await
    }

    pub async fn show_prompt(&self, view: AuthView) {
        *self.prompt.write().await = AuthPrompt {
            visible: true,
            view,
        };
    }

    pub async fn hide_prompt(&self) {
        self.prompt.write().await.visible = false;
    }

    /// Switch between the login and registration forms.
    pub async fn toggle_view(&self) -> AuthView {
        let mut prompt = self.prompt.write().await;
        prompt.view = match prompt.view {
            AuthView::Login => AuthView::Registration,
            AuthView::Registration => AuthView::Login,
        };
        prompt.view
    }
}

/// Check a new password against the registration rules.
pub(crate) fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::backend::endpoints;
    use crate::testing::FakeBackend;

    fn secret(s: &str) -> SecretString {
        SecretString::from(s.to_string())
    }

    #[tokio::test]
    async fn test_login_signs_in_and_hides_prompt() {
        let fake = FakeBackend::new();
        fake.add_user("rajat", "rajat@example.in", "hunter22");
        let auth = AuthStore::new(fake.client());

        auth.show_prompt(AuthView::Login).await;
        let user = auth
            .login("rajat@example.in", &secret("hunter22"))
            .await
            .unwrap();
        assert_eq!(user.username, "rajat");
        assert!(auth.is_authenticated().await);
        assert!(!auth.prompt().await.visible);
    }

    #[tokio::test]
    async fn test_login_wrong_password_surfaces_server_message() {
        let fake = FakeBackend::new();
        fake.add_user("rajat", "rajat@example.in", "hunter22");
        let auth = AuthStore::new(fake.client());

        let err = auth
            .login("rajat@example.in", &secret("nope"))
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), "Invalid email or password");
        assert!(!auth.is_authenticated().await);
        assert_eq!(fake.count(endpoints::REFRESH_TOKEN), 0);
    }

    #[tokio::test]
    async fn test_register_validates_before_network() {
        let fake = FakeBackend::new();
        let auth = AuthStore::new(fake.client());

        let err = auth
            .register("rajat", "rajat@example.in", &secret("12345"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::WeakPassword(_)));

        let err = auth
            .register("rajat", "not-an-email", &secret("123456"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidEmail(_)));
        assert_eq!(fake.count(endpoints::REGISTER), 0);
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let fake = FakeBackend::new();
        let auth = AuthStore::new(fake.client());
        auth.show_prompt(AuthView::Registration).await;

        auth.register("meera", "meera@example.in", &secret("secret1"))
            .await
            .unwrap();
        assert_eq!(auth.prompt().await.view, AuthView::Login);

        auth.login("meera@example.in", &secret("secret1"))
            .await
            .unwrap();
        assert!(auth.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_logout_clears_local_state_even_when_backend_fails() {
        let fake = FakeBackend::new();
        fake.add_user("rajat", "rajat@example.in", "hunter22");
        let auth = AuthStore::new(fake.client());
        auth.login("rajat@example.in", &secret("hunter22"))
            .await
            .unwrap();

        fake.fail_network(endpoints::LOGOUT);
        assert!(auth.logout().await.is_err());
        assert!(!auth.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_change_password_checks_confirmation() {
        let fake = FakeBackend::new();
        fake.add_user("rajat", "rajat@example.in", "hunter22");
        let auth = AuthStore::new(fake.client());
        auth.login("rajat@example.in", &secret("hunter22"))
            .await
            .unwrap();

        let err = auth
            .change_password(&secret("hunter22"), &secret("abcdef"), &secret("abcdeg"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::PasswordMismatch));

        auth.change_password(&secret("hunter22"), &secret("abcdef"), &secret("abcdef"))
            .await
            .unwrap();
        assert_eq!(fake.count(endpoints::RESET_PASSWORD), 1);
    }

    #[tokio::test]
    async fn test_require_user_raises_prompt() {
        let fake = FakeBackend::new();
        let auth = AuthStore::new(fake.client());
        assert!(matches!(
            auth.require_user().await,
            Err(AuthError::NotSignedIn)
        ));
        assert_eq!(
            auth.prompt().await,
            AuthPrompt {
                visible: true,
                view: AuthView::Login
            }
        );
        assert_eq!(auth.toggle_view().await, AuthView::Registration);
    }

    #[tokio::test]
    async fn test_password_recovery_flow() {
        let fake = FakeBackend::new();
        fake.add_user("rajat", "rajat@example.in", "hunter22");
        let auth = AuthStore::new(fake.client());
        let mut recovery = auth.password_recovery();

        assert!(matches!(
            recovery.verify_otp(secret("000000")).await,
            Err(AuthError::RecoveryOutOfOrder)
        ));

        recovery.send_otp("rajat@example.in").await.unwrap();
        let otp = fake.last_otp().unwrap();
        recovery.verify_otp(secret(&otp)).await.unwrap();
        recovery
            .set_password(&secret("newpass1"), &secret("newpass1"))
            .await
            .unwrap();
        assert_eq!(recovery.step(), &RecoveryStep::Done);

        auth.login("rajat@example.in", &secret("newpass1"))
            .await
            .unwrap();
    }
}
