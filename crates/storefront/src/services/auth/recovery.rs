//! Forgot-password flow: email, then one-time code, then new password.

use apparel_core::Email;
use secrecy::{ExposeSecret, SecretString};
use tracing::instrument;

use super::{AuthError, validate_password};
use crate::backend::BackendClient;

/// Where the shopper is in the recovery flow.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RecoveryStep {
    #[default]
    EnterEmail,
    EnterOtp { email: Email },
    SetPassword { email: Email },
    Done,
}

/// Drives the three recovery calls in order.
pub struct PasswordRecovery {
    client: BackendClient,
    step: RecoveryStep,
    otp: Option<SecretString>,
}

impl PasswordRecovery {
    #[must_use]
    pub fn new(client: BackendClient) -> Self {
        Self {
            client,
            step: RecoveryStep::EnterEmail,
            otp: None,
        }
    }

    #[must_use]
    pub const fn step(&self) -> &RecoveryStep {
        &self.step
    }

    /// Ask the backend to email a one-time code. Allowed again from the OTP
    /// step to resend.
    #[instrument(skip(self))]
    pub async fn send_otp(&mut self, email: &str) -> Result<(), AuthError> {
        if !matches!(
            self.step,
            RecoveryStep::EnterEmail | RecoveryStep::EnterOtp { .. }
        ) {
            return Err(AuthError::RecoveryOutOfOrder);
        }
        let email = Email::parse(email)?;
        self.client.request_password_otp(&email).await?;
        self.step = RecoveryStep::EnterOtp { email };
        Ok(())
    }

    #[instrument(skip_all)]
    pub async fn verify_otp(&mut self, otp: SecretString) -> Result<(), AuthError> {
        let RecoveryStep::EnterOtp { email } = &self.step else {
            return Err(AuthError::RecoveryOutOfOrder);
        };
        if otp.expose_secret().trim().is_empty() {
            return Err(AuthError::MissingFields);
        }
        let email = email.clone();
        self.client
            .verify_password_otp(&email, otp.expose_secret().trim())
            .await?;
        self.otp = Some(otp);
        self.step = RecoveryStep::SetPassword { email };
        Ok(())
    }

    #[instrument(skip_all)]
    pub async fn set_password(
        &mut self,
        new_password: &SecretString,
        confirm_password: &SecretString,
    ) -> Result<(), AuthError> {
        let (RecoveryStep::SetPassword { email }, Some(otp)) = (&self.step, &self.otp) else {
            return Err(AuthError::RecoveryOutOfOrder);
        };
        if new_password.expose_secret() != confirm_password.expose_secret() {
            return Err(AuthError::PasswordMismatch);
        }
        validate_password(new_password.expose_secret())?;

        self.client
            .set_forgotten_password(
                email,
                otp.expose_secret().trim(),
                new_password.expose_secret(),
            )
            .await?;
        self.otp = None;
        self.step = RecoveryStep::Done;
        Ok(())
    }
}
