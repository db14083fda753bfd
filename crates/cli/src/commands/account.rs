//! Account commands: login, registration and password management.

use std::io::Write;

use secrecy::SecretString;

use super::App;
use crate::error::CliError;

/// Sign in, prompting for the password.
///
/// # Errors
///
/// Returns the validation or backend error.
pub async fn login(app: &mut App, email: &str) -> Result<(), CliError> {
    let password = app.console.read_secret("Password: ").await?;
    login_with(app, email, &password).await
}

/// Sign in with a known password and load the wishlist and cart.
///
/// # Errors
///
/// Returns the validation or backend error.
pub async fn login_with(app: &mut App, email: &str, password: &SecretString) -> Result<(), CliError> {
    let user = app.storefront.auth().login(email, password).await?;
    app.storefront.shop().sync().await?;
    writeln!(app.console.out(), "Signed in as {} <{}>", user.username, user.email)?;
    Ok(())
}

/// # Errors
///
/// Returns the validation or backend error.
pub async fn register(app: &mut App, username: &str, email: &str) -> Result<(), CliError> {
    let password = app.console.read_secret("Password: ").await?;
    app.storefront
        .auth()
        .register(username, email, &password)
        .await?;
    writeln!(app.console.out(), "Account created for {username}")?;
    login_with(app, email, &password).await
}

/// # Errors
///
/// Returns an error if the backend logout call failed; the local session is
/// cleared either way.
pub async fn logout(app: &mut App) -> Result<(), CliError> {
    app.storefront.auth().logout().await?;
    writeln!(app.console.out(), "Signed out")?;
    Ok(())
}

/// # Errors
///
/// Returns an error if stdout cannot be written.
pub async fn whoami(app: &mut App) -> Result<(), CliError> {
    match app.storefront.auth().current_user().await {
        Some(user) => writeln!(
            app.console.out(),
            "{} <{}> ({:?})",
            user.username,
            user.email,
            user.role
        )?,
        None => writeln!(app.console.out(), "Not signed in")?,
    }
    Ok(())
}

/// # Errors
///
/// Returns the validation or backend error.
pub async fn change_password(app: &mut App) -> Result<(), CliError> {
    let old = app.console.read_secret("Current password: ").await?;
    let new = app.console.read_secret("New password: ").await?;
    let confirm = app.console.read_secret("Confirm new password: ").await?;
    app.storefront
        .auth()
        .change_password(&old, &new, &confirm)
        .await?;
    writeln!(app.console.out(), "Password changed")?;
    Ok(())
}

/// Walk through OTP recovery: send, verify, then set a new password.
///
/// # Errors
///
/// Returns the first step's error; later steps are not attempted.
pub async fn forgot_password(app: &mut App, email: &str) -> Result<(), CliError> {
    let mut recovery = app.storefront.auth().password_recovery();
    recovery.send_otp(email).await?;
    writeln!(app.console.out(), "An OTP was sent to {email}")?;

    let otp = app.console.read_secret("OTP: ").await?;
    recovery.verify_otp(otp).await?;

    let new = app.console.read_secret("New password: ").await?;
    let confirm = app.console.read_secret("Confirm new password: ").await?;
    recovery.set_password(&new, &confirm).await?;
    writeln!(app.console.out(), "Password reset. You can now sign in.")?;
    Ok(())
}
