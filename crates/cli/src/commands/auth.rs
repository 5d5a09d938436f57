//! Sign in, register, sign out, whoami.

use ecom_client::ClientError;
use ecom_core::{AuthUser, Email, RegisterRequest};

use super::{CliError, Context, prompt_password};

/// Optional registration fields.
#[derive(Debug, Default)]
pub struct Profile {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
}

pub async fn login(ctx: &Context, email: &str, password: Option<String>) -> Result<(), CliError> {
    let password = match password {
        Some(password) => password,
        None => prompt_password()?,
    };

    let user = ctx.auth().login(email, &password).await?;
    tracing::info!(user_id = %user.id, "signed in");
    println!("Signed in as {}", describe(&user));
    Ok(())
}

pub async fn register(
    ctx: &Context,
    email: &str,
    password: Option<String>,
    profile: Profile,
) -> Result<(), CliError> {
    let password = match password {
        Some(password) => password,
        None => prompt_password()?,
    };

    let request = RegisterRequest {
        email: Email::parse(email).map_err(ClientError::from)?,
        password,
        first_name: profile.first_name,
        last_name: profile.last_name,
        phone: profile.phone,
    };

    let user = ctx.auth().register(&request).await?;
    println!("Welcome, {}! Your account is ready.", user.display_name());
    Ok(())
}

pub async fn logout(ctx: &Context) -> Result<(), CliError> {
    ctx.auth().logout().await?;
    println!("Signed out.");
    Ok(())
}

pub async fn whoami(ctx: &Context) -> Result<(), CliError> {
    ctx.require_session()?;
    let user = ctx.auth().restore().await?.ok_or(CliError::NotSignedIn)?;
    println!("{}", describe(&user));
    Ok(())
}

fn describe(user: &AuthUser) -> String {
    let name = user.display_name();
    if name == user.email.as_str() {
        format!("{name} ({})", user.role)
    } else {
        format!("{name} <{}>", user.email)
    }
}
