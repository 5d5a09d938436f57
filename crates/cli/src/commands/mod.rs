//! Command implementations and shared plumbing.

pub mod auth;
pub mod cart;
pub mod products;

use std::path::PathBuf;

use dialoguer::Password;
use ecom_client::{
    ApiClient, AuthSession, CartClient, CartSession, CatalogClient, ClientConfig, ClientError,
    ConfigError,
};
use thiserror::Error;

/// Errors surfaced to the terminal.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("Not signed in. Run `ecom login` first.")]
    NotSignedIn,

    #[error("Could not read input: {0}")]
    Prompt(#[from] dialoguer::Error),
}

/// Everything a command needs, built once per invocation.
pub struct Context {
    api: ApiClient,
}

impl Context {
    /// Build the API client from the environment.
    ///
    /// The session is persisted to `cookie_file`, else `ECOM_COOKIE_FILE`,
    /// else `<data dir>/ecom/cookies.json`.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration is missing or the cookie file is
    /// unreadable.
    pub fn from_env(cookie_file: Option<PathBuf>) -> Result<Self, CliError> {
        let mut config = ClientConfig::from_env()?;

        if let Some(path) = cookie_file
            .or_else(|| config.cookie_file.clone())
            .or_else(default_cookie_file)
        {
            config = config.with_cookie_file(path);
        }

        Ok(Self {
            api: ApiClient::from_config(config)?,
        })
    }

    pub fn auth(&self) -> AuthSession {
        AuthSession::new(self.api.clone())
    }

    pub fn cart(&self) -> CartSession {
        CartSession::new(CartClient::new(self.api.clone()))
    }

    pub fn catalog(&self) -> CatalogClient {
        CatalogClient::new(self.api.clone())
    }

    pub fn require_session(&self) -> Result<(), CliError> {
        if self.api.tokens().has_session() {
            Ok(())
        } else {
            Err(CliError::NotSignedIn)
        }
    }
}

fn default_cookie_file() -> Option<PathBuf> {
    let mut path = dirs::data_dir()?;
    path.push("ecom");
    path.push("cookies.json");
    Some(path)
}

/// Read a password from the terminal without echoing it.
pub fn prompt_password() -> Result<String, CliError> {
    Ok(Password::new().with_prompt("Password").interact()?)
}

/// Print a failure the way a user should see it.
pub fn report(error: &CliError) {
    match error {
        CliError::Client(e @ (ClientError::SessionExpired(_) | ClientError::NotAuthenticated)) => {
            tracing::debug!(error = %e, "session rejected");
            eprintln!("Your session has expired. Run `ecom login` to sign in again.");
        }
        CliError::Client(e) => {
            if e.is_server_error() || e.is_network_error() {
                tracing::error!(error = %e, correlation_id = e.correlation_id(), "request failed");
            }
            match e.correlation_id() {
                Some(id) => eprintln!("Error: {} (reference {id})", e.user_message()),
                None => eprintln!("Error: {}", e.user_message()),
            }
        }
        other => eprintln!("Error: {other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_failure_is_an_input_error() {
        let err = CliError::from(dialoguer::Error::IO(std::io::Error::new(
            std::io::ErrorKind::NotConnected,
            "not a terminal",
        )));

        let message = err.to_string();
        assert!(message.starts_with("Could not read input"));
        assert!(message.contains("not a terminal"));
    }
}
