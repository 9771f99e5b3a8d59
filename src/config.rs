//! Configuration from environment variables
//!
//! Two surfaces, mirroring the platform's split between client and
//! server credentials. Both parse with clap so a host binary can also
//! accept them as flags. Missing configuration is a startup failure for
//! the component that needs it only: the session store degrades to an
//! inert value without client config, while the server-side resolver
//! fails outright on first use.

use clap::Parser;

use crate::types::{LivebindError, Result};

/// Client-side platform connection settings
#[derive(Parser, Debug, Clone)]
#[command(name = "livebind")]
pub struct PlatformArgs {
    /// Platform API key
    #[arg(long, env = "API_KEY")]
    pub api_key: String,

    /// Auth service domain
    #[arg(long, env = "AUTH_DOMAIN")]
    pub auth_domain: String,

    /// Database endpoint URL
    #[arg(long, env = "DATABASE_URL", default_value = "mongodb://localhost:27017")]
    pub database_url: String,

    /// Platform project identifier (also the database name)
    #[arg(long, env = "PROJECT_ID")]
    pub project_id: String,

    /// Blob storage bucket
    #[arg(long, env = "STORAGE_BUCKET")]
    pub storage_bucket: String,

    /// Messaging sender id
    #[arg(long, env = "MESSAGING_SENDER_ID")]
    pub messaging_sender_id: String,

    /// Platform application id
    #[arg(long, env = "APP_ID")]
    pub app_id: String,

    /// Analytics measurement id (optional)
    #[arg(long, env = "MEASUREMENT_ID")]
    pub measurement_id: Option<String>,
}

impl PlatformArgs {
    /// Parse from environment variables only
    pub fn from_env() -> Result<Self> {
        Self::try_parse_from(["livebind"])
            .map_err(|e| LivebindError::Config(e.to_string()))
    }
}

/// Server-side service-account credentials
#[derive(Parser, Debug, Clone)]
#[command(name = "livebind-admin")]
pub struct AdminArgs {
    /// Platform project identifier (also the database name)
    #[arg(long, env = "PROJECT_ID")]
    pub project_id: String,

    /// Service-account client email
    #[arg(long, env = "CLIENT_EMAIL")]
    pub client_email: String,

    /// Service-account private key; embedded `\n` escapes are
    /// unescaped by [`AdminArgs::private_key`]
    #[arg(long, env = "PRIVATE_KEY", allow_hyphen_values = true)]
    private_key: String,

    /// Database endpoint URL
    #[arg(long, env = "DATABASE_URL", default_value = "mongodb://localhost:27017")]
    pub database_url: String,
}

impl AdminArgs {
    /// Parse from environment variables only
    pub fn from_env() -> Result<Self> {
        Self::try_parse_from(["livebind-admin"])
            .map_err(|e| LivebindError::Config(e.to_string()))
    }

    /// The private key with embedded newline escapes unescaped
    ///
    /// Deployment tooling commonly flattens multi-line keys into a
    /// single env value with literal `\n` sequences.
    pub fn private_key(&self) -> String {
        self.private_key.replace("\\n", "\n")
    }

    /// Validate that required credentials are present and usable
    pub fn validate(&self) -> Result<()> {
        if self.project_id.is_empty() {
            return Err(LivebindError::Config("PROJECT_ID must not be empty".into()));
        }
        if self.client_email.is_empty() {
            return Err(LivebindError::Config("CLIENT_EMAIL must not be empty".into()));
        }
        if self.private_key.is_empty() {
            return Err(LivebindError::Config("PRIVATE_KEY must not be empty".into()));
        }
        Ok(())
    }
}

/// Load a `.env` file into the process environment if one is present
pub fn load_dotenv() {
    let _ = dotenvy::dotenv();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn admin_args(private_key: &str) -> AdminArgs {
        AdminArgs::try_parse_from([
            "livebind-admin",
            "--project-id",
            "demo",
            "--client-email",
            "svc@demo.test",
            "--private-key",
            private_key,
        ])
        .unwrap()
    }

    #[test]
    fn test_private_key_newlines_are_unescaped() {
        let args = admin_args("-----BEGIN KEY-----\\nabc\\n-----END KEY-----");
        assert_eq!(
            args.private_key(),
            "-----BEGIN KEY-----\nabc\n-----END KEY-----"
        );
    }

    #[test]
    fn test_validate_accepts_complete_credentials() {
        assert!(admin_args("key").validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_private_key() {
        assert!(admin_args("").validate().is_err());
    }
}
