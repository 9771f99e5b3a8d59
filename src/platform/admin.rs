//! Server-side platform client
//!
//! Process-wide handle used by server-rendered code paths (the public
//! profile resolver). Initialization is explicitly idempotent: the
//! first call connects, later calls get the existing handle back with
//! a debug log instead of a suppressed error. A real connection
//! failure is fatal to this component and propagates.

use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, error, info};

use super::mongo::MongoPlatform;
use super::DocumentDatabase;
use crate::config::AdminArgs;
use crate::resolver::ProfileResolver;
use crate::types::Result;

static ADMIN: OnceCell<AdminPlatform> = OnceCell::const_new();

/// Server-side database handle with credentials from [`AdminArgs`]
pub struct AdminPlatform {
    db: Arc<MongoPlatform>,
}

impl AdminPlatform {
    /// Initialize the process-wide handle, or return the existing one
    pub async fn initialize(args: &AdminArgs) -> Result<&'static AdminPlatform> {
        if let Some(existing) = ADMIN.get() {
            debug!("server-side platform client already initialized, skipping");
            return Ok(existing);
        }

        args.validate()?;

        ADMIN
            .get_or_try_init(|| async {
                info!(project = %args.project_id, "initializing server-side platform client");
                let db = MongoPlatform::connect_with_credentials(
                    &args.database_url,
                    &args.project_id,
                    &args.client_email,
                    &args.private_key(),
                )
                .await
                .map_err(|e| {
                    error!(error = %e, "server-side platform initialization failed");
                    e
                })?;

                Ok(AdminPlatform { db: Arc::new(db) })
            })
            .await
    }

    /// The database handle for direct queries and subscriptions
    pub fn database(&self) -> Arc<dyn DocumentDatabase> {
        Arc::clone(&self.db) as Arc<dyn DocumentDatabase>
    }

    /// A profile resolver over this handle
    pub fn resolver(&self) -> ProfileResolver {
        ProfileResolver::new(self.database())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[tokio::test]
    async fn test_initialize_rejects_incomplete_credentials() {
        // Validation runs before any connection attempt, so this fails
        // fast without touching the network or the process-wide cell.
        let args = AdminArgs::try_parse_from([
            "livebind-admin",
            "--project-id",
            "demo",
            "--client-email",
            "",
            "--private-key",
            "key",
        ])
        .unwrap();

        assert!(AdminPlatform::initialize(&args).await.is_err());
    }
}
