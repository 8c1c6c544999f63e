//! Infrastructure wiring: store selection and typed repositories.

use std::sync::Arc;

use seniorcare_core::{Audited, EntityId, Operations, Record, UserId, Validate};
use seniorcare_entities::User;
use seniorcare_infra::config::{AppConfig, AuthConfig};
use seniorcare_infra::{
    AuditListener, Catalog, InMemoryStore, PostgresStore, Repository, RepositoryError, Store,
    StoreError,
};

#[derive(Clone)]
pub struct AppServices {
    store: Arc<dyn Store>,
    audit: AuditListener,
    auth: AuthConfig,
}

impl AppServices {
    pub fn new(store: Arc<dyn Store>, audit: AuditListener) -> Self {
        Self {
            store,
            audit,
            auth: AuthConfig::default(),
        }
    }

    pub fn with_auth(mut self, auth: AuthConfig) -> Self {
        self.auth = auth;
        self
    }

    /// In-memory store (dev/test).
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryStore::standard()), AuditListener::default())
    }

    /// Postgres when a database URL is configured, in-memory otherwise.
    pub async fn from_config(config: &AppConfig) -> Result<Self, StoreError> {
        let database = &config.database;
        if !database.is_configured() {
            tracing::warn!("no database configured; using the in-memory store");
            return Ok(Self::in_memory().with_auth(config.auth.clone()));
        }
        let store = PostgresStore::connect(database, Arc::new(Catalog::standard())).await?;
        if database.run_migrations {
            store.migrate().await?;
        }
        tracing::info!(max_connections = database.max_connections, "connected to postgres");
        Ok(Self::new(Arc::new(store), AuditListener::default()).with_auth(config.auth.clone()))
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn max_login_attempts(&self) -> u32 {
        self.auth.max_login_attempts
    }

    pub fn repo<R>(&self) -> Repository<R>
    where
        R: Record + Validate + Operations + Audited,
    {
        Repository::new(self.store.clone(), self.audit.clone())
    }

    /// Count a failed login against `user`, disabling the account once the
    /// configured attempt limit is reached.
    pub async fn record_failed_login(&self, user: UserId) -> Result<User, RepositoryError> {
        let max_attempts = self.max_login_attempts();
        self.repo::<User>()
            .edit_in(
                None,
                EntityId::from_uuid(*user.as_uuid()),
                |u| {
                    u.record_failed_login(max_attempts);
                    Ok(())
                },
                &[],
            )
            .await
    }
}
