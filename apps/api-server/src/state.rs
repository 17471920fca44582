//! Application state - shared across all handlers.

use std::sync::Arc;

use kadha_core::ports::{PasswordService, PostRepository, TagRepository, TokenService, UserRepository};
use kadha_core::services::{AccountService, BlogService, BlogSettings};
use kadha_infra::database::DatabaseConfig;
use kadha_infra::{Argon2PasswordService, InMemoryStore, JwtTokenService};

#[cfg(feature = "postgres")]
use kadha_infra::{
    DatabaseConnections, PostgresPostRepository, PostgresTagRepository, PostgresUserRepository,
};

use crate::config::AppConfig;

/// Store behind the repositories.
struct Stores {
    users: Arc<dyn UserRepository>,
    posts: Arc<dyn PostRepository>,
    tags: Arc<dyn TagRepository>,
    #[cfg(feature = "postgres")]
    db: Option<DatabaseConnections>,
}

impl Stores {
    fn in_memory() -> Self {
        let store = Arc::new(InMemoryStore::new());
        Self {
            users: store.clone(),
            posts: store.clone(),
            tags: store,
            #[cfg(feature = "postgres")]
            db: None,
        }
    }

    #[cfg(feature = "postgres")]
    fn postgres(db: DatabaseConnections) -> Self {
        let timeout = db.operation_timeout;
        Self {
            users: Arc::new(PostgresUserRepository::with_timeout(db.main.clone(), timeout)),
            posts: Arc::new(PostgresPostRepository::with_timeout(db.main.clone(), timeout)),
            tags: Arc::new(PostgresTagRepository::with_timeout(db.main.clone(), timeout)),
            db: Some(db),
        }
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub accounts: AccountService,
    pub blog: BlogService,
    pub tokens: Arc<dyn TokenService>,
    #[cfg(feature = "postgres")]
    pub db: Option<DatabaseConnections>,
}

impl AppState {
    /// Build the application state with appropriate implementations.
    pub async fn new(config: &AppConfig) -> Self {
        let stores = Self::open_stores(config.database.as_ref()).await;
        let passwords: Arc<dyn PasswordService> = Arc::new(Argon2PasswordService::new());
        let tokens: Arc<dyn TokenService> = Arc::new(JwtTokenService::new(config.auth.jwt.clone()));

        tracing::info!("Application state initialized");
        Self::assemble(stores, passwords, tokens, config.blog)
    }

    /// State over a fresh in-memory store.
    pub fn in_memory(
        passwords: Arc<dyn PasswordService>,
        tokens: Arc<dyn TokenService>,
        settings: BlogSettings,
    ) -> Self {
        Self::assemble(Stores::in_memory(), passwords, tokens, settings)
    }

    fn assemble(
        stores: Stores,
        passwords: Arc<dyn PasswordService>,
        tokens: Arc<dyn TokenService>,
        settings: BlogSettings,
    ) -> Self {
        Self {
            accounts: AccountService::new(stores.users, passwords, tokens.clone()),
            blog: BlogService::new(stores.posts, stores.tags, settings),
            tokens,
            #[cfg(feature = "postgres")]
            db: stores.db,
        }
    }

    #[cfg(feature = "postgres")]
    async fn open_stores(db_config: Option<&DatabaseConfig>) -> Stores {
        let Some(config) = db_config else {
            tracing::warn!("DATABASE_URL not set. Running without database (in-memory mode).");
            return Stores::in_memory();
        };

        match DatabaseConnections::init(config).await {
            Ok(connections) => Stores::postgres(connections),
            Err(e) => {
                tracing::error!(
                    "Failed to connect to database: {}. Using in-memory fallback.",
                    e
                );
                Stores::in_memory()
            }
        }
    }

    #[cfg(not(feature = "postgres"))]
    async fn open_stores(_db_config: Option<&DatabaseConfig>) -> Stores {
        tracing::info!("Running without postgres feature - using in-memory store");
        Stores::in_memory()
    }
}
