//! Per-request session assembly.
//!
//! A session is computed once per authorization query and discarded; there
//! is no caching across requests. Its expiry is a fixed TTL independent of
//! the underlying token's own `exp`.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

use clearance_core::{AppError, AppResult};
use clearance_domain::{Claims, FeatureAccess, ResolvedPermission, User, UserId, map_to_features};

use crate::claims_extractor::ClaimsExtractor;
use crate::union_permissions;

/// Repository port for user lookups.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Finds a user with eager roles and department.
    async fn find_user(&self, user_id: UserId) -> AppResult<Option<User>>;
}

/// Ephemeral per-request session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    /// The resolved user with roles and department.
    pub user: User,
    /// Effective permission set: live roles unioned with claims.
    pub permissions: BTreeSet<ResolvedPermission>,
    /// Per-feature access levels for UI gating.
    pub features: BTreeMap<String, FeatureAccess>,
    /// Fresh identifier for this session instance.
    pub session_id: Uuid,
    /// Session expiry, fixed TTL from build time.
    pub expires_at: DateTime<Utc>,
}

/// Tunables for session assembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Session lifetime.
    pub ttl: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::hours(1),
        }
    }
}

/// Application service building per-request sessions.
#[derive(Clone)]
pub struct SessionService {
    repository: Arc<dyn UserRepository>,
    config: SessionConfig,
}

impl SessionService {
    /// Creates a service with the default one-hour TTL.
    #[must_use]
    pub fn new(repository: Arc<dyn UserRepository>) -> Self {
        Self::with_config(repository, SessionConfig::default())
    }

    /// Creates a service with an explicit TTL.
    #[must_use]
    pub fn with_config(repository: Arc<dyn UserRepository>, config: SessionConfig) -> Self {
        Self { repository, config }
    }

    /// Builds a session for the user, unioning live permissions with the
    /// claims decoded from `token`.
    ///
    /// The user fetch and the claims decode run concurrently; the decode
    /// fails fast to empty claims and is never retried. An unresolvable
    /// user is fatal and surfaces as [`AppError::NotFound`].
    pub async fn build_session(
        &self,
        user_id: UserId,
        token: Option<&str>,
    ) -> AppResult<Session> {
        let (user, claims) = tokio::join!(self.load_user(user_id), async move {
            token.map(ClaimsExtractor::decode).unwrap_or_else(Claims::empty)
        });
        let user = user?;

        let permissions = union_permissions(&user.roles, &claims);
        let features = map_to_features(&permissions);

        Ok(Session {
            user,
            permissions,
            features,
            session_id: Uuid::new_v4(),
            expires_at: Utc::now() + self.config.ttl,
        })
    }

    /// Loads the user, retrying once on a transient storage failure.
    async fn load_user(&self, user_id: UserId) -> AppResult<User> {
        let found = match self.repository.find_user(user_id).await {
            Err(AppError::Storage(error)) => {
                tracing::warn!(%user_id, %error, "user fetch failed, retrying once");
                self.repository.find_user(user_id).await?
            }
            other => other?,
        };

        found.ok_or_else(|| AppError::NotFound(format!("user '{user_id}' was not found")))
    }
}
