//! Port for persisting blueprints.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::Blueprint;

/// Persists and retrieves [`Blueprint`]s.
#[async_trait]
pub trait BlueprintRepository: Send + Sync {
    async fn create(&self, blueprint: &Blueprint) -> DomainResult<()>;
    async fn get(&self, id: Uuid) -> DomainResult<Option<Blueprint>>;
    async fn list(&self) -> DomainResult<Vec<Blueprint>>;
}
