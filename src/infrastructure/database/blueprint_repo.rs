//! `SQLite`-backed [`BlueprintRepository`].

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::Blueprint;
use crate::domain::ports::BlueprintRepository;

pub struct SqliteBlueprintRepository {
    pool: SqlitePool,
}

impl SqliteBlueprintRepository {
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn row_to_blueprint(row: &sqlx::sqlite::SqliteRow) -> DomainResult<Blueprint> {
    let modules: String = row.try_get("modules")?;
    Ok(Blueprint {
        id: Uuid::parse_str(&row.try_get::<String, _>("id")?)
            .map_err(|e| DomainError::SerializationError(e.to_string()))?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        modules: serde_json::from_str(&modules)?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl BlueprintRepository for SqliteBlueprintRepository {
    async fn create(&self, blueprint: &Blueprint) -> DomainResult<()> {
        let modules = serde_json::to_string(&blueprint.modules)?;
        sqlx::query(
            "INSERT INTO blueprints (id, name, description, modules, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(blueprint.id.to_string())
        .bind(&blueprint.name)
        .bind(&blueprint.description)
        .bind(modules)
        .bind(blueprint.created_at)
        .execute(&self.pool)
        .await
        .map_err(DomainError::from)?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> DomainResult<Option<Blueprint>> {
        let row = sqlx::query("SELECT * FROM blueprints WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(DomainError::from)?;
        row.as_ref().map(row_to_blueprint).transpose()
    }

    async fn list(&self) -> DomainResult<Vec<Blueprint>> {
        let rows = sqlx::query("SELECT * FROM blueprints")
            .fetch_all(&self.pool)
            .await
            .map_err(DomainError::from)?;
        rows.iter().map(row_to_blueprint).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{ModuleType, SystemModule};
    use crate::infrastructure::database::connection::connect;

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let pool = connect(std::path::Path::new(":memory:"), 1).await.unwrap();
        let repo = SqliteBlueprintRepository::new(pool);

        let mut blueprint = Blueprint::new("demo", "a demo system");
        blueprint
            .add_module(SystemModule {
                id: "core".into(),
                name: "Core".into(),
                description: "core logic".into(),
                module_type: ModuleType::Other,
                dependencies: vec![],
                interfaces: vec![],
            })
            .unwrap();
        repo.create(&blueprint).await.unwrap();

        let fetched = repo.get(blueprint.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "demo");
        assert_eq!(fetched.modules.len(), 1);
    }
}
