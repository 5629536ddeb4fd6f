use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use moka::future::Cache;
use serde::Serialize;
use sqlx::MySqlPool;
use tracing::{debug, info};
use utoipa::ToSchema;

use crate::model::assignment::AssignmentKey;
use crate::model::department::Department;
use crate::model::position::Position;
use crate::service::assignment::AssignmentError;

const CATALOG_KEY: &str = "catalog";

/// Departments and positions offered by the employee editor.
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct Catalog {
    pub departments: Vec<Department>,
    pub positions: Vec<Position>,
}

impl Catalog {
    /// Both halves of the key must exist.
    pub fn check(&self, key: &AssignmentKey) -> Result<(), AssignmentError> {
        if !self
            .departments
            .iter()
            .any(|d| d.department_id == key.department_id)
        {
            return Err(AssignmentError::UnknownDepartment(key.department_id.clone()));
        }
        if !self.positions.iter().any(|p| p.position_id == key.position_id) {
            return Err(AssignmentError::UnknownPosition(key.position_id.clone()));
        }
        Ok(())
    }
}

/// Read-through cache over the department/position tables. Writers to either
/// table call [`CatalogCache::invalidate`].
#[derive(Clone)]
pub struct CatalogCache {
    cache: Cache<&'static str, Arc<Catalog>>,
}

impl CatalogCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            cache: Cache::builder().max_capacity(1).time_to_live(ttl).build(),
        }
    }

    pub async fn get(&self, pool: &MySqlPool) -> Result<Arc<Catalog>, Arc<sqlx::Error>> {
        self.cache
            .try_get_with(CATALOG_KEY, async {
                debug!("Catalog cache miss");
                load_catalog(pool).await.map(Arc::new)
            })
            .await
    }

    pub async fn invalidate(&self) {
        self.cache.invalidate(&CATALOG_KEY).await;
    }

    /// Load the catalog eagerly so the first editor request does not pay for it.
    pub async fn warmup(&self, pool: &MySqlPool) -> Result<(), sqlx::Error> {
        let catalog = load_catalog(pool).await?;
        info!(
            departments = catalog.departments.len(),
            positions = catalog.positions.len(),
            "Catalog cache warmup complete"
        );
        self.cache.insert(CATALOG_KEY, Arc::new(catalog)).await;
        Ok(())
    }

    #[cfg(test)]
    pub async fn prime(&self, catalog: Catalog) {
        self.cache.insert(CATALOG_KEY, Arc::new(catalog)).await;
    }
}

async fn load_catalog(pool: &MySqlPool) -> Result<Catalog, sqlx::Error> {
    let mut catalog = Catalog::default();

    let mut departments = sqlx::query_as::<_, Department>(
        "SELECT department_id, department_name FROM departments ORDER BY department_name",
    )
    .fetch(pool);
    while let Some(row) = departments.next().await {
        catalog.departments.push(row?);
    }
    drop(departments);

    let mut positions = sqlx::query_as::<_, Position>(
        "SELECT position_id, position_name FROM positions ORDER BY position_name",
    )
    .fetch(pool);
    while let Some(row) = positions.next().await {
        catalog.positions.push(row?);
    }

    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Catalog {
        Catalog {
            departments: vec![Department {
                department_id: "D1".into(),
                department_name: "Kỹ thuật".into(),
            }],
            positions: vec![Position {
                position_id: "P1".into(),
                position_name: "Kỹ sư".into(),
            }],
        }
    }

    #[test]
    fn check_rejects_unknown_halves() {
        let c = catalog();
        assert!(c.check(&AssignmentKey::new("D1", "P1")).is_ok());
        assert_eq!(
            c.check(&AssignmentKey::new("D9", "P1")),
            Err(AssignmentError::UnknownDepartment("D9".into()))
        );
        assert_eq!(
            c.check(&AssignmentKey::new("D1", "P9")),
            Err(AssignmentError::UnknownPosition("P9".into()))
        );
    }

    #[actix_web::test]
    async fn primed_entry_is_served_until_invalidated() {
        let cache = CatalogCache::new(Duration::from_secs(60));
        cache.prime(catalog()).await;
        assert!(cache.cache.get(&CATALOG_KEY).await.is_some());

        cache.invalidate().await;
        assert!(cache.cache.get(&CATALOG_KEY).await.is_none());
    }
}
