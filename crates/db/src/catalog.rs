use async_trait::async_trait;
use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row};

use baja_core::domain::equipment::{EquipmentCode, EquipmentSnapshot};
use baja_core::ports::{EquipmentCatalog, PortError};

use crate::repositories::request::format_timestamp;
use crate::repositories::RepositoryError;
use crate::DbPool;

/// Equipment catalog backed by the `equipment` table. Retired rows (`active = 0`)
/// are invisible to lookups.
pub struct SqlEquipmentCatalog {
    pool: DbPool,
}

impl SqlEquipmentCatalog {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn upsert(&self, snapshot: &EquipmentSnapshot) -> Result<(), RepositoryError> {
        let now = format_timestamp(Utc::now());
        sqlx::query(
            "INSERT INTO equipment (
                code, name, brand, model, serial_number, location, active, created_at, updated_at
             ) VALUES (?, ?, ?, ?, ?, ?, 1, ?, ?)
             ON CONFLICT(code) DO UPDATE SET
                name = excluded.name,
                brand = excluded.brand,
                model = excluded.model,
                serial_number = excluded.serial_number,
                location = excluded.location,
                active = 1,
                updated_at = excluded.updated_at",
        )
        .bind(&snapshot.code.0)
        .bind(&snapshot.name)
        .bind(snapshot.brand.as_deref())
        .bind(snapshot.model.as_deref())
        .bind(snapshot.serial_number.as_deref())
        .bind(snapshot.location.as_deref())
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn deactivate(&self, code: &EquipmentCode) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE equipment SET active = 0, updated_at = ? WHERE code = ?")
            .bind(format_timestamp(Utc::now()))
            .bind(&code.0)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn find_active(
        &self,
        code: &EquipmentCode,
    ) -> Result<Option<EquipmentSnapshot>, RepositoryError> {
        let row = sqlx::query(
            "SELECT code, name, brand, model, serial_number, location
             FROM equipment
             WHERE code = ? AND active = 1",
        )
        .bind(&code.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(equipment_from_row).transpose()
    }
}

#[async_trait]
impl EquipmentCatalog for SqlEquipmentCatalog {
    async fn lookup(&self, code: &EquipmentCode) -> Result<Option<EquipmentSnapshot>, PortError> {
        Ok(self.find_active(code).await?)
    }
}

fn equipment_from_row(row: SqliteRow) -> Result<EquipmentSnapshot, RepositoryError> {
    Ok(EquipmentSnapshot {
        code: EquipmentCode(row.try_get("code")?),
        name: row.try_get("name")?,
        brand: row.try_get("brand")?,
        model: row.try_get("model")?,
        serial_number: row.try_get("serial_number")?,
        location: row.try_get("location")?,
    })
}

#[cfg(test)]
mod tests {
    use baja_core::domain::equipment::{EquipmentCode, EquipmentSnapshot};
    use baja_core::ports::EquipmentCatalog;

    use super::SqlEquipmentCatalog;
    use crate::{connect_with_settings, migrations, DbPool};

    async fn setup_pool() -> DbPool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        pool
    }

    #[tokio::test]
    async fn upserted_equipment_is_returned_as_snapshot() {
        let catalog = SqlEquipmentCatalog::new(setup_pool().await);
        let snapshot = EquipmentSnapshot::new("EQ-100", "Autoclave 23L")
            .with_brand("Tuttnauer")
            .with_model("2340M")
            .with_serial_number("SN-4411")
            .with_location("Esterilización");

        catalog.upsert(&snapshot).await.expect("upsert");

        let found = catalog.lookup(&snapshot.code).await.expect("lookup");
        assert_eq!(found, Some(snapshot));
    }

    #[tokio::test]
    async fn upsert_replaces_catalog_fields() {
        let catalog = SqlEquipmentCatalog::new(setup_pool().await);
        catalog.upsert(&EquipmentSnapshot::new("EQ-100", "Autoclave")).await.expect("first");
        catalog
            .upsert(&EquipmentSnapshot::new("EQ-100", "Autoclave 23L").with_location("Sala 2"))
            .await
            .expect("second");

        let found = catalog
            .lookup(&EquipmentCode("EQ-100".to_string()))
            .await
            .expect("lookup")
            .expect("registered");
        assert_eq!(found.name, "Autoclave 23L");
        assert_eq!(found.location.as_deref(), Some("Sala 2"));
    }

    #[tokio::test]
    async fn deactivated_equipment_is_not_found() {
        let catalog = SqlEquipmentCatalog::new(setup_pool().await);
        let code = EquipmentCode("EQ-100".to_string());
        catalog.upsert(&EquipmentSnapshot::new("EQ-100", "Autoclave")).await.expect("upsert");

        catalog.deactivate(&code).await.expect("deactivate");

        assert_eq!(catalog.lookup(&code).await.expect("lookup"), None);
        assert!(catalog.deactivate(&EquipmentCode("EQ-404".to_string())).await.is_err());
    }
}
