use crate::connection::DbPool;
use crate::repositories::RepositoryError;

/// Equipment rows shipped in `config/fixtures/demo_equipment.sql`.
const DEMO_EQUIPMENT: &[EquipmentSeedInfo] = &[
    EquipmentSeedInfo { code: "EQ-AUTO-001", name: "Autoclave 23L" },
    EquipmentSeedInfo { code: "EQ-MON-002", name: "Patient monitor" },
    EquipmentSeedInfo { code: "EQ-RX-003", name: "Dental X-ray unit" },
    EquipmentSeedInfo { code: "EQ-CMP-004", name: "Dental compressor" },
    EquipmentSeedInfo { code: "EQ-US-005", name: "Ultrasonic scaler" },
];

/// Demo equipment catalog so requests can be created against a fresh database.
pub struct DemoEquipmentDataset;

impl DemoEquipmentDataset {
    pub const SQL: &str = include_str!("../../../config/fixtures/demo_equipment.sql");

    pub fn equipment() -> &'static [EquipmentSeedInfo] {
        DEMO_EQUIPMENT
    }

    /// Loads the catalog. Safe to run repeatedly.
    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;
        sqlx::raw_sql(Self::SQL).execute(&mut *tx).await?;
        tx.commit().await?;

        Ok(SeedResult { equipment_seeded: DEMO_EQUIPMENT.to_vec() })
    }

    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::with_capacity(DEMO_EQUIPMENT.len());
        for seed in DEMO_EQUIPMENT {
            let present: i64 = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM equipment WHERE code = ?1 AND name = ?2 AND active = 1)",
            )
            .bind(seed.code)
            .bind(seed.name)
            .fetch_one(pool)
            .await?;
            checks.push((seed.code, present == 1));
        }

        let all_present = checks.iter().all(|(_, present)| *present);
        Ok(VerificationResult { all_present, checks })
    }

    /// Removes the demo rows. Requests that already snapshotted them are untouched.
    pub async fn clean(pool: &DbPool) -> Result<u64, RepositoryError> {
        let mut tx = pool.begin().await?;
        let mut removed = 0;
        for seed in DEMO_EQUIPMENT {
            removed += sqlx::query("DELETE FROM equipment WHERE code = ?1")
                .bind(seed.code)
                .execute(&mut *tx)
                .await?
                .rows_affected();
        }
        tx.commit().await?;
        Ok(removed)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EquipmentSeedInfo {
    pub code: &'static str,
    pub name: &'static str,
}

#[derive(Debug)]
pub struct SeedResult {
    pub equipment_seeded: Vec<EquipmentSeedInfo>,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}
