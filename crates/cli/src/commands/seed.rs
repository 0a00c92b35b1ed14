use baja_db::{DemoEquipmentDataset, EquipmentSeedInfo};

use crate::commands::{build_runtime, load_config, open_pool, CommandResult, StepError};

pub fn run(clean: bool) -> CommandResult {
    let config = match load_config("seed") {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let runtime = match build_runtime("seed") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = open_pool(&config).await?;

        let run_result = if clean {
            DemoEquipmentDataset::clean(&pool)
                .await
                .map(SeedOutput::Cleaned)
                .map_err(|error| ("seed_clean", error.to_string(), 5u8))
        } else {
            load_and_verify(&pool).await
        };

        pool.close().await;
        run_result
    });

    match result {
        Ok(SeedOutput::Loaded(equipment)) => {
            CommandResult::success("seed", loaded_message(&equipment))
        }
        Ok(SeedOutput::Cleaned(removed)) => {
            CommandResult::success("seed", format!("removed {removed} demo equipment rows"))
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("seed", error_class, message, exit_code)
        }
    }
}

enum SeedOutput {
    Loaded(Vec<EquipmentSeedInfo>),
    Cleaned(u64),
}

async fn load_and_verify(pool: &baja_db::DbPool) -> Result<SeedOutput, StepError> {
    let seed_result = DemoEquipmentDataset::load(pool)
        .await
        .map_err(|error| ("seed_execution", error.to_string(), 5u8))?;

    let verification = DemoEquipmentDataset::verify(pool)
        .await
        .map_err(|error| ("seed_verification", error.to_string(), 6u8))?;

    if !verification.all_present {
        let failed_checks = verification
            .checks
            .iter()
            .filter_map(|(check, passed)| (!passed).then_some(*check))
            .collect::<Vec<_>>();
        return Err(("seed_verification", verification_message(&failed_checks), 6u8));
    }

    Ok(SeedOutput::Loaded(seed_result.equipment_seeded))
}

fn loaded_message(equipment: &[EquipmentSeedInfo]) -> String {
    let lines: Vec<String> =
        equipment.iter().map(|seed| format!("  - {}: {}", seed.code, seed.name)).collect();
    format!("demo equipment catalog loaded ({} items):\n{}", equipment.len(), lines.join("\n"))
}

fn verification_message(failed_checks: &[&str]) -> String {
    if failed_checks.is_empty() {
        "Some seed data failed to load".to_string()
    } else {
        format!("Seed verification failed for equipment: {}", failed_checks.join(", "))
    }
}
