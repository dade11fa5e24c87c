use crate::commands::{build_runtime, load_config, open_migrated_pool, CommandResult};
use recommender_db::{DemoSeedDataset, SeedResult, SqlRecommendationStore};

pub fn run() -> CommandResult {
    let config = match load_config("seed") {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let runtime = match build_runtime("seed") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = open_migrated_pool(&config).await?;
        let store = SqlRecommendationStore::new(pool.clone());

        let seed_result = DemoSeedDataset::load(&store)
            .await
            .map_err(|error| ("seed_execution", error.to_string(), 5u8))?;

        let verification = DemoSeedDataset::verify(&store)
            .await
            .map_err(|error| ("seed_verification", error.to_string(), 6u8))?;

        let run_result: Result<SeedResult, (&'static str, String, u8)> =
            if !verification.all_present {
                let failed_checks = verification
                    .checks
                    .iter()
                    .filter_map(|(check, passed)| (!passed).then_some(*check))
                    .collect::<Vec<_>>();
                Err(("seed_verification", verification_failure_message(&failed_checks), 6u8))
            } else {
                Ok(seed_result)
            };

        pool.close().await;
        run_result
    });

    match result {
        Ok(seeded) => CommandResult::success("seed", summary_message(&seeded)),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("seed", error_class, message, exit_code)
        }
    }
}

fn summary_message(seeded: &SeedResult) -> String {
    format!(
        "demo catalog loaded: {} products ({} active), {} orders ({} qualifying), {} new interactions",
        seeded.products_seeded,
        DemoSeedDataset::active_product_count(),
        seeded.orders_seeded,
        DemoSeedDataset::qualifying_order_count(),
        seeded.interactions_seeded,
    )
}

fn verification_failure_message(failed_checks: &[&str]) -> String {
    if failed_checks.is_empty() {
        "Some seed data failed to load".to_string()
    } else {
        format!("Seed verification failed for checks: {}", failed_checks.join(", "))
    }
}
