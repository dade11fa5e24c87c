use std::sync::Arc;

use crate::commands::{build_runtime, load_config, open_migrated_pool, CommandResult};
use recommender_core::{
    ApplicationError, Method, RecommendationEngine, RecommendationRequest, RecommendationResponse,
};
use recommender_db::SqlRecommendationStore;

#[derive(Debug, Clone)]
pub struct RecommendArgs {
    pub product_id: String,
    pub count: Option<usize>,
    pub method: String,
    pub category_filter: bool,
}

/// Builds one engine generation from the configured database and answers a single
/// request against it, bypassing the response cache.
pub fn run(args: RecommendArgs) -> CommandResult {
    let config = match load_config("recommend") {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let runtime = match build_runtime("recommend") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let count = args.count.unwrap_or(config.engine.default_count);
    let request = RecommendationRequest::new(args.product_id, count)
        .method(Method::parse_lenient(&args.method))
        .category_filter(args.category_filter)
        .use_cache(false);

    let result = runtime.block_on(async {
        let pool = open_migrated_pool(&config).await?;
        let store = Arc::new(SqlRecommendationStore::new(pool.clone()));
        let engine = RecommendationEngine::new(store, config.engine.clone());

        let outcome = match engine.refresh().await {
            Ok(_) => engine.recommend(&request).await.map_err(classify),
            Err(error) => Err(("engine_refresh", error.to_string(), 8u8)),
        };
        pool.close().await;
        outcome
    });

    match result {
        Ok(response) => render(&request, response),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("recommend", error_class, message, exit_code)
        }
    }
}

fn classify(error: ApplicationError) -> (&'static str, String, u8) {
    match error {
        ApplicationError::Domain(domain) => ("invalid_request", domain.to_string(), 7),
        other => ("engine", other.to_string(), 8),
    }
}

fn render(request: &RecommendationRequest, response: RecommendationResponse) -> CommandResult {
    let message = format!(
        "{} {} recommendation(s) for `{}`",
        response.total, response.method, request.product_id
    );
    match serde_json::to_value(&response) {
        Ok(data) => CommandResult::success_with_data("recommend", message, data),
        Err(error) => CommandResult::failure("recommend", "serialization", error.to_string(), 9),
    }
}
