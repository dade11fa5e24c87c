use recommender_core::config::{AppConfig, LoadOptions};
use recommender_core::RecommendationStore;
use recommender_db::{connect_with_config, migrations, DbPool, SqlRecommendationStore};
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

impl DoctorCheck {
    fn pass(name: &'static str, details: impl Into<String>) -> Self {
        Self { name, status: CheckStatus::Pass, details: details.into() }
    }

    fn fail(name: &'static str, details: impl Into<String>) -> Self {
        Self { name, status: CheckStatus::Fail, details: details.into() }
    }

    fn skipped(name: &'static str, reason: &str) -> Self {
        Self { name, status: CheckStatus::Skipped, details: format!("skipped because {reason}") }
    }
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

const DATABASE_CHECKS: [&str; 3] =
    ["database_connectivity", "schema_migrations", "catalog_readiness"];

pub fn run(json_output: bool) -> String {
    let report = build_report();

    if json_output {
        return serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
    }

    render_human(&report)
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck::pass(
                "config_validation",
                "configuration loaded and validated",
            ));
            checks.extend(check_database(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck::fail("config_validation", error.to_string()));
            checks.extend(
                DATABASE_CHECKS
                    .into_iter()
                    .map(|name| DoctorCheck::skipped(name, "configuration did not load")),
            );
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_database(config: &AppConfig) -> Vec<DoctorCheck> {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            let mut checks = vec![DoctorCheck::fail(
                "database_connectivity",
                format!("failed to initialize async runtime: {error}"),
            )];
            checks.extend(
                DATABASE_CHECKS
                    .into_iter()
                    .skip(1)
                    .map(|name| DoctorCheck::skipped(name, "the database is unreachable")),
            );
            return checks;
        }
    };

    runtime.block_on(async {
        let pool = match connect_with_config(&config.database).await {
            Ok(pool) => pool,
            Err(error) => {
                let mut checks = vec![DoctorCheck::fail(
                    "database_connectivity",
                    format!("failed to connect to database: {error}"),
                )];
                checks.extend(
                    DATABASE_CHECKS
                        .into_iter()
                        .skip(1)
                        .map(|name| DoctorCheck::skipped(name, "the database is unreachable")),
                );
                return checks;
            }
        };

        let checks = vec![
            DoctorCheck::pass(
                "database_connectivity",
                format!("connected using `{}`", config.database.url),
            ),
            check_schema(&pool).await,
            check_catalog(&pool).await,
        ];
        pool.close().await;
        checks
    })
}

async fn check_schema(pool: &DbPool) -> DoctorCheck {
    match migrations::pending_count(pool).await {
        Ok(0) => DoctorCheck::pass("schema_migrations", "all migrations applied"),
        Ok(pending) => DoctorCheck::fail(
            "schema_migrations",
            format!("{pending} pending migration(s); run `recommender migrate`"),
        ),
        Err(error) => {
            DoctorCheck::fail("schema_migrations", format!("could not read migration state: {error}"))
        }
    }
}

async fn check_catalog(pool: &DbPool) -> DoctorCheck {
    let store = SqlRecommendationStore::new(pool.clone());
    match store.active_products().await {
        Ok(products) if !products.is_empty() => DoctorCheck::pass(
            "catalog_readiness",
            format!("{} active product(s) available", products.len()),
        ),
        Ok(_) => DoctorCheck::fail(
            "catalog_readiness",
            "no active products; recommendations will be empty until `recommender seed` or an import runs",
        ),
        Err(error) => {
            DoctorCheck::fail("catalog_readiness", format!("could not read products: {error}"))
        }
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::{render_human, CheckStatus, DoctorCheck, DoctorReport};

    #[test]
    fn human_rendering_marks_each_check() {
        let report = DoctorReport {
            overall_status: CheckStatus::Fail,
            summary: "doctor: one or more readiness checks failed".to_string(),
            checks: vec![
                DoctorCheck::pass("config_validation", "configuration loaded and validated"),
                DoctorCheck::fail("catalog_readiness", "no active products"),
                DoctorCheck::skipped("schema_migrations", "the database is unreachable"),
            ],
        };

        let rendered = render_human(&report);
        assert!(rendered.starts_with("doctor: one or more readiness checks failed"));
        assert!(rendered.contains("- [ok] config_validation"));
        assert!(rendered.contains("- [fail] catalog_readiness: no active products"));
        assert!(rendered
            .contains("- [skip] schema_migrations: skipped because the database is unreachable"));
    }
}
