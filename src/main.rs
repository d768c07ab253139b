use library_fines::{
    adapters::postgres::{PostgresLoanRepository, PostgresMemberService},
    api::{handlers::AppState, router::create_router},
    application::fine::ServiceDependencies,
    config::AppConfig,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "library_fines=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Configuration is read once; the fine policy is fixed for the process lifetime
    let config = AppConfig::from_env().inspect_err(|e| tracing::error!("{}", e))?;

    tracing::info!(
        rate_per_day = %config.fine_policy.rate_per_day(),
        max_per_loan = %config.fine_policy.max_per_loan(),
        grace_period_days = config.fine_policy.grace_period_days(),
        "Fine policy loaded"
    );

    // Initialize database connection pool
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    // Initialize adapters
    let loan_repository = Arc::new(PostgresLoanRepository::new(pool.clone()));
    let member_service = Arc::new(PostgresMemberService::new(pool));

    // Create service dependencies
    let service_deps = ServiceDependencies {
        loan_repository,
        member_service,
        fine_policy: config.fine_policy,
    };

    // Create application state
    let app_state = Arc::new(AppState { service_deps });

    // Create router
    let app = create_router(app_state);

    // Server configuration
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);

    // Start server
    axum::serve(listener, app).await?;

    Ok(())
}
