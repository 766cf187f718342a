use anyhow::Context;
use crud_service::prelude::*;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("failed to load configuration")?;
    init_tracing(&config)?;

    let pool = create_pool(&config.database)
        .await
        .context("failed to connect to the database")?;
    ensure_schema(&pool, &crud_service::resources::SCHEMAS).await?;
    let hasher = PasswordHasher::new(&config.password)?;

    let state = AppState::new(config.clone(), pool)
        .with_notifier(Notifier::new().with_listener(TracingListener))
        .with_hasher(hasher);
    let app = router(state).context("invalid resource declaration")?;

    Server::new(config).serve(app).await?;

    crud_service::observability::shutdown_tracing();
    Ok(())
}
