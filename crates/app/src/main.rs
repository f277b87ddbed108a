use std::{sync::Arc, time::Duration};

use chrono::Utc;
use engine::Engine;
use migration::{Migrator, MigratorTrait};
use notifier::{LogNotifier, WebhookNotifier};

mod notifier;
mod settings;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = settings::Settings::new()?;
    let mut tasks = tokio::task::JoinSet::new();

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "welth={level},server={level},engine={level}",
            level = settings.app.level
        ))
        .init();

    let db = connect(&settings.server.database).await?;
    let mut builder = Engine::builder()
        .database(db)
        .alert_policy(settings.alerts.policy()?);
    match &settings.notifier {
        Some(settings::Notifier::Webhook { url, timeout_secs }) => {
            tracing::info!("Delivering budget alerts to {url}");
            builder = builder.notifier(Arc::new(WebhookNotifier::new(
                url.as_str(),
                Duration::from_secs(*timeout_secs),
            )?));
        }
        Some(settings::Notifier::Log) => {
            tracing::info!("Budget alerts are only logged");
            builder = builder.notifier(Arc::new(LogNotifier));
        }
        None => tracing::warn!("No notifier configured, budget alerts are disabled"),
    }
    let engine = Arc::new(builder.build().await?);

    let addr = settings.server.addr();
    let server_engine = engine.clone();
    tasks.spawn(async move {
        server::run(server_engine, &addr).await;
    });

    match settings.alerts.interval() {
        Some(period) if settings.notifier.is_some() => {
            tasks.spawn(run_alerts_every(engine, period));
        }
        Some(_) => tracing::warn!("alerts.interval_minutes is set but no notifier is configured"),
        None => {}
    }

    while tasks.join_next().await.is_some() {
        tasks.shutdown().await;
    }

    Ok(())
}

async fn connect(
    config: &settings::Database,
) -> Result<sea_orm::DatabaseConnection, Box<dyn std::error::Error + Send + Sync>> {
    let database = sea_orm::Database::connect(config.url()).await?;
    Migrator::up(&database, None).await?;
    Ok(database)
}

async fn run_alerts_every(engine: Arc<Engine>, period: Duration) {
    tracing::info!("Running budget alerts every {}s", period.as_secs());
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        if let Err(err) = engine.run_budget_alerts(Utc::now()).await {
            tracing::error!("budget alert run failed: {err}");
        }
    }
}
