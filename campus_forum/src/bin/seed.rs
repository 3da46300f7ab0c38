use std::time::Duration;

use anyhow::Context;
use dotenvy::dotenv;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

use campus_forum::{auth::JwtResolver, config::Config, seeder};

const DEV_TOKEN_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "campus_forum=info".into()))
        .init();

    let config = Config::from_env().context("loading configuration")?;
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&config.database_url)
        .await
        .context("connecting to database")?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    seeder::seed_database(&pool).await?;

    // Tokens let the demo accounts talk to a local server right away.
    let resolver = JwtResolver::new(&config.jwt_secret);
    for (id, _, role, _) in seeder::DEMO_USERS {
        let token = resolver
            .issue_token(id, *role, DEV_TOKEN_TTL)
            .map_err(|e| anyhow::anyhow!("issuing token for {}: {}", id, e))?;
        println!("{}\t{}\t{}", id, role.as_str(), token);
    }
    Ok(())
}
