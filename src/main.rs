use accessgate::{role_sync, settings, storage, web};
use clap::Parser;
use migration::{Migrator, MigratorTrait};
use miette::{IntoDiagnostic, Result};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(
    name = "accessgate",
    version,
    about = "Role-based access resolution service"
)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // logging
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();

    // load settings
    let settings = settings::Settings::load(&cli.config)?;
    tracing::info!(?settings, "Loaded configuration");

    // init storage (database)
    let db = storage::init(&settings.database).await?;
    Migrator::up(&db, None).await.into_diagnostic()?;

    if let Some(roles_file) = &settings.seed.roles_file {
        role_sync::sync_roles_from_file(&db, roles_file).await?;
    }

    web::serve(&settings.listen_addr(), db).await?;
    Ok(())
}
