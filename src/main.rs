use chrono::Local;
use dotenvy::dotenv;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use ward_ledger::{
    config::{admin, database, reference_data},
    core::{balance, period::YearMonth, user},
    errors::Result,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();
    info!("Attempted to load .env file.");

    // 3. Which month to report, e.g. `ward-ledger 2026-01`
    let period = match std::env::args().nth(1) {
        Some(arg) => arg
            .parse::<YearMonth>()
            .inspect_err(|e| error!("Invalid month argument {arg:?}: {e}"))?,
        None => YearMonth::containing(Local::now().date_naive())?,
    };

    // 4. Load reference data
    let reference = reference_data::load_default_config()
        .inspect_err(|e| error!("Failed to load config.toml: {e}"))?;

    // 5. Connect and create the schema
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {e}"))?;
    database::create_tables(&db)
        .await
        .inspect(|_| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to initialize database: {e}"))?;

    // 6. Seed wards/products and the first administrator
    reference_data::seed_reference_data(&db, &reference)
        .await
        .inspect_err(|e| error!("Failed to seed reference data: {e}"))?;
    match admin::initial_admin_from_env() {
        Some(initial) => {
            user::bootstrap_admin(&db, initial)
                .await
                .inspect_err(|e| error!("Failed to create initial administrator: {e}"))?;
        }
        None => warn!("INITIAL_ADMIN_* not set; skipping administrator bootstrap."),
    }

    // 7. Print the month-end report
    let report = balance::build_balance_report(&db, period.year(), period.month()).await?;
    print!("{}", balance::format_balance_report(&report));

    Ok(())
}
