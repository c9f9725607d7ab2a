use std::path::Path;
use std::time::Duration;

use colored::Colorize;
use stockchart::{
    AppResult,
    chart::{OverlayLine, overlay::format_price},
    cli::{Cli, Commands},
    config::Config,
    feed::ChartRestClient,
    init_logging,
    market_data::{Selection, fetch_series},
    session::{OutputMode, SessionManager},
    ui::cli as simple,
};

#[tokio::main]
async fn main() -> AppResult<()> {
    let cli = Cli::parse_args();

    if let Commands::Config { action } = cli.command() {
        Config::handle_command(&action, Path::new(&cli.config_file))?;
        return Ok(());
    }

    // Load configuration
    let config = Config::load_or_default(&cli.config_file);

    // Initialize logging
    let _guard = init_logging(
        &cli.effective_log_level(&config.log_level),
        &config.log.file_path,
        !cli.is_tui_mode(),
    )?;

    tracing::info!("stockchart starting...");
    tracing::debug!("CLI arguments: {:?}", cli);

    if let Err(e) = config.validate() {
        eprintln!("{} {}", "Invalid configuration:".red().bold(), e);
        return Err(e.into());
    }

    match cli.command() {
        Commands::Watch {
            symbol,
            timeframe,
            simple,
        } => {
            let symbol = symbol
                .map(|s| Config::normalize_symbol(&s))
                .or_else(|| config.symbols.first().cloned())
                .ok_or("No symbol configured")?;
            if !Config::is_valid_symbol(&symbol) {
                return Err(format!("Invalid symbol: {}", symbol).into());
            }
            let selection = Selection::new(symbol, timeframe.unwrap_or(config.default_timeframe))
                .with_tic_scope(config.tic_scope);
            let mode = if simple { OutputMode::Simple } else { OutputMode::Tui };

            let mut session_manager = SessionManager::new(config, mode, selection);
            session_manager.initialize().await?;
            let outcome = session_manager.run().await;
            session_manager.shutdown().await?;
            outcome?;
        }
        Commands::Snapshot {
            symbol,
            timeframe,
            limit,
        } => {
            let symbol = Config::normalize_symbol(&symbol);
            if !Config::is_valid_symbol(&symbol) {
                return Err(format!("Invalid symbol: {}", symbol).into());
            }
            let selection = Selection::new(symbol, timeframe).with_tic_scope(config.tic_scope);
            let client = ChartRestClient::new(
                config.backend.rest_url.clone(),
                Duration::from_secs(config.backend.timeout_seconds),
            );

            let records = fetch_series(&client, &selection).await?;
            let start = records.len().saturating_sub(limit);
            simple::display_snapshot(&selection, &records[start..], &config.chart.currency_suffix)?;

            if let Some((last, rest)) = records.split_last() {
                let line = OverlayLine::build(
                    last,
                    rest.last(),
                    selection.timeframe,
                    &config.chart.currency_suffix,
                    true,
                );
                simple::display_overlay(&selection, &line)?;
            }

            match client
                .fetch_price(&selection.symbol, &config.backend.price_tr_id)
                .await
            {
                Ok(price) => println!(
                    "   Current price: {}",
                    format_price(price, &config.chart.currency_suffix)
                        .bold()
                ),
                Err(e) => tracing::warn!("Current price unavailable: {}", e),
            }
        }
        Commands::Config { .. } => {}
    }

    Ok(())
}
