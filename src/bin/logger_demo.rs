use osintreport::logger::*;

fn main() -> anyhow::Result<()> {
    let logger = Logger::new_bootstrap();
    trace!("bootstrap trace log");
    debug!("bootstrap debug log");
    info!("bootstrap info log");

    // $ RUST_LOG=trace cargo run --bin logger_demo  keeps the env filter
    let config = LogConfig {
        filter: "debug".to_string(),
    };
    logger.reload_from_config(&config)?;
    trace!("application trace log");
    debug!(user_id = "demo", "application debug log");
    info!("application info log");

    Ok(())
}
