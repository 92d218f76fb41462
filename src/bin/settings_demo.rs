use osintreport::settings::*;

fn main() -> anyhow::Result<()> {
    // $ cargo run --bin settings_demo -- --settings=settings/release.toml
    // $ OSINT__AUTH__ACCESS_TTL=5m cargo run --bin settings_demo
    let cli = Cli::parse();
    let project_settings = parse_settings(cli.settings.as_deref())?;
    println!("Loaded settings: {:#?}", project_settings);

    match project_settings.validate() {
        Ok(()) => println!(
            "Valid: access_ttl={:?} refresh_ttl={:?}",
            project_settings.access_ttl()?,
            project_settings.refresh_ttl()?
        ),
        Err(e) => println!("Invalid: {e}"),
    }

    // Loading from an invalid path is an error, not a panic
    println!("Error on invalid path: {:?}", parse_settings(Some("")).is_err());
    Ok(())
}
