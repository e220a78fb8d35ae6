use clap::Subcommand;
use sitrep_core::Config;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration as TOML
    Show,
    /// Print the config file path
    Path,
    /// Set the scan interval in minutes
    SetInterval { minutes: u32 },
}

pub fn run(action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigAction::Show => {
            let config = Config::load()?;
            print!("{}", toml::to_string_pretty(&config)?);
        }
        ConfigAction::Path => {
            println!("{}", Config::path()?.display());
        }
        ConfigAction::SetInterval { minutes } => {
            let mut config = Config::load()?;
            config.set_interval_min(minutes)?;
            config.save()?;
            println!("scan interval set to {minutes} minutes");
        }
    }
    Ok(())
}
