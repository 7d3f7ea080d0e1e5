use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "dss")]
#[command(about = "Crop disease decision support: leaf diagnosis, blight risk and spraying advice")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Diagnose a leaf photo and save it to history
    Diagnose {
        /// Image file to upload
        image: PathBuf,
    },

    /// List saved diagnoses, newest first
    History,

    /// Delete all saved diagnoses
    ClearHistory {
        /// Skip the confirmation prompt
        #[arg(long, default_value_t = false)]
        yes: bool,
    },

    /// Show current conditions at your location
    Conditions,

    /// Calculate blight risk from weather readings
    Risk(RiskArgs),

    /// Five-day forecast with spraying advice
    Forecast,
}

#[derive(Parser)]
pub struct RiskArgs {
    /// Air temperature, °C
    #[arg(long, allow_hyphen_values = true)]
    pub temperature: Option<String>,

    /// Relative humidity, %
    #[arg(long)]
    pub humidity: Option<String>,

    /// It is raining now
    #[arg(long, default_value_t = false)]
    pub raining: bool,

    /// Hours of leaf wetness
    #[arg(long)]
    pub hours: Option<String>,

    /// Fill temperature, humidity and rain from current conditions
    #[arg(long, default_value_t = false)]
    pub use_weather: bool,
}
