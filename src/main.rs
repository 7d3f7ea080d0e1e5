mod cli;

use std::io::Write;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command, RiskArgs};
use dss_core::{App, AppError, Config, LocatedQuery, RiskForm};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dss_core::init()?;
    let cli = Cli::parse();

    let (config, _) = Config::load_validated()?;
    let app = match App::new(config) {
        Ok(app) => app,
        Err(e) => return Ok(fail(&e)),
    };

    match run(&app, cli.command).await {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) => Ok(fail(&e)),
    }
}

fn fail(err: &AppError) -> ExitCode {
    tracing::error!("{}", err);
    eprintln!("{}", err.user_message());
    ExitCode::FAILURE
}

async fn run(app: &App, command: Command) -> Result<(), AppError> {
    match command {
        Command::Diagnose { image } => {
            let bytes = tokio::fs::read(&image).await?;
            let file_name = image
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "image.jpg".to_string());

            let diagnosis = app.diagnose(bytes, &file_name).await?;
            println!("Diagnosis:      {}", diagnosis.diagnosis);
            println!("Risk:           {}", diagnosis.risk);
            println!("Confidence:     {}", diagnosis.confidence_percent());
            println!("Recommendation: {}", diagnosis.recommendation);
        }
        Command::History => {
            let history = app.history().await;
            if history.is_empty() {
                println!("No saved diagnoses.");
            }
            for record in history {
                println!(
                    "{}  {:<30} {}",
                    record.display_timestamp, record.diagnosis, record.risk_level
                );
            }
        }
        Command::ClearHistory { yes } => {
            let cleared = app
                .clear_history(|| yes || confirm("Delete all saved diagnoses?"))
                .await?;
            if cleared {
                println!("History cleared.");
            }
        }
        Command::Conditions => {
            let located = app.current_conditions().await?;
            print_location(&located.query);
            let reading = located.data;
            println!("Temperature: {:.1} °C", reading.temperature);
            println!("Humidity:    {:.0} %", reading.humidity);
            println!("Raining:     {}", if reading.is_raining() { "yes" } else { "no" });
        }
        Command::Risk(args) => risk(app, args).await?,
        Command::Forecast => {
            let located = app.forecast().await?;
            print_location(&located.query);
            for entry in located.data {
                let day = &entry.day;
                println!(
                    "{}  {:>5}/{:<5} °C  rain {:>3.0}%  {}",
                    day.date,
                    temperature(day.max_temperature),
                    temperature(day.min_temperature),
                    day.rain_probability,
                    entry.advisory.message
                );
            }
        }
    }
    Ok(())
}

async fn risk(app: &App, args: RiskArgs) -> Result<(), AppError> {
    let mut form = RiskForm {
        temperature: args.temperature.unwrap_or_default(),
        humidity: args.humidity.unwrap_or_default(),
        raining: args.raining,
        hours: args.hours.unwrap_or_default(),
    };

    if args.use_weather {
        let query = app.fill_risk_form(&mut form).await?;
        print_location(&query);
        println!(
            "Using {} °C, {} % humidity, raining: {}",
            form.temperature, form.humidity, form.raining
        );
    }

    let assessment = app.calculate_risk(&form).await?;
    println!("{} ({})", assessment.message, assessment.color);
    Ok(())
}

fn temperature(value: Option<f64>) -> String {
    value.map_or_else(|| "--".to_string(), |t| format!("{t:.1}"))
}

fn print_location(query: &LocatedQuery) {
    if let Some(notice) = query.fallback_notice() {
        println!("{notice}");
    }
    println!("Location: {:.4}, {:.4}", query.latitude, query.longitude);
}

fn confirm(question: &str) -> bool {
    print!("{question} [y/N] ");
    if std::io::stdout().flush().is_err() {
        return false;
    }
    let mut answer = String::new();
    if std::io::stdin().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
