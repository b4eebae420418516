use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use tracing::info;

use palatepilot::pipeline::split_cities;
use palatepilot::{
    CoordinateCache, PalatePilotConfig, PalatePilotError, TourPipeline, WeatherProvider, archive,
    telemetry,
};

#[derive(Debug, Parser)]
#[command(name = "palatepilot", version, about = "Weather-aware foodie tour planner")]
struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Generate a one-day foodie tour per city and save the batch
    Tour(TourArgs),
    /// Show the current weather and dining recommendation for a city
    Weather { city: String },
    /// Print tours from a saved batch file
    Show(ShowArgs),
}

#[derive(Debug, Args)]
struct TourArgs {
    /// City names; comma separated lists are accepted
    #[arg(required = true, value_name = "CITY")]
    cities: Vec<String>,
    /// Prefix of the `<label>_tours` key in the output file
    #[arg(long)]
    label: Option<String>,
    /// Output file (defaults to `<label>_tours.json`)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct ShowArgs {
    path: PathBuf,
    #[arg(long)]
    label: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            match err.downcast_ref::<PalatePilotError>() {
                Some(app_err) => eprintln!("❌ {}", app_err.user_message()),
                None => eprintln!("❌ {err:#}"),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let mut config = PalatePilotConfig::load_from_path(cli.config)?;
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    let _telemetry = telemetry::init(&config.logging)?;

    match cli.command {
        Command::Tour(args) => run_tours(config, args).await,
        Command::Weather { city } => show_weather(&config, &city).await,
        Command::Show(args) => show_saved(&config, args),
    }
}

async fn run_tours(mut config: PalatePilotConfig, args: TourArgs) -> Result<ExitCode> {
    let cities = split_cities(&args.cities);
    if cities.is_empty() {
        bail!("No city names given");
    }
    if let Some(label) = args.label {
        config.set_output_label(label)?;
    }
    let output = args.output.unwrap_or_else(|| config.output.resolved_path());

    let pipeline = TourPipeline::from_config(&config)
        .await
        .context("Failed to set up the tour pipeline")?;
    let report = pipeline.process_cities(&cities).await;

    for tour in &report.tours {
        println!("{tour}");
    }

    archive::save_tours(&output, &config.output.label, &report.tours)?;
    info!("Saved tours to {}", output.display());

    println!(
        "🎉 {} of {} tours saved to {}",
        report.tours.len(),
        cities.len(),
        output.display()
    );
    if !report.failed_cities.is_empty() {
        println!("⚠️ No tour for: {}", report.failed_cities.join(", "));
    }

    Ok(if report.tours.is_empty() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

async fn show_weather(config: &PalatePilotConfig, city: &str) -> Result<ExitCode> {
    let cache = Arc::new(CoordinateCache::from_config(&config.cache));
    let weather = WeatherProvider::new(&config.weather, cache)?;
    let reading = weather.get_weather(city).await;

    println!(
        "🌤️ {}: {}, {}, {} dining",
        city,
        reading.condition,
        reading.format_temperature(),
        reading.recommendation
    );
    Ok(ExitCode::SUCCESS)
}

fn show_saved(config: &PalatePilotConfig, args: ShowArgs) -> Result<ExitCode> {
    let label = args.label.as_deref().unwrap_or(&config.output.label);
    let tours = archive::load_tours(&args.path, label)?;

    if tours.is_empty() {
        println!("No tours in {}", args.path.display());
    }
    for tour in &tours {
        println!("{tour}");
    }
    Ok(ExitCode::SUCCESS)
}
