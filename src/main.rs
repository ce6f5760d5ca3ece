//! `snowday`: command-line front end for the closure-probability engine.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use snowday_core::{AppError, Config};
use snowday_engine::{
    AlgorithmWeights, CalculateRequest, CautionLevel, ManualSampleInput, Orchestrator, Prediction,
    SchoolType, VoteChoice, VoteStatus, VoteStore,
};
use snowday_store::{KeyValueStore, MemoryStore, SqliteStore};
use snowday_weather::retry::DEFAULT_MAX_DELAY_MS;
use snowday_weather::{
    ForecastCache, OpenMeteoClient, RetryConfig, ZippopotamGeocoder, CACHE_KEY_PREFIX,
};

/// Will school close tomorrow?
#[derive(Parser)]
#[command(name = "snowday", version, about = "Snow-day school closure probability")]
struct Cli {
    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Predict from the live forecast for a postal code
    Predict {
        postal_code: String,
        #[command(flatten)]
        profile: Profile,
    },
    /// Predict from weather entered by hand
    Manual {
        /// Expected snowfall in cm
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        snowfall: String,
        /// Temperature in degrees Celsius
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        temperature: String,
        /// Chance of precipitation in percent
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        precip: String,
        /// Wind speed in km/h
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        wind: String,
        #[command(flatten)]
        profile: Profile,
    },
    /// Cast your community vote for a location
    Vote { location: String, choice: VoteChoice },
    /// Show the community vote tally for a location
    Tally { location: String },
    /// Drop every cached forecast
    ClearCache,
}

#[derive(Args)]
struct Profile {
    /// public, private or university
    #[arg(long)]
    school: Option<SchoolType>,
    /// standard, cautious or resistant
    #[arg(long)]
    caution: Option<CautionLevel>,
    /// Override one algorithm weight, e.g. `--weight snowfall_max=60`
    #[arg(long = "weight", value_parser = parse_weight)]
    weights: Vec<(String, f64)>,
}

fn parse_weight(raw: &str) -> Result<(String, f64), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{}'", raw))?;
    let value: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("weight '{}' needs a number", name.trim()))?;
    Ok((name.trim().to_string(), value))
}

/// Persistent store when possible; a session-only store otherwise.
enum Storage {
    Sqlite(Arc<SqliteStore>),
    Memory(Arc<MemoryStore>),
}

impl Storage {
    fn open(config: &Config) -> Self {
        let path = config.storage.database_path();
        match SqliteStore::open(&path) {
            Ok(store) => Storage::Sqlite(Arc::new(store)),
            Err(e) => {
                let error = AppError::from(e);
                tracing::warn!("Storage at {} unavailable: {}", path.display(), error);
                eprintln!("{}", error.user_message());
                Storage::Memory(Arc::new(MemoryStore::new()))
            }
        }
    }

    fn shared(&self) -> Arc<dyn KeyValueStore> {
        match self {
            Storage::Sqlite(store) => Arc::clone(store) as Arc<dyn KeyValueStore>,
            Storage::Memory(store) => Arc::clone(store) as Arc<dyn KeyValueStore>,
        }
    }
}

fn build_orchestrator(config: &Config, store: Arc<dyn KeyValueStore>) -> Result<Orchestrator> {
    let forecast = &config.forecast;
    let retry = RetryConfig::new(
        forecast.max_retries,
        forecast.retry_initial_delay_ms,
        DEFAULT_MAX_DELAY_MS,
    );

    let geocoder = ZippopotamGeocoder::with_base_url(
        &forecast.geocode_url,
        &forecast.country_code,
        retry.clone(),
    )
    .context("Failed to build geocoding client")?;
    let client = OpenMeteoClient::with_base_url(&forecast.forecast_url, retry)
        .context("Failed to build forecast client")?;
    let cache = ForecastCache::with_ttl(
        store,
        Duration::from_secs(u64::from(forecast.cache_ttl_minutes) * 60),
    );

    Ok(
        Orchestrator::new(Arc::new(geocoder), Arc::new(client), cache)
            .with_timeout(Duration::from_millis(forecast.timeout_ms)),
    )
}

fn resolve_profile(
    config: &Config,
    profile: &Profile,
) -> Result<(SchoolType, CautionLevel, AlgorithmWeights)> {
    let school = match profile.school {
        Some(school) => school,
        None => config.defaults.school_type.parse()?,
    };
    let caution = match profile.caution {
        Some(caution) => caution,
        None => config.defaults.caution_level.parse()?,
    };

    let mut weights = AlgorithmWeights::default().with_overrides(&config.weights)?;
    for (name, value) in &profile.weights {
        weights = weights.with_override(name, *value)?;
    }
    Ok((school, caution, weights))
}

async fn run_prediction(
    config: &Config,
    storage: &Storage,
    request: CalculateRequest,
    json: bool,
) -> Result<()> {
    let orchestrator = build_orchestrator(config, storage.shared())?;

    match orchestrator.calculate(request).await {
        Ok(prediction) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&prediction)?);
            } else {
                print_prediction(&prediction);
                if let Some(location) = &prediction.location {
                    print_tally(&VoteStore::new(storage.shared()), location);
                }
            }
            Ok(())
        }
        Err(e) => {
            let error = AppError::from(e);
            eprintln!("{}", error.user_message());
            if orchestrator.manual_mode_suggested() {
                eprintln!(
                    "Try: snowday manual --snowfall <cm> --temperature <C> \
                     --precip <%> --wind <km/h>"
                );
            }
            Err(error.into())
        }
    }
}

fn print_prediction(prediction: &Prediction) {
    println!("{}", prediction.forecast_label);
    println!(
        "{} ({}), {}",
        prediction.school_type.description(),
        prediction.caution,
        prediction.caution.description()
    );
    println!();
    println!(
        "Chance of a snow day: {}%  [{}]",
        prediction.headline,
        prediction.outlook.label()
    );
    println!("{}", prediction.outlook.description());
    println!("Riskiest hour: +{}h", prediction.peak_hour);

    println!();
    println!("Factor breakdown (morning average, {}%):", prediction.breakdown_probability);
    for (label, value) in prediction.contributions.entries() {
        println!("  {:<18} {:>+7.1}", label, value);
    }

    println!();
    println!("Next 24 hours:");
    for (hour, probability) in prediction.hourly.iter().enumerate() {
        let bar = "#".repeat(usize::from(*probability) / 5);
        println!("  +{:>2}h {:>3}% {}", hour, probability, bar);
    }
}

fn print_tally(votes: &VoteStore, location: &str) {
    let tally = votes.get_tally(location);
    match tally.closes_pct() {
        Some(pct) => println!(
            "\nCommunity: {}% of {} votes say school closes",
            pct,
            tally.total()
        ),
        None => println!("\nCommunity: no votes yet. Cast one with `snowday vote`."),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    snowday_core::init()?;

    let cli = Cli::parse();
    let (config, _) = Config::load_validated()?;
    let storage = Storage::open(&config);

    match cli.command {
        Command::Predict {
            postal_code,
            profile,
        } => {
            let (school, caution, weights) = resolve_profile(&config, &profile)?;
            let request =
                CalculateRequest::automatic(postal_code, school, caution).with_weights(weights);
            run_prediction(&config, &storage, request, cli.json).await?;
        }
        Command::Manual {
            snowfall,
            temperature,
            precip,
            wind,
            profile,
        } => {
            let parsed = ManualSampleInput {
                snowfall_cm: &snowfall,
                temperature_c: &temperature,
                precipitation_probability_pct: &precip,
                wind_speed_kmh: &wind,
            }
            .parse();
            for field in &parsed.rejected_fields {
                eprintln!("Could not read {}, using 0", field);
            }

            let (school, caution, weights) = resolve_profile(&config, &profile)?;
            let request =
                CalculateRequest::manual(parsed.sample, school, caution).with_weights(weights);
            run_prediction(&config, &storage, request, cli.json).await?;
        }
        Command::Vote { location, choice } => {
            let votes = VoteStore::new(storage.shared());
            let outcome = votes.vote(&location, choice);
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                match outcome.status {
                    VoteStatus::Counted => println!("Thanks! Your vote was counted."),
                    VoteStatus::AlreadyVoted => println!("You already voted for this location."),
                    VoteStatus::NotPersisted => println!("Your vote could not be saved."),
                    VoteStatus::CountedWithoutFlag => {
                        println!("Your vote was counted, but we couldn't record that you voted.")
                    }
                    VoteStatus::MissingLocation => anyhow::bail!("A location is required to vote"),
                }
                print_tally(&votes, &location);
            }
        }
        Command::Tally { location } => {
            let votes = VoteStore::new(storage.shared());
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&votes.get_tally(&location))?);
            } else {
                print_tally(&votes, &location);
            }
        }
        Command::ClearCache => match &storage {
            Storage::Sqlite(store) => {
                let removed = store
                    .delete_prefix(CACHE_KEY_PREFIX)
                    .map_err(AppError::from)?;
                tracing::info!("Cleared {} cached forecasts", removed);
                println!("Cleared {} cached forecasts.", removed);
            }
            Storage::Memory(_) => println!("No persistent cache to clear."),
        },
    }

    Ok(())
}
