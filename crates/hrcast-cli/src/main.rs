// HR predictor command-line entry point.
//
// Startup sequence:
// 1. Parse arguments
// 2. Initialize tracing (log to file, stdout is reserved for the report)
// 3. Load config (copying defaults on first run)
// 4. Build provider clients
// 5. Dispatch the subcommand

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{info, warn};

use hrcast_baseball::chadwick::ChadwickRegister;
use hrcast_baseball::config::{self, Config};
use hrcast_baseball::predict::Predictor;
use hrcast_baseball::report::{self, SortKey};
use hrcast_baseball::scoring::EnvironmentContext;
use hrcast_baseball::statcast::{BaseballSavant, MAX_WINDOW_DAYS};
use hrcast_baseball::weather::{Conditions, ConditionsSource, OpenWeather, WeatherProvider};

/// Predict home-run likelihood from recent Statcast batted-ball data.
#[derive(Parser, Debug)]
#[command(name = "hrcast")]
#[command(version)]
struct Cli {
    /// Directory containing config/ and defaults/
    #[arg(long, global = true, default_value = ".", env = "HRCAST_BASE_DIR")]
    base_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Score a list of players for a ballpark and conditions
    Predict(PredictArgs),
    /// Show derived batted-ball stats for a single player
    Lookup {
        /// Player name, e.g. "Matt Olson"
        name: String,
        /// Lookback window in days (defaults to the configured window)
        #[arg(long, value_parser = window_days_parser())]
        window_days: Option<u32>,
    },
    /// List configured ballparks and their HR factors
    Parks,
}

#[derive(Args, Debug)]
struct PredictArgs {
    /// Ballpark name, e.g. "coors field"
    #[arg(short, long)]
    ballpark: String,

    /// Pitcher HR boost (0 = elite, 10 = HR-prone)
    #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u8).range(0..=10))]
    pitcher_boost: u8,

    /// Wind speed in mph
    #[arg(long, default_value_t = 10.0, conflicts_with = "live_weather")]
    wind: f64,

    /// Temperature in °F
    #[arg(long, default_value_t = 75.0, conflicts_with = "live_weather")]
    temp: f64,

    /// Fetch current wind and temperature for the ballpark
    #[arg(long)]
    live_weather: bool,

    /// Opposing pitcher (applies a flat +10% placeholder)
    #[arg(long)]
    pitcher: Option<String>,

    /// Player to score; repeat for several (defaults to the configured list)
    #[arg(short, long = "player")]
    players: Vec<String>,

    /// Lookback window in days (defaults to the configured window)
    #[arg(long, value_parser = window_days_parser())]
    window_days: Option<u32>,

    /// Column to sort by
    #[arg(long, value_enum, default_value_t = SortArg::Score)]
    sort: SortArg,

    /// Also write the results to this CSV file
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Print a bar chart of HR Scores
    #[arg(long)]
    chart: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum SortArg {
    Score,
    Barrel,
    FlyBall,
    Pull,
    Ev,
    Name,
}

impl From<SortArg> for SortKey {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Score => SortKey::Score,
            SortArg::Barrel => SortKey::Barrel,
            SortArg::FlyBall => SortKey::FlyBall,
            SortArg::Pull => SortKey::Pull,
            SortArg::Ev => SortKey::ExitVelocity,
            SortArg::Name => SortKey::Name,
        }
    }
}

fn window_days_parser() -> clap::builder::RangedI64ValueParser<u32> {
    clap::value_parser!(u32).range(1..=i64::from(MAX_WINDOW_DAYS))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(&cli.base_dir)?;
    info!("hrcast starting up");

    let config = config::load_config(&cli.base_dir).context("failed to load configuration")?;
    info!(
        "Config loaded: {} ballparks, {} player overrides",
        config.ballparks.len(),
        config.players.overrides.len()
    );

    match cli.command {
        Command::Predict(args) => predict(&config, args).await,
        Command::Lookup { name, window_days } => lookup(&config, &name, window_days).await,
        Command::Parks => {
            for (name, park) in config.ballparks.ranked() {
                println!("{:<28} {:.2}", name, park.hr_factor);
            }
            Ok(())
        }
    }
}

fn build_predictor(
    config: &Config,
    http: &reqwest::Client,
) -> Predictor<ChadwickRegister, BaseballSavant> {
    Predictor::from_config(
        config,
        ChadwickRegister::new(http.clone(), config.providers.register_base_url.clone()),
        BaseballSavant::new(http.clone(), config.providers.statcast_url.clone()),
    )
}

async fn predict(config: &Config, args: PredictArgs) -> anyhow::Result<()> {
    let http = reqwest::Client::new();

    let conditions = if args.live_weather {
        let weather = WeatherProvider::new(
            OpenWeather::new(
                http.clone(),
                config.weather.endpoint.clone(),
                config.credentials.openweather_api_key.clone(),
            ),
            config.ballparks.clone(),
            config.weather.fallback_wind_mph,
            config.weather.fallback_temp_f,
        );
        let conditions = weather.current_conditions(&args.ballpark).await;
        if conditions.is_degraded() {
            warn!("live weather unavailable, using fallback conditions");
        }
        conditions
    } else {
        Conditions::manual(args.wind, args.temp)
    };

    let env = EnvironmentContext::new(
        &config.ballparks,
        &args.ballpark,
        conditions,
        f64::from(args.pitcher_boost),
        args.pitcher.clone(),
    );

    let mut predictor = build_predictor(config, &http);
    if let Some(days) = args.window_days {
        predictor = predictor.with_window_days(days);
    }

    let players = if args.players.is_empty() {
        config.prediction.players.clone()
    } else {
        args.players.clone()
    };

    let mut prediction = predictor.run(&players, env, conditions).await;
    report::sort_results(&mut prediction.results, args.sort.into());
    let rows = report::rows(&prediction.results, &config.players.odds);

    println!(
        "{} | park factor {:.2} | wind {:.1} mph, {:.1}°F ({}) | last {} days",
        prediction.environment.ballpark,
        prediction.environment.park_factor,
        conditions.wind_mph,
        conditions.temp_f,
        source_label(conditions.source),
        prediction.window_days
    );
    if let Some(pitcher) = &prediction.environment.pitcher_name {
        println!("vs {pitcher} (+10% placeholder)");
    }
    println!();
    print!("{}", report::render_table(&rows));

    if args.chart {
        println!();
        print!("{}", report::render_chart(&rows));
    }

    if let Some(path) = &args.csv {
        let file = std::fs::File::create(path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        report::write_csv(&rows, file).context("failed to write CSV")?;
        info!("Wrote {} rows to {}", rows.len(), path.display());
        println!("\nSaved {}", path.display());
    }

    Ok(())
}

async fn lookup(config: &Config, name: &str, window_days: Option<u32>) -> anyhow::Result<()> {
    let http = reqwest::Client::new();
    let mut predictor = build_predictor(config, &http);
    if let Some(days) = window_days {
        predictor = predictor.with_window_days(days);
    }

    // Player stats only: the score is computed in a neutral environment.
    let env = EnvironmentContext::new(
        &config.ballparks,
        "",
        Conditions::manual(
            config.weather.fallback_wind_mph,
            config.weather.fallback_temp_f,
        ),
        0.0,
        None,
    );
    let result = predictor.score_player(name, &env).await;

    if let Some(e) = &result.error {
        anyhow::bail!("{}: {e}", result.player);
    }
    let json = serde_json::to_string_pretty(&result).context("failed to encode result")?;
    println!("{json}");
    Ok(())
}

fn source_label(source: ConditionsSource) -> &'static str {
    match source {
        ConditionsSource::Live => "live",
        ConditionsSource::Fallback => "fallback, weather unavailable",
        ConditionsSource::Manual => "manual",
    }
}

/// Initialize tracing to log to a file (stdout carries the report).
fn init_tracing(base_dir: &std::path::Path) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = base_dir.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("hrcast.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("hrcast=info,hrcast_baseball=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
