use chrono::NaiveDateTime;
use clap::{Parser, Subcommand};
use log::{debug, error, info, warn};
use monnit_fetch::{
    config::Config,
    models::{error::AppError, network::find_network_id, window::parse_timestamp},
    services::{
        api::{MonnitClient, SensorApi},
        export,
        fetcher::WindowFetcher,
    },
    settings::Settings,
};
use std::fs::OpenOptions;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// settings file
    #[arg(short, long, default_value = Config::SETTINGS_FILE)]
    settings: PathBuf,

    /// log debug output regardless of the settings file
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the networks of the account
    Networks,

    /// List the sensors of a network
    Sensors {
        /// network name, defaults to the network of the settings file
        #[arg(long)]
        network: Option<String>,
    },

    /// Fetch sensor readings and export them as JSON
    Fetch {
        /// sensor id, may be repeated; defaults to `sensor_list`
        #[arg(long = "sensor")]
        sensors: Vec<String>,

        /// fetch every sensor of this network
        #[arg(long, conflicts_with = "sensors")]
        network: Option<String>,

        /// window start, `YYYY-MM-DD HH:MM:SS`
        #[arg(long, value_parser = parse_timestamp)]
        start: Option<NaiveDateTime>,

        /// window end, `YYYY-MM-DD HH:MM:SS`
        #[arg(long, value_parser = parse_timestamp)]
        end: Option<NaiveDateTime>,
    },
}

fn init_logging(settings: &Settings, verbose: bool) -> Result<(), AppError> {
    let level = if verbose || settings.verbose {
        "debug"
    } else {
        "info"
    };
    let mut builder = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(format!("warn,monnit_fetch={level}")),
    );

    if let Some(path) = &settings.log_file {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        builder
            .target(env_logger::Target::Pipe(Box::new(file)))
            .write_style(env_logger::WriteStyle::Never);
    }

    builder.init();
    Ok(())
}

/// Network id from the command line name, or from the settings file.
async fn resolve_network(
    client: &MonnitClient,
    settings: &Settings,
    name: Option<&str>,
) -> Result<String, AppError> {
    let name = match (name, &settings.network_id) {
        (Some(name), _) => name,
        (None, Some(id)) => return Ok(id.clone()),
        (None, None) => settings.network_name.as_deref().ok_or_else(|| {
            AppError::ConfigError("No network given and none configured".to_string())
        })?,
    };

    let networks = client.list_networks().await?;
    let id = find_network_id(&networks, name)?;
    info!("Network '{name}' has id {id}");
    Ok(id)
}

async fn sensors_of(client: &MonnitClient, network_id: &str) -> Result<Vec<String>, AppError> {
    let sensors = client.list_sensors(network_id).await?;
    Ok(sensors.into_iter().map(|s| s.id).collect())
}

async fn run(command: Command, settings: &Settings) -> Result<(), AppError> {
    let client = MonnitClient::with_config(settings.api_config())?;
    debug!("Using Monnit API at {}", client.config().base_url());

    match command {
        Command::Networks => {
            for network in client.list_networks().await? {
                println!("{network}");
            }
        }
        Command::Sensors { network } => {
            let network_id = resolve_network(&client, settings, network.as_deref()).await?;
            for sensor in client.list_sensors(&network_id).await? {
                println!("{sensor}");
            }
        }
        Command::Fetch {
            sensors,
            network,
            start,
            end,
        } => {
            let settings = settings.with_window(
                start.unwrap_or(settings.start),
                end.unwrap_or(settings.end),
            )?;

            let sensor_ids = if !sensors.is_empty() {
                sensors
            } else if network.is_some() || settings.sensor_list.is_empty() {
                let network_id = resolve_network(&client, &settings, network.as_deref()).await?;
                sensors_of(&client, &network_id).await?
            } else {
                settings.sensor_list.clone()
            };
            if sensor_ids.is_empty() {
                return Err(AppError::ConfigError("No sensors to fetch".to_string()));
            }

            let window = settings.window()?;
            info!("Fetching {} sensors over {window}", sensor_ids.len());

            // A countdown bar would garble the log file or a redirected stderr
            let show_progress = settings.log_file.is_none() && std::io::stderr().is_terminal();
            let fetcher = WindowFetcher::new(&client).with_progress(show_progress);
            let results = fetcher
                .fetch_for_sensors(
                    &sensor_ids,
                    window.start(),
                    window.end(),
                    settings.interval_minutes,
                )
                .await?;

            for result in &results {
                export::write_readings(
                    &settings.output_dir,
                    &result.sensor_id,
                    &window,
                    &result.readings,
                    settings.timezone,
                )?;
            }

            let empty = results.iter().filter(|r| r.is_empty()).count();
            if empty > 0 {
                warn!("{empty} sensors returned no readings over {window}");
            }

            let total: usize = results.iter().map(|r| r.len()).sum();
            info!("Fetched {total} readings from {} sensors", results.len());
        }
    }

    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();

    let settings = match Settings::load(&args.settings) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_logging(&settings, args.verbose) {
        eprintln!("Error: cannot open log file: {e}");
        return ExitCode::FAILURE;
    }
    info!("Settings loaded from {}", args.settings.display());

    match run(args.command, &settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            if settings.log_file.is_some() {
                eprintln!("Error: {e}");
            }
            ExitCode::FAILURE
        }
    }
}
