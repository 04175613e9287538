use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use chrono::{Local, NaiveDate, NaiveTime, TimeDelta};
use clap::{Args, Parser, Subcommand};
use inquire::{Confirm, Password, PasswordDisplayMode, Select, Text};

use skydesk_core::{
    CalendarEvent, Config, Coordinates, ForecastCache, Store, Units, WeatherSource,
    calendar::{upcoming, weather_event},
    export::{ExportFormat, ExportOptions, export_file_name, prepare_export, render},
    fetch::{fetch_bundle, fetch_forecast_cache, location_details},
    forecast,
    provider::source_from_config,
    store::Favorite,
};

use crate::display;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "skydesk", version, about = "Weather dashboard: forecasts, calendar and favorite places")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Set the OpenWeather API key, units and default location.
    Configure,

    /// Show current conditions, air quality and the 5-day outlook for a place.
    Weather {
        /// "lat,lon" or a place name; the configured default when absent.
        target: Option<String>,

        /// Also write the data to a file: json, csv or txt.
        #[arg(long)]
        export: Option<String>,

        /// Directory for the exported file.
        #[arg(long, default_value = ".")]
        out: PathBuf,

        /// Include the 48-hour hourly series in the export.
        #[arg(long)]
        hourly: bool,

        /// Record today's weather here as a calendar event.
        #[arg(long)]
        log: bool,
    },

    /// Show the forecast summary for one day.
    Forecast {
        /// "lat,lon" or a place name; the configured default when absent.
        target: Option<String>,

        /// Day to look up: YYYY-MM-DD, "today" or "tomorrow".
        #[arg(long, default_value = "today")]
        date: String,
    },

    /// Manage calendar events.
    Event {
        #[command(subcommand)]
        action: EventCommand,
    },

    /// Manage favorite places.
    Favorite {
        #[command(subcommand)]
        action: FavoriteCommand,
    },

    /// Back up, restore or wipe the stored dashboard data.
    Data {
        #[command(subcommand)]
        action: DataCommand,
    },

    /// Read or change stored preferences.
    Settings {
        #[command(subcommand)]
        action: SettingsCommand,
    },
}

#[derive(Debug, Subcommand)]
pub enum EventCommand {
    /// Add an event and attach the forecast for its day.
    Add {
        #[arg(long)]
        title: String,

        /// YYYY-MM-DD, "today" or "tomorrow".
        #[arg(long)]
        date: String,

        /// HH:MM
        #[arg(long)]
        time: Option<String>,

        #[arg(long)]
        location: Option<String>,

        #[arg(long)]
        description: Option<String>,

        /// Remind 15 minutes before the start.
        #[arg(long)]
        reminder: bool,

        /// Where to take the forecast from; the configured default when absent.
        #[arg(long)]
        at: Option<String>,
    },

    /// Change an existing event. Its forecast is refreshed when the date or place changes.
    Edit {
        id: String,

        #[command(flatten)]
        changes: EventChanges,

        /// Where to take the forecast from; the configured default when absent.
        #[arg(long)]
        at: Option<String>,
    },

    /// List events, optionally only those of one day.
    List {
        #[arg(long)]
        date: Option<String>,

        /// Only the next ten events from today on, with reminder times.
        #[arg(long, conflicts_with = "date")]
        upcoming: bool,

        /// Look up forecasts for events that have none stored.
        #[arg(long)]
        refresh: bool,
    },

    /// Delete an event by id.
    Delete { id: String },
}

#[derive(Debug, Default, Args)]
pub struct EventChanges {
    #[arg(long)]
    pub title: Option<String>,

    /// YYYY-MM-DD, "today" or "tomorrow".
    #[arg(long)]
    pub date: Option<String>,

    /// HH:MM, or "none" to drop the time.
    #[arg(long)]
    pub time: Option<String>,

    #[arg(long)]
    pub location: Option<String>,

    #[arg(long)]
    pub description: Option<String>,

    /// Turn the 15-minute reminder on or off.
    #[arg(long)]
    pub reminder: Option<bool>,
}

#[derive(Debug, Subcommand)]
pub enum DataCommand {
    /// Write events, favorites and settings as JSON.
    Export {
        /// Output file; printed to stdout when absent.
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Merge a previously exported file. Sections in the file replace the stored ones.
    Import { file: PathBuf },

    /// Delete all events and favorites and reset settings.
    Clear {
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum SettingsCommand {
    Set { key: String, value: String },

    /// Show one setting, or all of them.
    Get { key: Option<String> },
}

#[derive(Debug, Subcommand)]
pub enum FavoriteCommand {
    /// Remember a place.
    Add {
        /// "lat,lon" or a place name.
        target: String,

        /// Display name; defaults to the geocoded name.
        #[arg(long)]
        name: Option<String>,
    },

    List,

    /// Forget a place by id.
    Remove { id: String },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let config = Config::load()?;

        match self.command {
            Command::Configure => configure(config),
            Command::Weather { target, export, out, hourly, log } => {
                let format = export.as_deref().map(ExportFormat::try_from).transpose()?;
                let options = WeatherOptions { format, out, hourly, log };
                show_weather(&config, target.as_deref(), options).await
            }
            Command::Forecast { target, date } => {
                let day = parse_date(&date)?;
                let source = source_from_config(&config)?;
                let (at, label) = locate(source.as_ref(), target.as_deref(), &config).await?;
                let cache = fetch_forecast_cache(source.as_ref(), at).await;
                display::print_forecast(&label, day, forecast::resolve(&cache, day).as_ref());
                Ok(())
            }
            Command::Event { action } => run_event(&config, action).await,
            Command::Favorite { action } => run_favorite(&config, action).await,
            Command::Data { action } => run_data(&config, action),
            Command::Settings { action } => run_settings(&config, action),
        }
    }
}

fn configure(mut config: Config) -> Result<()> {
    let api_key = Password::new("OpenWeather API key:")
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;
    if !api_key.trim().is_empty() {
        config.set_api_key(api_key.trim().to_string());
    }

    let units = Units::all().to_vec();
    let cursor = units.iter().position(|u| *u == config.units).unwrap_or(0);
    config.units = Select::new("Units:", units)
        .with_starting_cursor(cursor)
        .prompt()
        .context("Failed to read units")?;

    let language = Text::new("Description language:")
        .with_default(&config.language)
        .prompt()
        .context("Failed to read language")?;
    config.language = language;

    let current = format!("{},{}", config.default_location.lat, config.default_location.lon);
    let location = Text::new("Default location (lat,lon):")
        .with_default(&current)
        .prompt()
        .context("Failed to read default location")?;
    config.default_location = parse_coordinates(&location)
        .ok_or_else(|| anyhow!("Expected \"lat,lon\", got '{location}'"))?;

    config.save()?;
    println!("Configuration saved to {}", Config::config_file_path()?.display());
    Ok(())
}

struct WeatherOptions {
    format: Option<ExportFormat>,
    out: PathBuf,
    hourly: bool,
    log: bool,
}

async fn show_weather(config: &Config, target: Option<&str>, options: WeatherOptions) -> Result<()> {
    let source = source_from_config(config)?;
    let (at, _) = locate(source.as_ref(), target, config).await?;

    let (bundle, details) =
        tokio::join!(fetch_bundle(source.as_ref(), at), location_details(source.as_ref(), at));
    let bundle = bundle?;

    display::print_weather(&bundle, &details, config.units);

    let today = Local::now().date_naive();
    println!();
    display::print_forecast("Today", today, bundle.forecast_for(today).as_ref());

    if options.log {
        let mut store = Store::open(config.storage_file_path()?)?;
        let event = weather_event(&details, &bundle.current, today, &bundle.forecast_cache());
        let id = store.add_event(event)?;
        println!("\nLogged to calendar as {id}");
    }

    if let Some(format) = options.format {
        let export_options = ExportOptions { hourly: options.hourly, ..ExportOptions::default() };
        let document = prepare_export(&bundle, &details, export_options, bundle.fetched_at);
        let contents = render(&document, format)?;

        let path = options.out.join(export_file_name(&details.name, format, today));
        std::fs::write(&path, contents)
            .with_context(|| format!("Failed to write export file: {}", path.display()))?;
        println!("\nExported to {}", path.display());
    }

    Ok(())
}

async fn run_event(config: &Config, action: EventCommand) -> Result<()> {
    let mut store = Store::open(config.storage_file_path()?)?;

    match action {
        EventCommand::Add { title, date, time, location, description, reminder, at } => {
            let mut event = CalendarEvent::new(title, parse_date(&date)?);
            event.time = time.as_deref().map(parse_time).transpose()?;
            event.location = location;
            event.description = description;
            event.reminder = reminder;

            let cache = forecast_cache_for_event(config, at.as_deref()).await;
            event.attach_forecast(&cache);

            let id = store.add_event(event)?;
            if let Some(event) = store.event(&id) {
                display::print_event(event);
            }
        }
        EventCommand::Edit { id, changes, at } => {
            let mut event = store
                .event(&id)
                .cloned()
                .ok_or_else(|| anyhow!("Event not found: {id}"))?;

            let moved = apply_changes(&mut event, changes)?;
            if moved || at.is_some() {
                let cache = forecast_cache_for_event(config, at.as_deref()).await;
                event.attach_forecast(&cache);
            }

            store.update_event(&id, event)?;
            if let Some(event) = store.event(&id) {
                display::print_event(event);
            }
        }
        EventCommand::List { date, upcoming: only_upcoming, refresh } => {
            let now = Local::now().naive_local();
            let events: Vec<&CalendarEvent> = match (date, only_upcoming) {
                (Some(date), _) => store.events_on(parse_date(&date)?),
                (None, true) => upcoming(store.events(), now.date(), 10),
                (None, false) => store.events().iter().collect(),
            };

            let cache =
                if refresh { Some(forecast_cache_for_event(config, None).await) } else { None };
            display::print_events(&events, cache.as_ref(), only_upcoming.then_some(now));
        }
        EventCommand::Delete { id } => {
            let removed = store.delete_event(&id)?;
            println!("Deleted \"{}\" ({})", removed.title, removed.id);
        }
    }

    Ok(())
}

/// Apply the given changes. Returns whether the event moved to another day.
fn apply_changes(event: &mut CalendarEvent, changes: EventChanges) -> Result<bool> {
    if let Some(title) = changes.title {
        event.title = title;
    }
    if let Some(time) = changes.time {
        event.time = match time.trim().to_lowercase().as_str() {
            "none" | "" => None,
            _ => Some(parse_time(&time)?),
        };
    }
    if let Some(location) = changes.location {
        event.location = Some(location).filter(|l| !l.is_empty());
    }
    if let Some(description) = changes.description {
        event.description = Some(description).filter(|d| !d.is_empty());
    }
    if let Some(reminder) = changes.reminder {
        event.reminder = reminder;
    }

    let Some(date) = changes.date else {
        return Ok(false);
    };
    let date = parse_date(&date)?;
    let moved = date != event.date;
    event.date = date;
    Ok(moved)
}

/// Forecast data for attaching to an event. Any failure yields an empty cache,
/// which marks the forecast as unavailable.
async fn forecast_cache_for_event(config: &Config, at: Option<&str>) -> ForecastCache {
    let source = match source_from_config(config) {
        Ok(source) => source,
        Err(err) => {
            tracing::warn!("skipping forecast: {err:#}");
            return ForecastCache::default();
        }
    };

    match locate(source.as_ref(), at, config).await {
        Ok((coords, _)) => fetch_forecast_cache(source.as_ref(), coords).await,
        Err(err) => {
            tracing::warn!("skipping forecast: {err:#}");
            ForecastCache::default()
        }
    }
}

async fn run_favorite(config: &Config, action: FavoriteCommand) -> Result<()> {
    let mut store = Store::open(config.storage_file_path()?)?;

    match action {
        FavoriteCommand::Add { target, name } => {
            let (at, label) = match parse_coordinates(&target) {
                Some(coords) => {
                    let label = match name {
                        Some(name) => name,
                        None => {
                            let source = source_from_config(config)?;
                            location_details(source.as_ref(), coords).await.name
                        }
                    };
                    (coords, label)
                }
                None => {
                    let source = source_from_config(config)?;
                    let (coords, geocoded) = locate(source.as_ref(), Some(target.as_str()), config).await?;
                    (coords, name.unwrap_or(geocoded))
                }
            };

            if store.add_favorite(Favorite::new(label.clone(), at))? {
                println!("Added {label} ({at}) to favorites");
            } else {
                println!("{at} is already a favorite");
            }
        }
        FavoriteCommand::List => display::print_favorites(store.favorites()),
        FavoriteCommand::Remove { id } => {
            let removed = store.remove_favorite(&id)?;
            println!("Removed {} from favorites", removed.name);
        }
    }

    Ok(())
}

fn run_data(config: &Config, action: DataCommand) -> Result<()> {
    let mut store = Store::open(config.storage_file_path()?)?;

    match action {
        DataCommand::Export { out } => {
            let json = store.export_json()?;
            match out {
                Some(path) => {
                    std::fs::write(&path, json)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    println!("Exported dashboard data to {}", path.display());
                }
                None => println!("{json}"),
            }
        }
        DataCommand::Import { file } => {
            let json = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            store.import_json(&json)?;
            println!(
                "Imported {}: {} events, {} favorites",
                file.display(),
                store.events().len(),
                store.favorites().len()
            );
        }
        DataCommand::Clear { yes } => {
            let confirmed = yes
                || Confirm::new("Delete all events, favorites and settings?")
                    .with_default(false)
                    .prompt()
                    .context("Failed to read confirmation")?;
            if confirmed {
                store.clear()?;
                println!("All dashboard data cleared");
            }
        }
    }

    Ok(())
}

fn run_settings(config: &Config, action: SettingsCommand) -> Result<()> {
    let mut store = Store::open(config.storage_file_path()?)?;

    match action {
        SettingsCommand::Set { key, value } => {
            store.set_setting(&key, &value)?;
            println!("{key} = {value}");
        }
        SettingsCommand::Get { key: Some(key) } => match store.setting(&key) {
            Some(value) => println!("{key} = {value}"),
            None => println!("{key} is not set"),
        },
        SettingsCommand::Get { key: None } => {
            for (key, value) in store.settings() {
                println!("{key} = {value}");
            }
        }
    }

    Ok(())
}

/// Coordinates and a display label for a "lat,lon" or place-name target.
async fn locate(
    source: &dyn WeatherSource,
    target: Option<&str>,
    config: &Config,
) -> Result<(Coordinates, String)> {
    let Some(target) = target.map(str::trim).filter(|t| !t.is_empty()) else {
        let at = config.default_location;
        return Ok((at, at.to_string()));
    };

    if let Some(at) = parse_coordinates(target) {
        return Ok((at, at.to_string()));
    }

    let place = source
        .geocode(target)
        .await?
        .ok_or_else(|| anyhow!("No place found matching '{target}'"))?;
    Ok((place.coordinates, place.display_name()))
}

fn parse_coordinates(value: &str) -> Option<Coordinates> {
    let (lat, lon) = value.split_once(',')?;
    let lat: f64 = lat.trim().parse().ok()?;
    let lon: f64 = lon.trim().parse().ok()?;

    ((-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon))
        .then(|| Coordinates::new(lat, lon))
}

fn parse_date(value: &str) -> Result<NaiveDate> {
    let today = Local::now().date_naive();
    match value.trim().to_lowercase().as_str() {
        "today" => Ok(today),
        "tomorrow" => Ok(today + TimeDelta::days(1)),
        other => NaiveDate::parse_from_str(other, "%Y-%m-%d")
            .with_context(|| format!("Invalid date '{value}', expected YYYY-MM-DD")),
    }
}

fn parse_time(value: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .with_context(|| format!("Invalid time '{value}', expected HH:MM"))
}
