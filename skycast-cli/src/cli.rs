use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use inquire::{Confirm, CustomType, InquireError, Select, Text};
use skycast_core::{
    Config, Coordinates, Language, WeatherFetchController, WeatherSnapshot,
    location::geolocator_for,
};
use std::{fmt, sync::Arc};

use crate::render;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "skycast", version, about = "Current weather and 5-day forecast")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Configure the weather service URL, language and home position.
    Configure,

    /// Show current weather and the 5-day forecast.
    ///
    /// Without a city or coordinates, uses the configured home position or
    /// falls back to the configured city.
    Show {
        /// City name.
        #[arg(conflicts_with_all = ["lat", "lon"])]
        city: Option<String>,

        #[arg(long, requires = "lon", allow_negative_numbers = true)]
        lat: Option<f64>,

        #[arg(long, requires = "lat", allow_negative_numbers = true)]
        lon: Option<f64>,

        /// Language for descriptions, e.g. "pt" or "ko".
        #[arg(long, value_parser = parse_language)]
        lang: Option<Language>,
    },

    /// Search cities and switch languages interactively.
    Interactive {
        #[arg(long, value_parser = parse_language)]
        lang: Option<Language>,
    },
}

fn parse_language(value: &str) -> Result<Language, String> {
    Language::try_from(value).map_err(|e| e.to_string())
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Show { city, lat, lon, lang } => {
                let config = Config::load()?;
                let controller = controller_for(&config, lang)?;

                match (city, lat.zip(lon)) {
                    (Some(city), _) => controller.fetch_by_place(city).await,
                    (None, Some((lat, lon))) => controller.fetch_by_coords(lat, lon).await,
                    (None, None) => {
                        let locator = geolocator_for(config.home);
                        controller.load_initial(locator.as_ref(), &config.fallback_city).await;
                    }
                }

                let snapshot = controller.snapshot();
                controller.teardown();
                print_snapshot(&snapshot)
            }
            Command::Interactive { lang } => interactive(lang).await,
        }
    }
}

fn controller_for(config: &Config, lang: Option<Language>) -> Result<WeatherFetchController> {
    let api = config.build_api()?;
    Ok(WeatherFetchController::new(Arc::new(api), lang.unwrap_or(config.language)))
}

fn print_snapshot(snapshot: &WeatherSnapshot) -> Result<()> {
    let has_data = snapshot.current.data.is_some() || snapshot.forecast.data.is_some();

    match snapshot.error() {
        Some(err) if !has_data => bail!("{err}"),
        Some(err) => eprintln!("warning: {err}"),
        None => {}
    }

    println!("{}", render::render(snapshot));
    Ok(())
}

#[derive(Debug, Clone, Copy)]
enum Action {
    Search,
    ChangeLanguage,
    Quit,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Action::Search => "Search a city",
            Action::ChangeLanguage => "Change language",
            Action::Quit => "Quit",
        })
    }
}

#[derive(Debug, Clone, Copy)]
struct LanguageOption(Language);

impl fmt::Display for LanguageOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.0.native_name(), self.0.as_str())
    }
}

fn select_language(prompt: &str, current: Language) -> Result<Language, InquireError> {
    let options: Vec<LanguageOption> = Language::all().iter().copied().map(LanguageOption).collect();
    let start = Language::all().iter().position(|l| *l == current).unwrap_or(0);

    Select::new(prompt, options).with_starting_cursor(start).prompt().map(|o| o.0)
}

fn is_cancel(err: &InquireError) -> bool {
    matches!(err, InquireError::OperationCanceled | InquireError::OperationInterrupted)
}

async fn interactive(lang: Option<Language>) -> Result<()> {
    let config = Config::load()?;
    let controller = controller_for(&config, lang)?;

    let locator = geolocator_for(config.home);
    controller.load_initial(locator.as_ref(), &config.fallback_city).await;
    show(&controller.snapshot());

    loop {
        let action = match Select::new(
            "What next?",
            vec![Action::Search, Action::ChangeLanguage, Action::Quit],
        )
        .prompt()
        {
            Ok(action) => action,
            Err(err) if is_cancel(&err) => break,
            Err(err) => return Err(err.into()),
        };

        match action {
            Action::Search => match Text::new("City:").prompt() {
                Ok(city) if city.trim().is_empty() => continue,
                Ok(city) => controller.fetch_by_place(city.trim()).await,
                Err(err) if is_cancel(&err) => continue,
                Err(err) => return Err(err.into()),
            },
            Action::ChangeLanguage => match select_language("Language:", controller.language()) {
                Ok(language) => controller.change_language(language).await,
                Err(err) if is_cancel(&err) => continue,
                Err(err) => return Err(err.into()),
            },
            Action::Quit => break,
        }

        show(&controller.snapshot());
    }

    controller.teardown();
    Ok(())
}

fn show(snapshot: &WeatherSnapshot) {
    if let Some(err) = snapshot.error() {
        eprintln!("error: {err}");
    }
    let text = render::render(snapshot);
    if !text.is_empty() {
        println!("\n{text}\n");
    }
}

fn configure() -> Result<()> {
    let mut config = Config::load()?;

    config.base_url = Text::new("Weather service URL:").with_default(&config.base_url).prompt()?;
    config.language = select_language("Default language:", config.language)?;

    let city = Text::new("Fallback city:").with_default(&config.fallback_city).prompt()?;
    if city.trim().is_empty() {
        bail!("Fallback city must not be empty.");
    }
    config.fallback_city = city.trim().to_string();

    let use_home = Confirm::new("Use a fixed home position for the initial lookup?")
        .with_default(config.home.is_some())
        .prompt()?;

    config.home = if use_home {
        let previous = config.home.unwrap_or(Coordinates { lat: 0.0, lon: 0.0 });
        let lat = CustomType::<f64>::new("Latitude:").with_default(previous.lat).prompt()?;
        let lon = CustomType::<f64>::new("Longitude:").with_default(previous.lon).prompt()?;

        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            bail!("Coordinates out of range: latitude must be within ±90, longitude within ±180.");
        }
        Some(Coordinates { lat, lon })
    } else {
        None
    };

    config.save()?;

    let path = Config::config_file_path().context("Configuration saved, but its path is unknown")?;
    println!("Saved configuration to {}", path.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_show_with_city_and_language() {
        let cli = Cli::try_parse_from(["skycast", "show", "Porto", "--lang", "pt"]).unwrap();
        match cli.command {
            Command::Show { city, lat, lon, lang } => {
                assert_eq!(city.as_deref(), Some("Porto"));
                assert_eq!((lat, lon), (None, None));
                assert_eq!(lang, Some(Language::Portuguese));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn parses_negative_coordinates() {
        let cli =
            Cli::try_parse_from(["skycast", "show", "--lat", "-33.87", "--lon", "151.21"]).unwrap();
        match cli.command {
            Command::Show { city, lat, lon, .. } => {
                assert_eq!(city, None);
                assert_eq!(lat, Some(-33.87));
                assert_eq!(lon, Some(151.21));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn lat_requires_lon() {
        assert!(Cli::try_parse_from(["skycast", "show", "--lat", "10"]).is_err());
    }

    #[test]
    fn city_conflicts_with_coordinates() {
        assert!(
            Cli::try_parse_from(["skycast", "show", "Paris", "--lat", "1", "--lon", "2"]).is_err()
        );
    }

    #[test]
    fn rejects_unknown_language() {
        let err = Cli::try_parse_from(["skycast", "interactive", "--lang", "xx"]).unwrap_err();
        assert!(err.to_string().contains("Unknown language"));
    }

    #[test]
    fn language_option_shows_native_name() {
        assert_eq!(LanguageOption(Language::Japanese).to_string(), "日本語 (ja)");
    }
}
