//! CLI smoke entry point.
//!
//! # Responsibility
//! - Open an in-memory weather cache and resolve every standard route.
//! - Keep output deterministic for quick local sanity checks.

use meteo_core::{
    ChangeNotifier, LocationEntry, ResourcePath, Store, WeatherEntry, WeatherProvider,
};
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("meteo_core version={}", meteo_core::core_version());

    let store = match Store::open_in_memory() {
        Ok(store) => store,
        Err(err) => {
            eprintln!("meteo_core store=error error={err}");
            return ExitCode::FAILURE;
        }
    };
    println!("meteo_core schema_version={}", store.version());

    let provider = WeatherProvider::new(store, ChangeNotifier::new());
    let sample_paths: [ResourcePath; 4] = [
        WeatherEntry::content_uri(),
        WeatherEntry::build_weather_location("94043"),
        WeatherEntry::build_weather_location_with_date("94043", 1_459_641_600),
        LocationEntry::content_uri(),
    ];
    for path in &sample_paths {
        match provider.get_type(path) {
            Ok(content_type) => println!("{path} type={content_type}"),
            Err(err) => {
                eprintln!("{path} error={err}");
                return ExitCode::FAILURE;
            }
        }
    }
    ExitCode::SUCCESS
}
