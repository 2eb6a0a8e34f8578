use argh::FromArgs;
use std::process::ExitCode;

use weather_proxy::weather::WeatherData;
use weather_proxy::WeatherApiClient;

#[derive(FromArgs)]
/// Look up current weather through a running weather proxy
struct Args {
    /// city name to search for
    #[argh(option)]
    city: Option<String>,

    /// latitude (use together with --lon)
    #[argh(option)]
    lat: Option<f64>,

    /// longitude (use together with --lat)
    #[argh(option)]
    lon: Option<f64>,

    /// units for coordinate lookups: standard, metric or imperial
    #[argh(option, default = "String::from(\"metric\")")]
    units: String,

    /// proxy origin
    #[argh(option, default = "String::from(\"http://localhost:8080\")")]
    endpoint: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let args: Args = argh::from_env();

    let client = match WeatherApiClient::new(&args.endpoint) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to create client: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let (result, units) = match (&args.city, args.lat, args.lon) {
        (Some(city), _, _) => (client.weather_by_city(city).await, "metric"),
        (None, Some(lat), Some(lon)) => (
            client.weather_by_coords(lat, lon, &args.units).await,
            args.units.as_str(),
        ),
        _ => {
            eprintln!("Pass --city <name> or both --lat and --lon");
            return ExitCode::FAILURE;
        }
    };

    match result {
        Ok(data) => {
            print!("{}", render_card(&data, units));
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn render_card(data: &WeatherData, units: &str) -> String {
    let (temp_unit, wind_unit) = match units {
        "imperial" => ("°F", "mph"),
        "standard" => ("K", "m/s"),
        _ => ("°C", "m/s"),
    };

    let mut card = format!("{}\n", data.display_name());
    match data.description() {
        Some(description) => card.push_str(&format!("  {} ({})\n", data.condition(), description)),
        None => card.push_str(&format!("  {}\n", data.condition())),
    }
    card.push_str(&format!(
        "  Temperature: {:.1}{} (feels like {:.1}{})\n",
        data.main.temp, temp_unit, data.main.feels_like, temp_unit
    ));
    card.push_str(&format!("  Humidity:    {:.0}%\n", data.main.humidity));
    card.push_str(&format!("  Wind:        {:.1} {}\n", data.wind_speed(), wind_unit));
    card
}
