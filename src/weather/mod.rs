pub mod openweather;
pub mod types;

pub use openweather::{Coordinates, OpenWeatherClient, OpenWeatherError};
pub use types::{GeocodeResponse, WeatherData, WeatherMain};
