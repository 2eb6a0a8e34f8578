/// Validate latitude and longitude coordinates
pub fn validate_coordinates(lat: f64, lon: f64) -> Result<(), String> {
    if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
        return Err(format!("Invalid latitude: {}. Must be between -90 and 90", lat));
    }
    if !lon.is_finite() || !(-180.0..=180.0).contains(&lon) {
        return Err(format!("Invalid longitude: {}. Must be between -180 and 180", lon));
    }
    Ok(())
}

/// Parse query-string coordinates and range-check them.
pub fn parse_coordinates(lat: &str, lon: &str) -> Result<(f64, f64), String> {
    let lat_value: f64 = lat
        .parse()
        .map_err(|_| format!("Invalid coordinates: lat {:?} is not a number", lat))?;
    let lon_value: f64 = lon
        .parse()
        .map_err(|_| format!("Invalid coordinates: lon {:?} is not a number", lon))?;

    validate_coordinates(lat_value, lon_value)
        .map_err(|e| format!("Invalid coordinates: {}", e))?;
    Ok((lat_value, lon_value))
}

/// Trimmed value of an optional query parameter; blank counts as absent.
pub fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
