/// Parses a combined `"lat, lon"` string into two finite floats.
///
/// Returns `None` when there is no comma, either half is not a number, or
/// either number is NaN or infinite. Parts after the second are ignored.
pub fn parse_coordinates(raw: &str) -> Option<(f64, f64)> {
    let mut parts = raw.split(',');
    let lat: f64 = parts.next()?.trim().parse().ok()?;
    let lon: f64 = parts.next()?.trim().parse().ok()?;

    (lat.is_finite() && lon.is_finite()).then_some((lat, lon))
}
