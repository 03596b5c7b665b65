use serde_json::Value;

/// Reads `(lat, lng)` from a location API response body
///
/// The coordinates live at `data.controller_data.poi.{lat,lng}` and may be
/// JSON numbers or numeric strings. Returns None if the body is not JSON or
/// either coordinate is missing.
pub fn parse_coordinates(body: &str) -> Option<(f64, f64)> {
    let value: Value = serde_json::from_str(body).ok()?;
    let poi = value.pointer("/data/controller_data/poi")?;

    Some((coordinate(poi.get("lat")?)?, coordinate(poi.get("lng")?)?))
}

fn coordinate(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
