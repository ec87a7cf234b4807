//! Canonical coordinate resolution for the location shapes the backend can
//! return: explicit `latitude`/`longitude` columns, a GeoJSON-style
//! `location` object, a WKT `POINT` string, or nothing. Every view resolves
//! coordinates through `normalize_location` so the same row always maps to
//! the same point.

use serde::Deserialize;
use serde_json::Value;

use crate::types::GeoPoint;

/// The encodings a raw `location` field can arrive in.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum LocationEncoding {
    /// GeoJSON-style object: `{ "type": "Point", "coordinates": [lng, lat] }`.
    /// Storage order is longitude first.
    Structural { coordinates: Vec<Value> },
    /// WKT text: `POINT(<lng> <lat>)`.
    Textual(String),
}

/// Resolve a row's location fields to canonical coordinates.
///
/// Explicit finite `latitude`/`longitude` win unchanged, regardless of any
/// conflicting `location` value. Otherwise the polymorphic `location` field
/// is tried, structural encoding before textual, with numeric strings
/// coerced. Anything malformed or non-finite resolves to `None`: both axes
/// or neither, never a mix. Total: never panics, never errors.
pub fn normalize_location(
    latitude: Option<&Value>,
    longitude: Option<&Value>,
    location: Option<&Value>,
) -> Option<GeoPoint> {
    if let (Some(lat), Some(lng)) = (
        latitude.and_then(finite_number),
        longitude.and_then(finite_number),
    ) {
        return Some(GeoPoint { lat, lng });
    }

    let encoding = LocationEncoding::deserialize(location?).ok()?;
    let (lng, lat) = match encoding {
        LocationEncoding::Structural { coordinates } => {
            let lng = coordinates.first().and_then(coerce_number)?;
            let lat = coordinates.get(1).and_then(coerce_number)?;
            (lng, lat)
        }
        LocationEncoding::Textual(text) => parse_wkt_point(&text)?,
    };

    Some(GeoPoint { lat, lng })
}

/// A JSON number that is finite. Strings do not qualify on the explicit
/// coordinate path.
fn finite_number(value: &Value) -> Option<f64> {
    value.as_f64().filter(|n| n.is_finite())
}

/// A JSON number or numeric string, finite. Used for extracted values only.
fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|f| f.is_finite()),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

/// Parse `POINT(<lng> <lat>)`. Returns `(lng, lat)` in storage order.
fn parse_wkt_point(text: &str) -> Option<(f64, f64)> {
    let inside = text
        .trim()
        .strip_prefix("POINT")?
        .trim_start()
        .strip_prefix('(')?
        .trim_end()
        .strip_suffix(')')?;

    let mut parts = inside.split_whitespace();
    let lng = parts.next()?.parse::<f64>().ok().filter(|n| n.is_finite())?;
    let lat = parts.next()?.parse::<f64>().ok().filter(|n| n.is_finite())?;
    Some((lng, lat))
}
