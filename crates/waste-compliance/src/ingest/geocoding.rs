use tracing::debug;

use crate::domain::Coordinates;

const LAT_RANGE: (f64, f64) = (-24.0, -23.0);
const LNG_RANGE: (f64, f64) = (-47.0, -46.0);

/// Best-effort address resolution used when a row carries no usable
/// coordinates.
pub trait Geocoder: Send + Sync {
    fn locate(&self, address: &str) -> Result<Option<Coordinates>, GeocodeError>;
}

#[derive(Debug, thiserror::Error)]
pub enum GeocodeError {
    #[error("geocoder unavailable: {0}")]
    Unavailable(String),
}

/// Geocoder that never resolves anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopGeocoder;

impl Geocoder for NoopGeocoder {
    fn locate(&self, _address: &str) -> Result<Option<Coordinates>, GeocodeError> {
        Ok(None)
    }
}

/// Parse `"lat,lng"`, accepting only points inside the service region.
pub fn parse_coordinates(value: &str) -> Option<Coordinates> {
    let (lat, lng) = value.trim().split_once(',')?;
    let lat = lat.trim().parse::<f64>().ok()?;
    let lng = lng.trim().parse::<f64>().ok()?;

    let inside = (LAT_RANGE.0..=LAT_RANGE.1).contains(&lat)
        && (LNG_RANGE.0..=LNG_RANGE.1).contains(&lng);
    inside.then_some(Coordinates { lat, lng })
}

/// Source coordinates when valid, otherwise the geocoder's answer. Geocoder
/// failures leave the position unset.
pub(crate) fn resolve_position(
    raw: Option<&str>,
    address: Option<&str>,
    geocoder: &dyn Geocoder,
) -> Option<Coordinates> {
    if let Some(position) = raw.and_then(parse_coordinates) {
        return Some(position);
    }

    let address = address.filter(|address| !address.trim().is_empty())?;
    match geocoder.locate(address) {
        Ok(position) => position,
        Err(error) => {
            debug!(%address, %error, "geocoding skipped");
            None
        }
    }
}
