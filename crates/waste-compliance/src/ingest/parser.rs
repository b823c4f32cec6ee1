use std::borrow::Cow;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};

use super::{Batch, BatchRow, IngestError, RowError};

const DELIMITER: u8 = b';';

/// UTF-8 with an optional BOM; anything else is read as ISO-8859-1.
pub fn decode(bytes: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(bytes) {
        Ok(text) => Cow::Borrowed(text.strip_prefix('\u{feff}').unwrap_or(text)),
        Err(_) => Cow::Owned(bytes.iter().map(|byte| char::from(*byte)).collect()),
    }
}

/// Deserialize every data row of a semicolon-delimited export and convert it
/// into a draft. Row-level failures are kept in the batch; only an unreadable
/// header or a missing key column fails the whole payload.
pub(crate) fn read_batch<T, D>(
    bytes: &[u8],
    key_column: &'static str,
    mut convert: impl FnMut(T) -> Result<D, RowError>,
) -> Result<Batch<D>, IngestError>
where
    T: DeserializeOwned,
{
    let text = decode(bytes);
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(DELIMITER)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = reader.headers()?.clone();
    let Some(key_index) = headers.iter().position(|header| header == key_column) else {
        return Err(IngestError::MissingColumn(key_column));
    };

    let rows = reader
        .records()
        .enumerate()
        .map(|(index, result)| {
            let record = result.map_err(|error| RowError::Malformed(error.to_string()));
            let key = record
                .as_ref()
                .ok()
                .and_then(|record| record.get(key_index))
                .filter(|raw| is_present(raw))
                .map(str::to_string);
            let parsed = record
                .and_then(|record| {
                    let row: Result<T, csv::Error> = record.deserialize(Some(&headers));
                    row.map_err(|error| RowError::Malformed(error.to_string()))
                })
                .and_then(&mut convert);
            BatchRow {
                row: index + 1,
                key,
                parsed,
            }
        })
        .collect();

    Ok(Batch { rows })
}

pub(crate) fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| is_present(value)))
}

fn is_present(value: &str) -> bool {
    let trimmed = value.trim();
    !trimmed.is_empty() && trimmed != "nan"
}

pub(crate) fn required_key(value: Option<String>) -> Result<String, RowError> {
    value.ok_or(RowError::MissingKey)
}

/// `DD/MM/YYYY HH:MM:SS` or `DD/MM/YYYY`. Absent stays absent; anything else
/// non-empty is a row failure.
pub(crate) fn parse_timestamp(
    column: &'static str,
    value: Option<&str>,
) -> Result<Option<NaiveDateTime>, RowError> {
    let Some(raw) = value.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return Ok(None);
    };

    if let Ok(timestamp) = NaiveDateTime::parse_from_str(raw, "%d/%m/%Y %H:%M:%S") {
        return Ok(Some(timestamp));
    }

    if let Some(midnight) = NaiveDate::parse_from_str(raw, "%d/%m/%Y")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
    {
        return Ok(Some(midnight));
    }

    Err(RowError::InvalidTimestamp {
        column,
        value: raw.to_string(),
    })
}

/// Whole hours; unparseable values are treated as absent.
pub(crate) fn parse_hours(value: Option<&str>) -> Option<u32> {
    let raw = value?.trim();
    raw.parse::<u32>().ok().or_else(|| {
        raw.parse::<f64>()
            .ok()
            .filter(|hours| hours.is_finite() && *hours >= 0.0 && hours.fract() == 0.0)
            .map(|hours| hours as u32)
    })
}

/// Decimal with `,` as the decimal separator; unparseable values are absent.
pub(crate) fn parse_amount(value: Option<&str>) -> Option<Decimal> {
    let raw = value?.trim().replace(',', ".");
    raw.parse::<Decimal>().ok()
}
