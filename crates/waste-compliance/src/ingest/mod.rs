//! Semicolon-delimited exports from the municipal systems, parsed into
//! per-row drafts ready for reconciliation.

mod geocoding;
mod inspections;
mod parser;
mod service_requests;
mod violations;

pub use geocoding::{parse_coordinates, GeocodeError, Geocoder, NoopGeocoder};
pub use inspections::{parse_inspections, InspectionDraft, INSPECTION_KEY_COLUMN};
pub use parser::decode;
pub use service_requests::{parse_service_requests, RequestDraft, REQUEST_KEY_COLUMN};
pub use violations::{
    link_inspections, parse_violations, ViolationDraft, VIOLATION_KEY_COLUMN,
};

/// Parsed rows in source order. Failed rows are kept so the reconciler can
/// count them.
#[derive(Debug, Clone)]
pub struct Batch<D> {
    pub rows: Vec<BatchRow<D>>,
}

#[derive(Debug, Clone)]
pub struct BatchRow<D> {
    /// 1-based data row number (the header is not counted).
    pub row: usize,
    /// Raw business key, kept even when the row failed to parse so the first
    /// occurrence of a key still claims it.
    pub key: Option<String>,
    pub parsed: Result<D, RowError>,
}

impl<D> Batch<D> {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn drafts(&self) -> impl Iterator<Item = &D> {
        self.rows.iter().filter_map(|row| row.parsed.as_ref().ok())
    }
}

impl<D> FromIterator<Result<D, RowError>> for Batch<D> {
    fn from_iter<I: IntoIterator<Item = Result<D, RowError>>>(iter: I) -> Self {
        let rows = iter
            .into_iter()
            .enumerate()
            .map(|(index, parsed)| BatchRow {
                row: index + 1,
                key: None,
                parsed,
            })
            .collect();
        Self { rows }
    }
}

/// Failure of a whole payload.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("missing required column {0}")]
    MissingColumn(&'static str),
    #[error("unreadable export: {0}")]
    Csv(#[from] csv::Error),
}

/// Failure of a single row; counted and skipped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RowError {
    #[error("missing business key")]
    MissingKey,
    #[error("unparseable {column} value {value:?}")]
    InvalidTimestamp {
        column: &'static str,
        value: String,
    },
    #[error("malformed row: {0}")]
    Malformed(String),
}
