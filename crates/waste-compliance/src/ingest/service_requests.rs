use chrono::NaiveDateTime;
use serde::Deserialize;

use super::geocoding::{resolve_position, Geocoder};
use super::parser::{
    empty_string_as_none, parse_hours, parse_timestamp, read_batch, required_key,
};
use super::{Batch, IngestError, RowError};
use crate::classification::{classify, classify_area, AreaMatch, DEFAULT_AREA};
use crate::deadline::SlaDefaults;
use crate::domain::{Coordinates, RecordId, RequestStatus, ServiceCategory, ServiceRequest};
use crate::reconcile::{overwrite, overwrite_opt, Reconcilable};

pub const REQUEST_KEY_COLUMN: &str = "Numero_Chamado";

/// Classified service request row. `None` means the source cell was empty.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDraft {
    pub business_key: String,
    pub category: Option<ServiceCategory>,
    /// Effective SLA for `category`, or for the catch-all category when the
    /// service column was empty.
    pub sla_hours: u32,
    pub status: Option<RequestStatus>,
    pub area: Option<AreaMatch>,
    pub address: Option<String>,
    pub neighborhood: Option<String>,
    pub coordinates: Option<Coordinates>,
    pub created_at: Option<NaiveDateTime>,
    pub inspected_at: Option<NaiveDateTime>,
    pub scheduled_at: Option<NaiveDateTime>,
    pub executed_at: Option<NaiveDateTime>,
}

#[derive(Debug, Deserialize)]
struct RequestRow {
    #[serde(rename = "Numero_Chamado", default, deserialize_with = "empty_string_as_none")]
    key: Option<String>,
    #[serde(rename = "Status", default, deserialize_with = "empty_string_as_none")]
    status: Option<String>,
    #[serde(rename = "Serviço", default, deserialize_with = "empty_string_as_none")]
    service: Option<String>,
    #[serde(rename = "Regional", default, deserialize_with = "empty_string_as_none")]
    regional: Option<String>,
    #[serde(rename = "Endereço", default, deserialize_with = "empty_string_as_none")]
    address: Option<String>,
    #[serde(rename = "Coordenadas", default, deserialize_with = "empty_string_as_none")]
    coordinates: Option<String>,
    #[serde(rename = "Área", default, deserialize_with = "empty_string_as_none")]
    neighborhood: Option<String>,
    #[serde(rename = "Data_Registro", default, deserialize_with = "empty_string_as_none")]
    created_at: Option<String>,
    #[serde(
        rename = "Data_Realização_Vistoria",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    inspected_at: Option<String>,
    #[serde(
        rename = "Data_Acionamento_Agendamento",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    scheduled_at: Option<String>,
    #[serde(rename = "Data_Execução", default, deserialize_with = "empty_string_as_none")]
    executed_at: Option<String>,
    #[serde(rename = "Responsividade", default, deserialize_with = "empty_string_as_none")]
    responsiveness: Option<String>,
}

impl RequestRow {
    fn into_draft(
        self,
        sla: &SlaDefaults,
        geocoder: &dyn Geocoder,
    ) -> Result<RequestDraft, RowError> {
        let business_key = required_key(self.key)?;
        let created_at = parse_timestamp("Data_Registro", self.created_at.as_deref())?;
        let inspected_at =
            parse_timestamp("Data_Realização_Vistoria", self.inspected_at.as_deref())?;
        let scheduled_at =
            parse_timestamp("Data_Acionamento_Agendamento", self.scheduled_at.as_deref())?;
        let executed_at = parse_timestamp("Data_Execução", self.executed_at.as_deref())?;

        let category = self.service.as_deref().map(classify);
        let responsiveness = parse_hours(self.responsiveness.as_deref());
        let sla_hours =
            sla.effective_sla(category.unwrap_or(ServiceCategory::Other), responsiveness);

        let status = self.status.as_deref().map(|label| {
            RequestStatus::from_source_label(label).unwrap_or(RequestStatus::AwaitingAnalysis)
        });
        let coordinates = resolve_position(
            self.coordinates.as_deref(),
            self.address.as_deref(),
            geocoder,
        );

        Ok(RequestDraft {
            business_key,
            category,
            sla_hours,
            status,
            area: self.regional.as_deref().map(classify_area),
            address: self.address,
            neighborhood: self.neighborhood,
            coordinates,
            created_at,
            inspected_at,
            scheduled_at,
            executed_at,
        })
    }
}

pub fn parse_service_requests(
    bytes: &[u8],
    sla: &SlaDefaults,
    geocoder: &dyn Geocoder,
) -> Result<Batch<RequestDraft>, IngestError> {
    read_batch(bytes, REQUEST_KEY_COLUMN, |row: RequestRow| {
        row.into_draft(sla, geocoder)
    })
}

impl Reconcilable for ServiceRequest {
    type Draft = RequestDraft;

    fn draft_key(draft: &RequestDraft) -> &str {
        &draft.business_key
    }

    fn create(id: RecordId, draft: RequestDraft, imported_at: NaiveDateTime) -> Self {
        // A blank area column is reported like an unrecognised one.
        let area = draft.area.unwrap_or(AreaMatch {
            code: DEFAULT_AREA,
            defaulted: true,
        });

        ServiceRequest {
            id,
            business_key: draft.business_key,
            category: draft.category.unwrap_or(ServiceCategory::Other),
            status: draft.status.unwrap_or(RequestStatus::AwaitingAnalysis),
            area: area.code,
            address: draft.address.unwrap_or_default(),
            neighborhood: draft.neighborhood,
            coordinates: draft.coordinates,
            created_at: draft.created_at.unwrap_or(imported_at),
            inspected_at: draft.inspected_at,
            scheduled_at: draft.scheduled_at,
            executed_at: draft.executed_at,
            sla_hours: draft.sla_hours,
            evidence: Vec::new(),
            area_mismatch: area.defaulted,
            bulk_imported: true,
        }
    }

    fn merge(&mut self, draft: RequestDraft) {
        if let Some(category) = draft.category {
            self.category = category;
            self.sla_hours = draft.sla_hours;
        }
        if let Some(area) = draft.area {
            self.area = area.code;
            self.area_mismatch = area.defaulted;
        }
        overwrite(&mut self.status, draft.status);
        overwrite(&mut self.address, draft.address);
        overwrite_opt(&mut self.neighborhood, draft.neighborhood);
        overwrite_opt(&mut self.coordinates, draft.coordinates);
        overwrite(&mut self.created_at, draft.created_at);
        overwrite_opt(&mut self.inspected_at, draft.inspected_at);
        overwrite_opt(&mut self.scheduled_at, draft.scheduled_at);
        overwrite_opt(&mut self.executed_at, draft.executed_at);
        self.bulk_imported = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AreaCode;
    use crate::ingest::NoopGeocoder;

    const HEADER: &str = "Numero_Chamado;Status;Serviço;Regional;Endereço;Coordenadas;Área;Data_Registro;Data_Realização_Vistoria;Data_Acionamento_Agendamento;Data_Execução;Responsividade";

    fn parse(rows: &[&str]) -> Batch<RequestDraft> {
        let payload = std::iter::once(HEADER)
            .chain(rows.iter().copied())
            .collect::<Vec<_>>()
            .join("\n");
        parse_service_requests(payload.as_bytes(), &SlaDefaults::default(), &NoopGeocoder)
            .expect("payload parses")
    }

    fn first_draft(batch: Batch<RequestDraft>) -> RequestDraft {
        batch
            .rows
            .into_iter()
            .next()
            .expect("one row")
            .parsed
            .expect("row parses")
    }

    #[test]
    fn classifies_and_applies_sla_rules() {
        let batch = parse(&[
            "2025-0001;Executado;Coleta programada de entulho;SANTANA/TUCURUVI;Rua A, 10;-23.48,-46.62;Santana;01/11/2025 08:00:00;;;03/11/2025 08:00:00;5",
            "2025-0002;Em Execução;Remoção de animal morto;Jaçanã/Tremembé;Rua B, 20;;;02/11/2025;;;;",
        ]);
        let drafts: Vec<_> = batch.drafts().cloned().collect();

        assert_eq!(drafts[0].category, Some(ServiceCategory::BulkPickup));
        assert_eq!(drafts[0].sla_hours, 720);
        assert_eq!(drafts[0].status, Some(RequestStatus::Executed));
        assert_eq!(drafts[0].area.map(|area| area.code), Some(AreaCode::Santana));
        assert!(drafts[0].coordinates.is_some());

        assert_eq!(drafts[1].category, Some(ServiceCategory::DeadAnimal));
        assert_eq!(drafts[1].sla_hours, 12);
        assert_eq!(drafts[1].area.map(|area| area.code), Some(AreaCode::Jacana));
        assert!(drafts[1].executed_at.is_none());
    }

    #[test]
    fn bad_rows_are_kept_as_failures() {
        let batch = parse(&[
            ";Executado;Entulho;Santana;Rua A;;;01/11/2025;;;;",
            "2025-0003;Executado;Entulho;Santana;Rua A;;;2025-11-01;;;;",
        ]);
        let failures: Vec<_> = batch
            .rows
            .iter()
            .filter_map(|row| row.parsed.as_ref().err())
            .collect();
        assert_eq!(failures.len(), 2);
        assert_eq!(failures[0], &RowError::MissingKey);
        assert!(matches!(failures[1], RowError::InvalidTimestamp { .. }));
    }

    #[test]
    fn missing_key_column_fails_the_payload() {
        let payload = "Protocolo;Status\n1;Executado";
        let error = parse_service_requests(
            payload.as_bytes(),
            &SlaDefaults::default(),
            &NoopGeocoder,
        )
        .expect_err("key column required");
        assert!(matches!(error, IngestError::MissingColumn("Numero_Chamado")));
    }

    #[test]
    fn unknown_status_and_area_are_defaulted_observably() {
        let draft = first_draft(parse(&[
            "2025-0004;Status Novo;Serviço desconhecido;Pinheiros;Rua C;;;05/11/2025 10:00:00;;;;",
        ]));
        assert_eq!(draft.status, Some(RequestStatus::AwaitingAnalysis));
        assert_eq!(draft.category, Some(ServiceCategory::Other));

        let record = ServiceRequest::create(RecordId(1), draft, NaiveDateTime::default());
        assert_eq!(record.area, DEFAULT_AREA);
        assert!(record.area_mismatch);
        assert!(record.bulk_imported);
    }

    #[test]
    fn merge_keeps_stored_values_for_empty_cells() {
        let original = first_draft(parse(&[
            "2025-0005;Em Execução;Coleta de entulho;Casa Verde;Rua D, 1;;Limão;01/11/2025 09:00:00;;;;48",
        ]));
        let mut record = ServiceRequest::create(RecordId(2), original, NaiveDateTime::default());
        assert_eq!(record.sla_hours, 48);

        let update = first_draft(parse(&[
            "2025-0005;Executado;;;;;;;;;02/11/2025 09:00:00;",
        ]));
        record.merge(update);

        assert_eq!(record.status, RequestStatus::Executed);
        assert_eq!(record.category, ServiceCategory::Debris);
        assert_eq!(record.sla_hours, 48);
        assert_eq!(record.address, "Rua D, 1");
        assert_eq!(record.neighborhood.as_deref(), Some("Limão"));
        assert_eq!(record.area, AreaCode::CasaVerde);
        assert!(!record.area_mismatch);
        assert!(record.executed_at.is_some());
    }
}
