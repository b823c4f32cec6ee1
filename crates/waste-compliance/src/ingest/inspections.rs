use chrono::NaiveDateTime;
use serde::Deserialize;

use super::geocoding::{resolve_position, Geocoder};
use super::parser::{
    empty_string_as_none, parse_hours, parse_timestamp, read_batch, required_key,
};
use super::{Batch, IngestError, RowError};
use crate::domain::{Coordinates, InspectionRecord, InspectionStatus, RecordId};
use crate::reconcile::{overwrite, overwrite_opt, Reconcilable};

pub const INSPECTION_KEY_COLUMN: &str = "N_BFS";

const DEFAULT_DEADLINE_HOURS: u32 = 24;

#[derive(Debug, Clone, PartialEq)]
pub struct InspectionDraft {
    pub business_key: String,
    pub notice_number: Option<String>,
    pub area_name: Option<String>,
    pub zone: Option<String>,
    pub sector: Option<String>,
    pub shift: Option<String>,
    pub service: Option<String>,
    pub situation: Option<String>,
    pub synced_at: Option<NaiveDateTime>,
    pub inspected_at: Option<NaiveDateTime>,
    pub executed_at: Option<NaiveDateTime>,
    pub deadline_hours: Option<u32>,
    pub address: Option<String>,
    pub coordinates: Option<Coordinates>,
    pub contractor_inspector: Option<String>,
    pub inspector: Option<String>,
}

impl InspectionDraft {
    fn status(&self) -> Option<InspectionStatus> {
        self.situation.as_deref().map(InspectionStatus::from_situation)
    }
}

#[derive(Debug, Deserialize)]
struct InspectionRow {
    #[serde(rename = "N_BFS", default, deserialize_with = "empty_string_as_none")]
    key: Option<String>,
    #[serde(rename = "N_CNC", default, deserialize_with = "empty_string_as_none")]
    notice_number: Option<String>,
    #[serde(rename = "Regional", default, deserialize_with = "empty_string_as_none")]
    regional: Option<String>,
    #[serde(rename = "Area", default, deserialize_with = "empty_string_as_none")]
    zone: Option<String>,
    #[serde(rename = "Setor", default, deserialize_with = "empty_string_as_none")]
    sector: Option<String>,
    #[serde(rename = "Turno", default, deserialize_with = "empty_string_as_none")]
    shift: Option<String>,
    #[serde(rename = "Servico", default, deserialize_with = "empty_string_as_none")]
    service: Option<String>,
    #[serde(rename = "Situacao_CNC", default, deserialize_with = "empty_string_as_none")]
    situation: Option<String>,
    #[serde(
        rename = "Data_Sincronizacao",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    synced_at: Option<String>,
    #[serde(
        rename = "Data_Fiscalizacao",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    inspected_at: Option<String>,
    #[serde(rename = "Data_Execução", default, deserialize_with = "empty_string_as_none")]
    executed_at: Option<String>,
    #[serde(rename = "Responsividade", default, deserialize_with = "empty_string_as_none")]
    deadline: Option<String>,
    #[serde(rename = "Endereco", default, deserialize_with = "empty_string_as_none")]
    address: Option<String>,
    #[serde(rename = "Coordenada", default, deserialize_with = "empty_string_as_none")]
    coordinates: Option<String>,
    #[serde(
        rename = "Fiscal_Contratada",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    contractor_inspector: Option<String>,
    #[serde(rename = "Fiscal", default, deserialize_with = "empty_string_as_none")]
    inspector: Option<String>,
}

impl InspectionRow {
    fn into_draft(self, geocoder: &dyn Geocoder) -> Result<InspectionDraft, RowError> {
        let business_key = required_key(self.key)?;
        let synced_at = parse_timestamp("Data_Sincronizacao", self.synced_at.as_deref())?;
        let inspected_at = parse_timestamp("Data_Fiscalizacao", self.inspected_at.as_deref())?;
        let executed_at = parse_timestamp("Data_Execução", self.executed_at.as_deref())?;
        let coordinates = resolve_position(
            self.coordinates.as_deref(),
            self.address.as_deref(),
            geocoder,
        );

        Ok(InspectionDraft {
            business_key,
            notice_number: self.notice_number,
            area_name: self.regional,
            zone: self.zone,
            sector: self.sector,
            shift: self.shift,
            service: self.service,
            situation: self.situation,
            synced_at,
            inspected_at,
            executed_at,
            deadline_hours: parse_hours(self.deadline.as_deref()),
            address: self.address,
            coordinates,
            contractor_inspector: self.contractor_inspector,
            inspector: self.inspector,
        })
    }
}

pub fn parse_inspections(
    bytes: &[u8],
    geocoder: &dyn Geocoder,
) -> Result<Batch<InspectionDraft>, IngestError> {
    read_batch(bytes, INSPECTION_KEY_COLUMN, |row: InspectionRow| {
        row.into_draft(geocoder)
    })
}

impl Reconcilable for InspectionRecord {
    type Draft = InspectionDraft;

    fn draft_key(draft: &InspectionDraft) -> &str {
        &draft.business_key
    }

    fn create(id: RecordId, draft: InspectionDraft, imported_at: NaiveDateTime) -> Self {
        let status = draft.status().unwrap_or(InspectionStatus::Pending);
        InspectionRecord {
            id,
            business_key: draft.business_key,
            notice_number: draft.notice_number,
            area_name: draft.area_name.unwrap_or_default(),
            zone: draft.zone,
            sector: draft.sector,
            shift: draft.shift,
            service: draft.service,
            opened_at: draft.inspected_at.unwrap_or(imported_at),
            synced_at: draft.synced_at,
            inspected_at: draft.inspected_at,
            executed_at: draft.executed_at,
            deadline_hours: draft.deadline_hours.unwrap_or(DEFAULT_DEADLINE_HOURS),
            status,
            situation: draft.situation,
            address: draft.address,
            coordinates: draft.coordinates,
            contractor_inspector: draft.contractor_inspector,
            inspector: draft.inspector,
            bulk_imported: true,
        }
    }

    fn merge(&mut self, draft: InspectionDraft) {
        overwrite(&mut self.status, draft.status());
        overwrite(&mut self.opened_at, draft.inspected_at);
        overwrite(&mut self.area_name, draft.area_name);
        overwrite(&mut self.deadline_hours, draft.deadline_hours);
        overwrite_opt(&mut self.notice_number, draft.notice_number);
        overwrite_opt(&mut self.zone, draft.zone);
        overwrite_opt(&mut self.sector, draft.sector);
        overwrite_opt(&mut self.shift, draft.shift);
        overwrite_opt(&mut self.service, draft.service);
        overwrite_opt(&mut self.situation, draft.situation);
        overwrite_opt(&mut self.synced_at, draft.synced_at);
        overwrite_opt(&mut self.inspected_at, draft.inspected_at);
        overwrite_opt(&mut self.executed_at, draft.executed_at);
        overwrite_opt(&mut self.address, draft.address);
        overwrite_opt(&mut self.coordinates, draft.coordinates);
        overwrite_opt(&mut self.contractor_inspector, draft.contractor_inspector);
        overwrite_opt(&mut self.inspector, draft.inspector);
        self.bulk_imported = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::NoopGeocoder;

    const HEADER: &str = "N_BFS;N_CNC;Regional;Area;Setor;Turno;Servico;Situacao_CNC;Data_Sincronizacao;Data_Fiscalizacao;Data_Execução;Responsividade;Endereco;Coordenada;Fiscal_Contratada;Fiscal";

    fn drafts(rows: &[&str]) -> Vec<InspectionDraft> {
        let payload = format!("{HEADER}\n{}", rows.join("\n"));
        parse_inspections(payload.as_bytes(), &NoopGeocoder)
            .expect("payload parses")
            .drafts()
            .cloned()
            .collect()
    }

    #[test]
    fn situation_and_deadline_defaults() {
        let parsed = drafts(&[
            "BFS-1;CNC-1;Santana/Tucuruvi;A1;S1;Diurno;Varrição;Regularizado;02/11/2025 10:00:00;01/11/2025 09:00:00;;;Rua A;-23.5,-46.6;Maria;João",
            "BFS-2;;Santana/Tucuruvi;;;;;Irregular;;01/11/2025 09:30:00;;x;;;;",
        ]);

        let regularized = InspectionRecord::create(RecordId(1), parsed[0].clone(), NaiveDateTime::default());
        assert_eq!(regularized.status, InspectionStatus::Regularized);
        assert_eq!(regularized.deadline_hours, 24);
        assert_eq!(regularized.area_name, "Santana/Tucuruvi");
        assert_eq!(Some(regularized.opened_at), parsed[0].inspected_at);
        assert!(regularized.coordinates.is_some());

        let pending = InspectionRecord::create(RecordId(2), parsed[1].clone(), NaiveDateTime::default());
        assert_eq!(pending.status, InspectionStatus::Pending);
        assert!(pending.notice_number.is_none());
    }

    #[test]
    fn merge_promotes_status_without_clearing_details() {
        let parsed = drafts(&[
            "BFS-3;CNC-3;Jaçanã/Tremembé;Z9;;;Coleta;Aguardando Vistoria;;03/11/2025 07:00:00;;48;Rua B;;;Ana",
            "BFS-3;;;;;;;Regularizado;;;04/11/2025 07:00:00;;;;;",
        ]);
        let mut record = InspectionRecord::create(RecordId(3), parsed[0].clone(), NaiveDateTime::default());
        assert_eq!(record.status, InspectionStatus::AwaitingInspection);
        assert_eq!(record.deadline_hours, 48);

        record.merge(parsed[1].clone());
        assert!(record.is_regularized());
        assert_eq!(record.notice_number.as_deref(), Some("CNC-3"));
        assert_eq!(record.deadline_hours, 48);
        assert_eq!(record.inspector.as_deref(), Some("Ana"));
        assert!(record.executed_at.is_some());
    }
}
