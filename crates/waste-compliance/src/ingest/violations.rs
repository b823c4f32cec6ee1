use std::collections::HashMap;
use std::time::Duration;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::warn;

use super::parser::{empty_string_as_none, parse_amount, parse_timestamp, read_batch, required_key};
use super::{Batch, IngestError, RowError};
use crate::domain::{InspectionRecord, RecordId, ViolationRecord, ViolationStatus};
use crate::reconcile::{overwrite_opt, Reconcilable};
use crate::repository::{KeyedRecord, RecordStore};

pub const VIOLATION_KEY_COLUMN: &str = "N_ACIC";

#[derive(Debug, Clone, PartialEq)]
pub struct ViolationDraft {
    pub business_key: String,
    pub inspection_number: Option<String>,
    pub notice_number: Option<String>,
    /// Filled by [`link_inspections`] when the referenced inspection exists.
    pub inspection_id: Option<RecordId>,
    pub status: Option<ViolationStatus>,
    pub inspected_at: Option<NaiveDateTime>,
    pub synced_at: Option<NaiveDateTime>,
    pub executed_at: Option<NaiveDateTime>,
    pub issued_at: Option<NaiveDateTime>,
    pub confirmed_at: Option<NaiveDateTime>,
    pub fine_amount: Option<Decimal>,
    pub service: Option<String>,
    pub responsible: Option<String>,
    pub inspector: Option<String>,
    pub contractor: Option<String>,
    pub area_name: Option<String>,
    pub zone: Option<String>,
    pub description: Option<String>,
    pub contract_clause: Option<String>,
    pub remarks: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ViolationRow {
    #[serde(rename = "N_ACIC", default, deserialize_with = "empty_string_as_none")]
    key: Option<String>,
    #[serde(rename = "N_BFS", default, deserialize_with = "empty_string_as_none")]
    inspection_number: Option<String>,
    #[serde(rename = "N_CNC", default, deserialize_with = "empty_string_as_none")]
    notice_number: Option<String>,
    #[serde(rename = "Status", default, deserialize_with = "empty_string_as_none")]
    status: Option<String>,
    #[serde(
        rename = "Data_Fiscalizacao",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    inspected_at: Option<String>,
    #[serde(
        rename = "Data_Sincronizacao",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    synced_at: Option<String>,
    #[serde(rename = "Data_Execução", default, deserialize_with = "empty_string_as_none")]
    executed_at: Option<String>,
    #[serde(rename = "Data_ACIC", default, deserialize_with = "empty_string_as_none")]
    issued_at: Option<String>,
    #[serde(rename = "Data_Confirmacao", default, deserialize_with = "empty_string_as_none")]
    confirmed_at: Option<String>,
    #[serde(rename = "Valor_Multa", default, deserialize_with = "empty_string_as_none")]
    fine_amount: Option<String>,
    #[serde(rename = "Servico", default, deserialize_with = "empty_string_as_none")]
    service: Option<String>,
    #[serde(rename = "Responsavel", default, deserialize_with = "empty_string_as_none")]
    responsible: Option<String>,
    #[serde(
        rename = "Agente_Fiscalizador",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    inspector: Option<String>,
    #[serde(rename = "Contratada", default, deserialize_with = "empty_string_as_none")]
    contractor: Option<String>,
    #[serde(rename = "Regional", default, deserialize_with = "empty_string_as_none")]
    area_name: Option<String>,
    #[serde(rename = "Area", default, deserialize_with = "empty_string_as_none")]
    zone: Option<String>,
    #[serde(rename = "Descricao", default, deserialize_with = "empty_string_as_none")]
    description: Option<String>,
    #[serde(
        rename = "Clausula_Contratual",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    contract_clause: Option<String>,
    #[serde(rename = "Observacao", default, deserialize_with = "empty_string_as_none")]
    remarks: Option<String>,
    #[serde(rename = "Endereco", default, deserialize_with = "empty_string_as_none")]
    address: Option<String>,
}

impl ViolationRow {
    fn into_draft(self) -> Result<ViolationDraft, RowError> {
        let business_key = required_key(self.key)?;

        Ok(ViolationDraft {
            business_key,
            inspection_number: self.inspection_number,
            notice_number: self.notice_number,
            inspection_id: None,
            status: self
                .status
                .as_deref()
                .and_then(ViolationStatus::from_source_label),
            inspected_at: parse_timestamp("Data_Fiscalizacao", self.inspected_at.as_deref())?,
            synced_at: parse_timestamp("Data_Sincronizacao", self.synced_at.as_deref())?,
            executed_at: parse_timestamp("Data_Execução", self.executed_at.as_deref())?,
            issued_at: parse_timestamp("Data_ACIC", self.issued_at.as_deref())?,
            confirmed_at: parse_timestamp("Data_Confirmacao", self.confirmed_at.as_deref())?,
            fine_amount: parse_amount(self.fine_amount.as_deref()),
            service: self.service,
            responsible: self.responsible,
            inspector: self.inspector,
            contractor: self.contractor,
            area_name: self.area_name,
            zone: self.zone,
            description: self.description,
            contract_clause: self.contract_clause,
            remarks: self.remarks,
            address: self.address,
        })
    }
}

pub fn parse_violations(bytes: &[u8]) -> Result<Batch<ViolationDraft>, IngestError> {
    read_batch(bytes, VIOLATION_KEY_COLUMN, ViolationRow::into_draft)
}

/// Best-effort link from each violation to the inspection it references.
/// Returns the number of linked drafts; a store failure links nothing.
pub fn link_inspections<S>(
    batch: &mut Batch<ViolationDraft>,
    inspections: &S,
    timeout: Duration,
) -> usize
where
    S: RecordStore<InspectionRecord> + ?Sized,
{
    let mut numbers: Vec<String> = batch
        .drafts()
        .filter_map(|draft| draft.inspection_number.clone())
        .collect();
    numbers.sort_unstable();
    numbers.dedup();
    if numbers.is_empty() {
        return 0;
    }

    let found: HashMap<String, RecordId> = match inspections.fetch_by_keys(&numbers, timeout) {
        Ok(records) => records
            .into_iter()
            .map(|record| (record.business_key().to_string(), record.id()))
            .collect(),
        Err(error) => {
            warn!(%error, "inspection lookup failed; violations left unlinked");
            return 0;
        }
    };

    let mut linked = 0;
    for row in &mut batch.rows {
        if let Ok(draft) = row.parsed.as_mut() {
            draft.inspection_id = draft
                .inspection_number
                .as_ref()
                .and_then(|number| found.get(number).copied());
            if draft.inspection_id.is_some() {
                linked += 1;
            }
        }
    }
    linked
}

impl Reconcilable for ViolationRecord {
    type Draft = ViolationDraft;

    fn draft_key(draft: &ViolationDraft) -> &str {
        &draft.business_key
    }

    fn create(id: RecordId, draft: ViolationDraft, _imported_at: NaiveDateTime) -> Self {
        ViolationRecord {
            id,
            business_key: draft.business_key,
            inspection_number: draft.inspection_number,
            notice_number: draft.notice_number,
            inspection_id: draft.inspection_id,
            status: draft.status,
            inspected_at: draft.inspected_at,
            synced_at: draft.synced_at,
            executed_at: draft.executed_at,
            issued_at: draft.issued_at,
            confirmed_at: draft.confirmed_at,
            service: draft.service,
            responsible: draft.responsible,
            inspector: draft.inspector,
            contractor: draft.contractor,
            area_name: draft.area_name,
            zone: draft.zone,
            description: draft.description,
            fine_amount: draft.fine_amount,
            contract_clause: draft.contract_clause,
            remarks: draft.remarks,
            address: draft.address,
            bulk_imported: true,
        }
    }

    fn merge(&mut self, draft: ViolationDraft) {
        overwrite_opt(&mut self.inspection_number, draft.inspection_number);
        overwrite_opt(&mut self.notice_number, draft.notice_number);
        overwrite_opt(&mut self.inspection_id, draft.inspection_id);
        overwrite_opt(&mut self.status, draft.status);
        overwrite_opt(&mut self.inspected_at, draft.inspected_at);
        overwrite_opt(&mut self.synced_at, draft.synced_at);
        overwrite_opt(&mut self.executed_at, draft.executed_at);
        overwrite_opt(&mut self.issued_at, draft.issued_at);
        overwrite_opt(&mut self.confirmed_at, draft.confirmed_at);
        overwrite_opt(&mut self.fine_amount, draft.fine_amount);
        overwrite_opt(&mut self.service, draft.service);
        overwrite_opt(&mut self.responsible, draft.responsible);
        overwrite_opt(&mut self.inspector, draft.inspector);
        overwrite_opt(&mut self.contractor, draft.contractor);
        overwrite_opt(&mut self.area_name, draft.area_name);
        overwrite_opt(&mut self.zone, draft.zone);
        overwrite_opt(&mut self.description, draft.description);
        overwrite_opt(&mut self.contract_clause, draft.contract_clause);
        overwrite_opt(&mut self.remarks, draft.remarks);
        overwrite_opt(&mut self.address, draft.address);
        self.bulk_imported = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::InspectionStatus;
    use crate::repository::MemoryTable;

    const HEADER: &str = "N_ACIC;N_BFS;N_CNC;Status;Data_Fiscalizacao;Data_Sincronizacao;Data_Execução;Data_ACIC;Data_Confirmacao;Valor_Multa;Servico;Responsavel;Agente_Fiscalizador;Contratada;Regional;Area;Descricao;Clausula_Contratual;Observacao;Endereco";

    fn batch(rows: &[&str]) -> Batch<ViolationDraft> {
        let payload = format!("{HEADER}\n{}", rows.join("\n"));
        parse_violations(payload.as_bytes()).expect("payload parses")
    }

    fn inspection(id: u64, key: &str) -> InspectionRecord {
        InspectionRecord {
            id: RecordId(id),
            business_key: key.to_string(),
            notice_number: None,
            area_name: "Santana/Tucuruvi".to_string(),
            zone: None,
            sector: None,
            shift: None,
            service: None,
            opened_at: NaiveDateTime::default(),
            synced_at: None,
            inspected_at: None,
            executed_at: None,
            deadline_hours: 24,
            status: InspectionStatus::Pending,
            situation: None,
            address: None,
            coordinates: None,
            contractor_inspector: None,
            inspector: None,
            bulk_imported: false,
        }
    }

    #[test]
    fn parses_status_amount_and_dates() {
        let parsed = batch(&[
            "ACIC-1;BFS-1;CNC-1;Confirmado;01/11/2025 09:00:00;;;05/11/2025;;1234,50;Varrição;Ana;Rui;Loga;Santana/Tucuruvi;A1;Sujeira;7.1;;Rua A",
            "ACIC-2;BFS-2;;Em análise;;;;;;;;;;;;;;;;",
        ]);
        let drafts: Vec<_> = parsed.drafts().cloned().collect();
        assert_eq!(drafts[0].status, Some(ViolationStatus::Confirmed));
        assert!(drafts[0].issued_at.is_some());
        assert_eq!(drafts[1].status, None);
        assert_eq!(drafts[1].fine_amount, None);
    }

    #[test]
    fn fine_amount_uses_comma_decimal_separator() {
        let parsed = batch(&["ACIC-3;;;Solicitacao;;;;;;250,75;;;;;;;;;;"]);
        let draft = parsed.drafts().next().expect("draft");
        assert_eq!(draft.fine_amount, Some(Decimal::new(25_075, 2)));
        assert_eq!(draft.status, Some(ViolationStatus::Requested));
    }

    #[test]
    fn links_only_known_inspections() {
        let inspections = MemoryTable::default();
        inspections
            .insert(inspection(7_000_001, "BFS-1"))
            .expect("seed");

        let mut parsed = batch(&[
            "ACIC-1;BFS-1;;Confirmado;;;;;;;;;;;;;;;;",
            "ACIC-2;BFS-404;;Confirmado;;;;;;;;;;;;;;;;",
            "ACIC-3;;;Confirmado;;;;;;;;;;;;;;;;",
        ]);
        assert_eq!(
            link_inspections(&mut parsed, &inspections, Duration::from_millis(50)),
            1
        );

        let links: Vec<_> = parsed.drafts().map(|draft| draft.inspection_id).collect();
        assert_eq!(links, vec![Some(RecordId(7_000_001)), None, None]);
    }
}
