use serde::{Deserialize, Serialize};

/// Partition of service categories: demand-driven work is tracked against an
/// SLA, scheduled work is exempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryGroup {
    DemandDriven,
    Scheduled,
}

impl CategoryGroup {
    pub const fn label(self) -> &'static str {
        match self {
            Self::DemandDriven => "Demand-driven",
            Self::Scheduled => "Scheduled",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceCategory {
    Debris,
    DeadAnimal,
    WasteReceptacle,
    BulkPickup,
    SweepingCollection,
    PlazaSweeping,
    Sweeping,
    TaskForce,
    Washing,
    Drainage,
    Monument,
    Other,
}

impl ServiceCategory {
    pub const fn ordered() -> [Self; 12] {
        [
            Self::Debris,
            Self::DeadAnimal,
            Self::WasteReceptacle,
            Self::BulkPickup,
            Self::SweepingCollection,
            Self::PlazaSweeping,
            Self::Sweeping,
            Self::TaskForce,
            Self::Washing,
            Self::Drainage,
            Self::Monument,
            Self::Other,
        ]
    }

    pub const fn group(self) -> CategoryGroup {
        match self {
            Self::Debris | Self::DeadAnimal | Self::WasteReceptacle => CategoryGroup::DemandDriven,
            Self::BulkPickup
            | Self::SweepingCollection
            | Self::PlazaSweeping
            | Self::Sweeping
            | Self::TaskForce
            | Self::Washing
            | Self::Drainage
            | Self::Monument
            | Self::Other => CategoryGroup::Scheduled,
        }
    }

    pub const fn is_demand_driven(self) -> bool {
        matches!(self.group(), CategoryGroup::DemandDriven)
    }

    pub fn in_group(group: CategoryGroup) -> Vec<Self> {
        Self::ordered()
            .into_iter()
            .filter(|category| category.group() == group)
            .collect()
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Debris => "Debris and large objects",
            Self::DeadAnimal => "Dead animal removal",
            Self::WasteReceptacle => "Waste receptacles",
            Self::BulkPickup => "Scheduled bulk pickup",
            Self::SweepingCollection => "Market and sweeping collection",
            Self::PlazaSweeping => "Plaza sweeping",
            Self::Sweeping => "Street sweeping",
            Self::TaskForce => "Maintenance task force",
            Self::Washing => "Public equipment washing",
            Self::Drainage => "Storm drain cleaning",
            Self::Monument => "Monument conservation",
            Self::Other => "Other",
        }
    }
}

/// Lifecycle status of a service request, keyed by the source system label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    AwaitingAnalysis,
    AwaitingScheduling,
    AwaitingReinspection,
    NotApplicable,
    InExecution,
    Executed,
    ConfirmExecution,
    ExecutionConfirmed,
    ExecutionNotConfirmed,
    ConfirmOutOfScope,
    AwaitingPartialConfirmation,
    Finalized,
}

impl RequestStatus {
    const SOURCE_LABELS: [(&'static str, RequestStatus); 12] = [
        ("Aguardando Análise", Self::AwaitingAnalysis),
        ("Aguardando Agendamento", Self::AwaitingScheduling),
        ("Aguardando Revistoria", Self::AwaitingReinspection),
        ("Não Procede", Self::NotApplicable),
        ("Em Execução", Self::InExecution),
        ("Executado", Self::Executed),
        ("Confirmar Execução", Self::ConfirmExecution),
        ("Confirmada Execução", Self::ExecutionConfirmed),
        ("Não Confirmada Execução", Self::ExecutionNotConfirmed),
        ("Confirmar Fora de Escopo", Self::ConfirmOutOfScope),
        (
            "Aguardando Confirmação de Execução Parcial",
            Self::AwaitingPartialConfirmation,
        ),
        ("Finalizado", Self::Finalized),
    ];

    pub fn from_source_label(label: &str) -> Option<Self> {
        let trimmed = label.trim();
        Self::SOURCE_LABELS
            .iter()
            .find(|(source, _)| *source == trimmed)
            .map(|(_, status)| *status)
    }

    /// Finished states that count toward the compliance indicators.
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Executed | Self::Finalized | Self::ExecutionConfirmed
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AreaCode {
    #[serde(rename = "CV")]
    CasaVerde,
    #[serde(rename = "JT")]
    Jacana,
    #[serde(rename = "ST")]
    Santana,
    #[serde(rename = "MG")]
    VilaMaria,
}

impl AreaCode {
    pub const fn ordered() -> [Self; 4] {
        [Self::CasaVerde, Self::Jacana, Self::Santana, Self::VilaMaria]
    }

    pub const fn code(self) -> &'static str {
        match self {
            Self::CasaVerde => "CV",
            Self::Jacana => "JT",
            Self::Santana => "ST",
            Self::VilaMaria => "MG",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        let trimmed = code.trim();
        Self::ordered()
            .into_iter()
            .find(|area| area.code().eq_ignore_ascii_case(trimmed))
    }

    /// Administrative name as written by the inspection system.
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::CasaVerde => "Casa Verde/Cachoeirinha",
            Self::Jacana => "Jaçanã/Tremembé",
            Self::Santana => "Santana/Tucuruvi",
            Self::VilaMaria => "Vila Maria/Vila Guilherme",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InspectionStatus {
    Pending,
    Urgent,
    Regularized,
    AwaitingInspection,
}

impl InspectionStatus {
    pub fn from_situation(situation: &str) -> Self {
        match situation.trim() {
            "Regularizado" => Self::Regularized,
            "Aguardando Vistoria" => Self::AwaitingInspection,
            _ => Self::Pending,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Urgent => "Urgent",
            Self::Regularized => "Regularized",
            Self::AwaitingInspection => "Awaiting inspection",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationStatus {
    Requested,
    Confirmed,
    Cancelled,
}

impl ViolationStatus {
    pub fn from_source_label(label: &str) -> Option<Self> {
        match label.trim() {
            "Solicitacao" => Some(Self::Requested),
            "Confirmado" => Some(Self::Confirmed),
            "Cancelado" => Some(Self::Cancelled),
            _ => None,
        }
    }
}
