//! Free-text classification of service descriptions and administrative areas.
//!
//! Both classifiers are total: unmatched text resolves to a documented
//! default instead of an error.

mod area;
mod normalizer;
pub mod rules;

use serde::Serialize;

use crate::domain::ServiceCategory;
use rules::{first_match, Predicate, Rule};

pub use area::{classify_area, AreaMatch, DEFAULT_AREA};
use normalizer::normalize_text;

const DEBRIS_MARKERS: Predicate = Predicate::Contains(&["entulho", "grandes objetos"]);
const PROGRAMMED: Predicate = Predicate::Contains(&["programada", "programado"]);

/// Service description rules in precedence order. The bulk-pickup rules must
/// stay ahead of the debris rule: descriptions routinely carry both a debris
/// word and the "programmed" qualifier.
pub static SERVICE_RULES: [Rule<ServiceCategory>; 12] = [
    Rule {
        name: "explicit-bulk-pickup",
        predicate: Predicate::Contains(&["cata-bagulho", "cata bagulho", "catabagulho"]),
        outcome: ServiceCategory::BulkPickup,
    },
    Rule {
        name: "programmed-collection",
        predicate: Predicate::Any(&[
            Predicate::Contains(&["coleta programada"]),
            Predicate::All(&[PROGRAMMED, DEBRIS_MARKERS]),
        ]),
        outcome: ServiceCategory::BulkPickup,
    },
    Rule {
        name: "debris",
        predicate: Predicate::All(&[DEBRIS_MARKERS, Predicate::Not(&PROGRAMMED)]),
        outcome: ServiceCategory::Debris,
    },
    Rule {
        name: "dead-animal",
        predicate: Predicate::All(&[
            Predicate::Contains(&["animal", "animais"]),
            Predicate::Contains(&["morto", "mortos"]),
        ]),
        outcome: ServiceCategory::DeadAnimal,
    },
    Rule {
        name: "waste-receptacle",
        predicate: Predicate::Contains(&["papeleira", "lixeira", "equipamentos de recepcao"]),
        outcome: ServiceCategory::WasteReceptacle,
    },
    Rule {
        name: "sweeping-collection",
        predicate: Predicate::All(&[
            Predicate::Contains(&["coleta manual", "coleta de varricao"]),
            Predicate::Contains(&["feira", "compactador"]),
        ]),
        outcome: ServiceCategory::SweepingCollection,
    },
    Rule {
        name: "plaza-sweeping",
        predicate: Predicate::Contains(&["varricao de praca"]),
        outcome: ServiceCategory::PlazaSweeping,
    },
    Rule {
        name: "sweeping",
        predicate: Predicate::Contains(&["varricao"]),
        outcome: ServiceCategory::Sweeping,
    },
    Rule {
        name: "task-force",
        predicate: Predicate::Contains(&[
            "mutirao",
            "capinacao",
            "propaganda",
            "raspagem",
            "pintura de guia",
            "zeladoria",
        ]),
        outcome: ServiceCategory::TaskForce,
    },
    Rule {
        name: "washing",
        predicate: Predicate::All(&[
            Predicate::Contains(&["lavagem"]),
            Predicate::Contains(&["equipamento", "publico"]),
        ]),
        outcome: ServiceCategory::Washing,
    },
    Rule {
        name: "drainage",
        predicate: Predicate::Contains(&["bueiro", "boca de lobo", "boca de leao", "desobstrucao"]),
        outcome: ServiceCategory::Drainage,
    },
    Rule {
        name: "monument",
        predicate: Predicate::Contains(&["monumento"]),
        outcome: ServiceCategory::Monument,
    },
];

/// Category plus the name of the rule that produced it (`"default"` when no
/// rule matched).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub category: ServiceCategory,
    pub rule: &'static str,
}

pub fn classify(text: &str) -> ServiceCategory {
    explain(text).category
}

pub fn explain(text: &str) -> Classification {
    let normalized = normalize_text(text);
    match first_match(&SERVICE_RULES, &normalized) {
        Some(rule) => Classification {
            category: rule.outcome,
            rule: rule.name,
        },
        None => Classification {
            category: ServiceCategory::Other,
            rule: "default",
        },
    }
}
