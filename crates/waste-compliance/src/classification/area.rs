use serde::Serialize;

use super::normalizer::normalize_text;
use super::rules::{first_match, Predicate, Rule};
use crate::domain::AreaCode;

/// Applied when an administrative name matches none of the known areas.
pub const DEFAULT_AREA: AreaCode = AreaCode::CasaVerde;

static AREA_RULES: [Rule<AreaCode>; 4] = [
    Rule {
        name: "casa-verde",
        predicate: Predicate::Contains(&["casa verde", "cachoeirinha"]),
        outcome: AreaCode::CasaVerde,
    },
    Rule {
        name: "jacana",
        predicate: Predicate::Contains(&["jacana", "tremembe"]),
        outcome: AreaCode::Jacana,
    },
    Rule {
        name: "santana",
        predicate: Predicate::Contains(&["santana", "tucuruvi"]),
        outcome: AreaCode::Santana,
    },
    Rule {
        name: "vila-maria",
        predicate: Predicate::Contains(&["vila maria", "vila guilherme"]),
        outcome: AreaCode::VilaMaria,
    },
];

/// Resolved area code plus whether the default had to be applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AreaMatch {
    pub code: AreaCode,
    pub defaulted: bool,
}

pub fn classify_area(text: &str) -> AreaMatch {
    let normalized = normalize_text(text);
    match first_match(&AREA_RULES, &normalized) {
        Some(rule) => AreaMatch {
            code: rule.outcome,
            defaulted: false,
        },
        None => AreaMatch {
            code: DEFAULT_AREA,
            defaulted: true,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accented_mixed_case_names_resolve() {
        let cases = [
            ("JAÇANÃ/TREMEMBÉ", AreaCode::Jacana),
            ("Santana/Tucuruvi", AreaCode::Santana),
            ("vila guilherme", AreaCode::VilaMaria),
            ("Subprefeitura Casa Verde", AreaCode::CasaVerde),
            ("Jacana", AreaCode::Jacana),
        ];
        for (text, expected) in cases {
            let resolved = classify_area(text);
            assert_eq!(resolved.code, expected, "{text}");
            assert!(!resolved.defaulted, "{text}");
        }
    }

    #[test]
    fn unmatched_names_report_the_default() {
        let resolved = classify_area("Pinheiros");
        assert_eq!(resolved.code, DEFAULT_AREA);
        assert!(resolved.defaulted);

        let explicit = classify_area("Cachoeirinha");
        assert_eq!(explicit.code, DEFAULT_AREA);
        assert!(!explicit.defaulted);
    }

    #[test]
    fn every_display_name_maps_back_to_its_code() {
        for area in AreaCode::ordered() {
            assert_eq!(classify_area(area.display_name()).code, area);
        }
    }
}
