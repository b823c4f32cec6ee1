//! Ordered "first match wins" rule evaluation over normalized text.
//!
//! Rule order is data: tables are plain slices and [`first_match`] walks them
//! front to back, so precedence can be inspected and tested directly.

/// Substring predicate evaluated against normalized text. Markers must be
/// written in normalized form (lowercase, no accents).
#[derive(Debug, Clone, Copy)]
pub enum Predicate {
    /// At least one marker is present.
    Contains(&'static [&'static str]),
    /// Every inner predicate holds.
    All(&'static [Predicate]),
    /// At least one inner predicate holds.
    Any(&'static [Predicate]),
    Not(&'static Predicate),
}

impl Predicate {
    pub fn matches(&self, normalized: &str) -> bool {
        match self {
            Predicate::Contains(markers) => markers.iter().any(|marker| normalized.contains(marker)),
            Predicate::All(inner) => inner.iter().all(|predicate| predicate.matches(normalized)),
            Predicate::Any(inner) => inner.iter().any(|predicate| predicate.matches(normalized)),
            Predicate::Not(inner) => !inner.matches(normalized),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Rule<T: 'static> {
    pub name: &'static str,
    pub predicate: Predicate,
    pub outcome: T,
}

pub fn first_match<'r, T>(rules: &'r [Rule<T>], normalized: &str) -> Option<&'r Rule<T>> {
    rules.iter().find(|rule| rule.predicate.matches(normalized))
}

#[cfg(test)]
mod tests {
    use super::*;

    const RULES: [Rule<u8>; 3] = [
        Rule {
            name: "both",
            predicate: Predicate::All(&[
                Predicate::Contains(&["alpha"]),
                Predicate::Contains(&["beta"]),
            ]),
            outcome: 1,
        },
        Rule {
            name: "alpha-without-gamma",
            predicate: Predicate::All(&[
                Predicate::Contains(&["alpha"]),
                Predicate::Not(&Predicate::Contains(&["gamma"])),
            ]),
            outcome: 2,
        },
        Rule {
            name: "either",
            predicate: Predicate::Any(&[
                Predicate::Contains(&["gamma"]),
                Predicate::Contains(&["delta"]),
            ]),
            outcome: 3,
        },
    ];

    #[test]
    fn earlier_rules_take_precedence() {
        assert_eq!(first_match(&RULES, "alpha beta gamma").map(|r| r.outcome), Some(1));
        assert_eq!(first_match(&RULES, "alpha only").map(|r| r.outcome), Some(2));
        assert_eq!(first_match(&RULES, "alpha gamma").map(|r| r.outcome), Some(3));
        assert_eq!(first_match(&RULES, "delta").map(|r| r.name), Some("either"));
    }

    #[test]
    fn no_match_yields_none() {
        assert!(first_match(&RULES, "epsilon").is_none());
        assert!(first_match::<u8>(&[], "alpha").is_none());
    }
}
