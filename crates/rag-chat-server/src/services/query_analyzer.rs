/// Query Intent Analyzer
/// Maps a customer question onto one of the service categories the index is
/// tagged with, and detects pricing questions.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServiceIntent {
    #[serde(rename = "Aircon")]
    Aircon,
    #[serde(rename = "Home_Cleaning")]
    HomeCleaning,
    #[serde(rename = "Deep_Cleaning")]
    DeepCleaning,
    #[serde(rename = "Carpet_&_Upholstery")]
    CarpetAndUpholstery,
    #[serde(rename = "Home_Beauty")]
    HomeBeauty,
    #[serde(rename = "Massage")]
    Massage,
    #[serde(rename = "Handyman")]
    Handyman,
    #[serde(rename = "Pet_Care")]
    PetCare,
    #[serde(rename = "Elder_Care")]
    ElderCare,
    #[serde(rename = "General")]
    General,
}

impl ServiceIntent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Aircon => "Aircon",
            Self::HomeCleaning => "Home_Cleaning",
            Self::DeepCleaning => "Deep_Cleaning",
            Self::CarpetAndUpholstery => "Carpet_&_Upholstery",
            Self::HomeBeauty => "Home_Beauty",
            Self::Massage => "Massage",
            Self::Handyman => "Handyman",
            Self::PetCare => "Pet_Care",
            Self::ElderCare => "Elder_Care",
            Self::General => "General",
        }
    }
}

impl fmt::Display for ServiceIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

enum Pattern {
    /// Plain substring
    Contains(&'static str),
    /// Every substring must be present
    AllOf(&'static [&'static str]),
}

impl Pattern {
    fn matches(&self, query_lower: &str) -> bool {
        match self {
            Pattern::Contains(needle) => query_lower.contains(needle),
            Pattern::AllOf(needles) => needles.iter().all(|n| query_lower.contains(n)),
        }
    }
}

/// Evaluated top to bottom, first match wins.
const INTENT_RULES: &[(ServiceIntent, &[Pattern])] = &[
    (ServiceIntent::Aircon, &[Pattern::Contains("aircon"), Pattern::Contains("ac")]),
    (ServiceIntent::HomeCleaning, &[Pattern::AllOf(&["clean", "home"])]),
    (ServiceIntent::DeepCleaning, &[Pattern::Contains("deep clean")]),
    (
        ServiceIntent::CarpetAndUpholstery,
        &[Pattern::Contains("carpet"), Pattern::Contains("upholstery")],
    ),
    (
        ServiceIntent::HomeBeauty,
        &[
            Pattern::Contains("manicure"),
            Pattern::Contains("pedicure"),
            Pattern::Contains("nail"),
            Pattern::Contains("eyelashes"),
            Pattern::Contains("lashes"),
        ],
    ),
    (ServiceIntent::Massage, &[Pattern::Contains("massage")]),
    (ServiceIntent::Handyman, &[Pattern::Contains("handyman")]),
    (ServiceIntent::PetCare, &[Pattern::Contains("pet")]),
    (ServiceIntent::ElderCare, &[Pattern::Contains("elder")]),
];

const PRICING_PATTERNS: &[&str] = &["price", "cost", "how much", "pricing", "rate", "fee"];

pub struct QueryAnalyzer;

impl QueryAnalyzer {
    /// Classify a query into a service category (case-insensitive)
    pub fn classify(query: &str) -> ServiceIntent {
        let query_lower = query.to_lowercase();

        for (intent, patterns) in INTENT_RULES {
            if patterns.iter().any(|p| p.matches(&query_lower)) {
                debug!("Detected {} intent", intent);
                return *intent;
            }
        }

        debug!("Defaulting to General intent");
        ServiceIntent::General
    }

    /// Check if the query asks about prices, rates or fees
    pub fn is_pricing_query(query: &str) -> bool {
        let query_lower = query.to_lowercase();
        PRICING_PATTERNS.iter().any(|p| query_lower.contains(p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aircon_intent() {
        assert_eq!(
            QueryAnalyzer::classify("How much for aircon cleaning"),
            ServiceIntent::Aircon
        );
        assert_eq!(QueryAnalyzer::classify("My AC is leaking"), ServiceIntent::Aircon);
    }

    #[test]
    fn test_ac_matches_anywhere_in_query() {
        // Aircon is checked first, so any word containing "ac" lands there
        assert_eq!(
            QueryAnalyzer::classify("deep clean my place"),
            ServiceIntent::Aircon
        );
        assert_eq!(
            QueryAnalyzer::classify("Can I book a massage at my place?"),
            ServiceIntent::Aircon
        );
        assert_eq!(QueryAnalyzer::classify("come back later"), ServiceIntent::Aircon);
    }

    #[test]
    fn test_rule_order_first_match_wins() {
        // Home cleaning is checked before deep cleaning
        assert_eq!(
            QueryAnalyzer::classify("deep clean my home"),
            ServiceIntent::HomeCleaning
        );
        // Carpet is checked before pet
        assert_eq!(
            QueryAnalyzer::classify("carpet shampoo"),
            ServiceIntent::CarpetAndUpholstery
        );
    }

    #[test]
    fn test_remaining_categories() {
        assert_eq!(QueryAnalyzer::classify("Gel nails please"), ServiceIntent::HomeBeauty);
        assert_eq!(QueryAnalyzer::classify("eyelash extension lashes"), ServiceIntent::HomeBeauty);
        assert_eq!(QueryAnalyzer::classify("Book a MASSAGE"), ServiceIntent::Massage);
        assert_eq!(QueryAnalyzer::classify("need a handyman"), ServiceIntent::Handyman);
        assert_eq!(QueryAnalyzer::classify("pet grooming"), ServiceIntent::PetCare);
        assert_eq!(QueryAnalyzer::classify("elderly companion"), ServiceIntent::ElderCare);
        assert_eq!(QueryAnalyzer::classify("hello there"), ServiceIntent::General);
    }

    #[test]
    fn test_pricing_query() {
        assert!(QueryAnalyzer::is_pricing_query("How much is it?"));
        assert!(QueryAnalyzer::is_pricing_query("what's the PRICE"));
        assert!(QueryAnalyzer::is_pricing_query("any booking fee?"));
        assert!(!QueryAnalyzer::is_pricing_query("can you come tomorrow"));
    }

    #[test]
    fn test_labels() {
        assert_eq!(ServiceIntent::CarpetAndUpholstery.to_string(), "Carpet_&_Upholstery");
        assert_eq!(
            serde_json::to_string(&ServiceIntent::PetCare).unwrap(),
            "\"Pet_Care\""
        );
    }
}
