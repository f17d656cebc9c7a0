//! Account alias tables and the ordered-priority label resolver.
//!
//! Filers label the same line item differently across periods and across
//! consolidated/standalone statements ("이익잉여금" vs
//! "미처분이익잉여금(결손금)", "현금및현금성자산" vs "현금성자산", ...), so
//! every canonical concept carries an ordered list of acceptable label
//! variants. Matching is substring-based, because exact match would silently
//! drop valid rows; order encodes which variant is authoritative when
//! several rows could match.

use crate::document::{RawTable, RawValue};
use crate::models::CanonicalConcept;

/// Ordered label variants for one canonical concept. The first alias is the
/// most specific/likely label.
#[derive(Debug, Clone, Copy)]
pub struct AliasSet {
    pub concept: CanonicalConcept,
    pub aliases: &'static [&'static str],
}

// Label variants observed in real filings. Aliases are written without
// whitespace; row labels are whitespace-collapsed at extraction time.
const ALIAS_SETS: [AliasSet; 8] = [
    AliasSet {
        concept: CanonicalConcept::TotalAssets,
        aliases: &["자산총계", "자산"],
    },
    AliasSet {
        concept: CanonicalConcept::TotalLiabilities,
        aliases: &["부채총계", "부채"],
    },
    AliasSet {
        concept: CanonicalConcept::TotalEquity,
        aliases: &["자본총계", "자본"],
    },
    AliasSet {
        concept: CanonicalConcept::CurrentAssets,
        aliases: &["유동자산"],
    },
    AliasSet {
        concept: CanonicalConcept::RetainedEarnings,
        aliases: &["이익잉여금", "미처분이익잉여금", "결손금", "미처리결손금"],
    },
    AliasSet {
        concept: CanonicalConcept::CashAndEquivalents,
        aliases: &["현금및현금성자산", "현금성자산", "현금"],
    },
    AliasSet {
        concept: CanonicalConcept::ShortTermFinancialAssets,
        aliases: &[
            "단기금융상품",
            "유동금융자산",
            "기타유동금융자산",
            "단기매매증권",
            "단기투자자산",
            "금융기관예치금",
        ],
    },
    AliasSet {
        concept: CanonicalConcept::NetIncome,
        aliases: &[
            "당기순이익",
            "법인세비용차감전순이익",
            "연결당기순이익",
            "보통주당기순이익",
            "당기순손익",
            "지배기업소유주지분순이익",
            "지배기업의소유주에게귀속되는당기순이익",
        ],
    },
];

pub fn alias_sets() -> &'static [AliasSet] {
    &ALIAS_SETS
}

pub fn alias_set(concept: CanonicalConcept) -> &'static AliasSet {
    ALIAS_SETS
        .iter()
        .find(|s| s.concept == concept)
        .expect("every canonical concept has an alias set")
}

/// Resolve an ordered alias list against a table.
///
/// Scans aliases in declared order and returns the value sequence of the
/// first row whose normalized label contains the alias. `None` means "value
/// unknown", never "table invalid" -- no-match is a frequent, expected
/// outcome.
pub fn resolve_labels<'t>(table: &'t RawTable, aliases: &[&str]) -> Option<&'t [RawValue]> {
    for alias in aliases {
        for (label, values) in table.rows() {
            if label.contains(alias) {
                return Some(values);
            }
        }
    }
    None
}

/// Resolve a canonical concept against a table using the static alias table.
pub fn resolve_concept<'t>(table: &'t RawTable, concept: CanonicalConcept) -> Option<&'t [RawValue]> {
    resolve_labels(table, alias_set(concept).aliases)
}
