//! The four mandate topics and keyword-based topic detection.
//!
//! | Topic | Keywords |
//! |-------|----------|
//! | `land` | land, territory, ancestral, sovereign, ownership |
//! | `culture` | culture, language, identity, recognition, coloured, heritage |
//! | `representation` | representation, parliament, political, voting, governance, veto |
//! | `reparation` | reparation, financial, compensation, fund, economic, payment |
//!
//! Matching is a case-insensitive substring test. Topics are scanned in
//! the table's order and the first hit wins, so a query mentioning both
//! "land" and "compensation" is a `land` query.

use serde::{Deserialize, Serialize};

/// One of the four pillars of the mandate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Topic {
    Land,
    Culture,
    Representation,
    Reparation,
}

impl Topic {
    /// Fixed scan order for detection.
    pub const ALL: [Topic; 4] = [
        Topic::Land,
        Topic::Culture,
        Topic::Representation,
        Topic::Reparation,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Topic::Land => "land",
            Topic::Culture => "culture",
            Topic::Representation => "representation",
            Topic::Reparation => "reparation",
        }
    }

    // Substring matching overlaps ("fund" hits "fundamental", "recognition"
    // is as much political as cultural). Scan order settles it.
    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            Topic::Land => &["land", "territory", "ancestral", "sovereign", "ownership"],
            Topic::Culture => &[
                "culture",
                "language",
                "identity",
                "recognition",
                "coloured",
                "heritage",
            ],
            Topic::Representation => &[
                "representation",
                "parliament",
                "political",
                "voting",
                "governance",
                "veto",
            ],
            Topic::Reparation => &[
                "reparation",
                "financial",
                "compensation",
                "fund",
                "economic",
                "payment",
            ],
        }
    }

    /// Whether `lowered` (already lowercased) mentions this topic.
    pub fn matches(&self, lowered: &str) -> bool {
        self.keywords().iter().any(|k| lowered.contains(k))
    }

    /// First topic mentioned by `query`, if any.
    pub fn detect(query: &str) -> Option<Topic> {
        let lowered = query.to_lowercase();
        Topic::ALL.into_iter().find(|t| t.matches(&lowered))
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
