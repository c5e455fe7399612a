//! Flat keyword-membership flags. Every function here expects lowercased text.

use std::sync::LazyLock;

use regex::Regex;

pub const SENIORITY_KEYWORDS: &[&str] = &["senior", "lead", "principal", "staff", "architect"];
pub const JUNIORITY_KEYWORDS: &[&str] = &[
    "junior",
    "entry-level",
    "entry level",
    "intern",
    "associate",
    "new grad",
    "fresh grad",
];
pub const MANAGEMENT_KEYWORDS: &[&str] = &[
    "manager",
    "director",
    "vp",
    "head of",
    "founder",
    "chief",
    "cto",
    "ceo",
    "engineering manager",
];

pub const TIER_1_CITIES: &[&str] = &[
    "san francisco",
    "sf",
    "nyc",
    "new york",
    "seattle",
    "bay area",
    "silicon valley",
    "london",
];
pub const EUROPE_LOCATIONS: &[&str] = &[
    "london",
    "berlin",
    "paris",
    "amsterdam",
    "dublin",
    "remote eu",
    "europe",
];
pub const GLOBAL_REMOTE_KEYWORDS: &[&str] = &[
    "remote worldwide",
    "global remote",
    "anywhere",
    "remote (global)",
];

pub const YC_KEYWORDS: &[&str] = &["yc", "y combinator", "ycombinator"];
pub const FUNDING_KEYWORDS: &[&str] = &[
    "series a",
    "series b",
    "series c",
    "raised",
    "funding",
    "backed",
];
pub const CRYPTO_KEYWORDS: &[&str] = &[
    "web3",
    "crypto",
    "blockchain",
    "defi",
    "ethereum",
    "solana",
    "bitcoin",
    "smart contract",
];

pub const EQUITY_KEYWORDS: &[&str] = &["equity", "stock options", "rsu", "stock", "ownership", "%"];
pub const VISA_KEYWORDS: &[&str] = &["visa", "sponsorship", "h1b", "relocation"];

static YEARS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+)\+?\s*years?").unwrap());

fn contains_any(lower: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| lower.contains(n))
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ExperienceFlags {
    pub is_senior: bool,
    pub is_junior: bool,
    pub is_manager: bool,
    pub years_experience: Option<i32>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LocationFlags {
    pub is_tier_1_city: bool,
    pub is_europe: bool,
    pub is_global_remote: bool,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StageFlags {
    pub is_yc: bool,
    pub is_funded: bool,
    pub is_crypto: bool,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CompensationFlags {
    pub has_equity: bool,
    pub offers_visa: bool,
}

pub fn experience(lower: &str) -> ExperienceFlags {
    ExperienceFlags {
        is_senior: contains_any(lower, SENIORITY_KEYWORDS),
        is_junior: contains_any(lower, JUNIORITY_KEYWORDS),
        is_manager: contains_any(lower, MANAGEMENT_KEYWORDS),
        years_experience: years_of_experience(lower),
    }
}

/// First `N years` / `N+ years` mention. Out-of-range numbers count as absent.
pub fn years_of_experience(lower: &str) -> Option<i32> {
    YEARS_RE
        .captures(lower)
        .and_then(|caps| caps[1].parse::<i32>().ok())
}

pub fn location(lower: &str) -> LocationFlags {
    LocationFlags {
        is_tier_1_city: contains_any(lower, TIER_1_CITIES),
        is_europe: contains_any(lower, EUROPE_LOCATIONS),
        is_global_remote: contains_any(lower, GLOBAL_REMOTE_KEYWORDS),
    }
}

pub fn stage(lower: &str) -> StageFlags {
    StageFlags {
        is_yc: contains_any(lower, YC_KEYWORDS),
        is_funded: contains_any(lower, FUNDING_KEYWORDS),
        is_crypto: contains_any(lower, CRYPTO_KEYWORDS),
    }
}

pub fn compensation(lower: &str) -> CompensationFlags {
    CompensationFlags {
        has_equity: contains_any(lower, EQUITY_KEYWORDS),
        offers_visa: contains_any(lower, VISA_KEYWORDS),
    }
}

// ── Tests ──
