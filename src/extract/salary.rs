use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::models::Currency;

static RANGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\$€£]?(\d{5,6}|\d{2,3}k?)\s*-\s*[\$€£]?(\d{5,6}|\d{2,3}k?)").unwrap()
});
static STARTING_AT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:from|starting at|\+)\s*[\$€£]?(\d{2,3}k|\d{5,6})\+?").unwrap()
});
static TRAILING_PLUS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\$€£]?(\d{2,3}k|\d{5,6})\+").unwrap());
static SINGLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\$€£](\d{2,3}k|\d{5,6})").unwrap());
// Whole words only, so "Europe" is not a euro salary.
static GBP_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bgbp\b").unwrap());
static EUR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\beur\b").unwrap());

/// Normalization thresholds. Heuristic, so kept configurable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SalaryRules {
    /// A range whose low end is below this while the high end is above it
    /// had its "k" dropped from the low end (`100-140k`).
    pub k_scale_threshold: i64,
    /// Values below this are read as hourly rates...
    pub hourly_floor: i64,
    /// ...and annualized with this factor.
    pub hourly_multiplier: i64,
    /// Anything not above this after scaling is not a salary.
    pub plausibility_floor: i64,
}

impl Default for SalaryRules {
    fn default() -> Self {
        SalaryRules {
            k_scale_threshold: 1000,
            hourly_floor: 200,
            hourly_multiplier: 2000,
            plausibility_floor: 50,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SalaryRange {
    pub min: i64,
    pub max: i64,
    pub currency: Currency,
}

impl SalaryRange {
    pub fn avg(&self) -> i64 {
        (self.min + self.max) / 2
    }
}

type Strategy = fn(&str, &SalaryRules) -> Option<(i64, i64)>;

/// Tried in order; the first strategy that yields a plausible value wins.
pub const STRATEGIES: &[(&str, Strategy)] = &[
    ("range", range),
    ("starting_at", starting_at),
    ("single", single_mention),
];

/// Salary mentioned in `text`, if any.
pub fn parse_salary(text: &str, rules: &SalaryRules) -> Option<SalaryRange> {
    if text.is_empty() {
        return None;
    }
    let lower = text.to_lowercase().replace(',', "");
    let (min, max) = STRATEGIES
        .iter()
        .find_map(|(_, strategy)| strategy(&lower, rules))?;
    Some(SalaryRange {
        min,
        max,
        currency: detect_currency(text),
    })
}

pub fn detect_currency(text: &str) -> Currency {
    let lower = text.to_lowercase();
    if text.contains('£') || GBP_RE.is_match(&lower) {
        Currency::Gbp
    } else if text.contains('€') || EUR_RE.is_match(&lower) {
        Currency::Eur
    } else {
        Currency::Usd
    }
}

/// `120k` -> 120000, `85000` -> 85000. Zero counts as no value.
fn parse_value(raw: &str) -> Option<i64> {
    let digits = raw
        .replace('k', "000")
        .replace(['$', '£', '€'], "");
    digits.parse::<i64>().ok().filter(|v| *v != 0)
}

fn annualize(value: i64, rules: &SalaryRules) -> i64 {
    if value < rules.hourly_floor {
        value * rules.hourly_multiplier
    } else {
        value
    }
}

fn range(lower: &str, rules: &SalaryRules) -> Option<(i64, i64)> {
    let caps = RANGE_RE.captures(lower)?;
    let mut min = parse_value(&caps[1])?;
    let mut max = parse_value(&caps[2])?;

    if min < rules.k_scale_threshold && max > rules.k_scale_threshold {
        min *= 1000;
    }
    if min < rules.hourly_floor {
        min *= rules.hourly_multiplier;
        max *= rules.hourly_multiplier;
    }
    (min > rules.plausibility_floor).then_some((min, max))
}

fn starting_at(lower: &str, rules: &SalaryRules) -> Option<(i64, i64)> {
    let caps = STARTING_AT_RE
        .captures(lower)
        .or_else(|| TRAILING_PLUS_RE.captures(lower))?;
    single_value(&caps[1], rules)
}

fn single_mention(lower: &str, rules: &SalaryRules) -> Option<(i64, i64)> {
    let caps = SINGLE_RE.captures(lower)?;
    single_value(&caps[1], rules)
}

fn single_value(raw: &str, rules: &SalaryRules) -> Option<(i64, i64)> {
    let value = annualize(parse_value(raw)?, rules);
    (value > rules.plausibility_floor).then_some((value, value))
}

// ── Tests ──
