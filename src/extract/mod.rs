//! Turns one sanitized comment into a structured record.
//!
//! Every extractor is a pure function of the comment text, so records can be
//! built in any order and in parallel.

pub mod company;
pub mod keywords;
pub mod role;
pub mod salary;
pub mod skills;

use std::sync::LazyLock;

use regex::Regex;

use crate::models::{RawComment, StructuredRecord};
use salary::SalaryRules;

static AI_MENTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"pytorch|llm|large language model").unwrap());

#[derive(Debug, Clone)]
pub struct ExtractionRules {
    pub salary: SalaryRules,
    pub company_name_max_len: usize,
}

impl Default for ExtractionRules {
    fn default() -> Self {
        ExtractionRules {
            salary: SalaryRules::default(),
            company_name_max_len: 50,
        }
    }
}

pub fn clean_text(raw: &str) -> &str {
    raw.trim()
}

pub fn extract_record(comment: &RawComment, rules: &ExtractionRules) -> StructuredRecord {
    let text = clean_text(&comment.raw_text);
    let lower = text.to_lowercase();

    let salary = salary::parse_salary(text, &rules.salary);
    let tech_stack = skills::extract_skills(text);
    let experience = keywords::experience(&lower);
    let location = keywords::location(&lower);
    let stage = keywords::stage(&lower);
    let compensation = keywords::compensation(&lower);

    let tech_combo_ai = tech_stack.contains("Python") && AI_MENTION_RE.is_match(&lower);
    let tech_combo_blockchain = tech_stack.contains("Rust") && stage.is_crypto;

    StructuredRecord {
        id: comment.id.clone(),
        date: comment.thread_date,
        raw_text: comment.raw_text.clone(),
        company_name: company::company_name(text, rules.company_name_max_len),
        role_title: company::role_title(text),
        salary_min: salary.map(|s| s.min),
        salary_max: salary.map(|s| s.max),
        salary_avg: salary.map(|s| s.avg()),
        currency: salary.map(|s| s.currency),
        is_remote: lower.contains("remote"),
        job_category: role::classify_role(text),
        tech_stack,
        is_senior: experience.is_senior,
        is_junior: experience.is_junior,
        is_manager: experience.is_manager,
        years_experience: experience.years_experience,
        is_tier_1_city: location.is_tier_1_city,
        is_europe: location.is_europe,
        is_global_remote: location.is_global_remote,
        is_yc: stage.is_yc,
        is_funded: stage.is_funded,
        is_crypto: stage.is_crypto,
        has_equity: compensation.has_equity,
        offers_visa: compensation.offers_visa,
        tech_combo_ai,
        tech_combo_blockchain,
    }
}

// ── Tests ──
