use std::collections::BTreeSet;
use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// One "Who is hiring?" thread, as found on the submissions list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thread {
    pub id: String,
    pub title: String,
    /// First day of the hiring month the thread covers.
    pub thread_date: NaiveDate,
    pub url: String,
}

/// A top-level reply inside a thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawComment {
    pub id: String,
    pub thread_date: NaiveDate,
    pub raw_text: String,
    pub user: String,
    pub url: String,
}

impl RawComment {
    /// (year, month) bucket used for repost detection.
    pub fn month_key(&self) -> (i32, u32) {
        (self.thread_date.year(), self.thread_date.month())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobCategory {
    #[serde(rename = "Data/AI")]
    DataAi,
    DevOps,
    Mobile,
    Frontend,
    Backend,
    Fullstack,
    General,
}

impl JobCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobCategory::DataAi => "Data/AI",
            JobCategory::DevOps => "DevOps",
            JobCategory::Mobile => "Mobile",
            JobCategory::Frontend => "Frontend",
            JobCategory::Backend => "Backend",
            JobCategory::Fullstack => "Fullstack",
            JobCategory::General => "General",
        }
    }
}

impl fmt::Display for JobCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Currency {
    #[serde(rename = "USD")]
    Usd,
    #[serde(rename = "GBP")]
    Gbp,
    #[serde(rename = "EUR")]
    Eur,
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Gbp => "GBP",
            Currency::Eur => "EUR",
        }
    }
}

/// Extraction output for one sanitized comment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructuredRecord {
    pub id: String,
    pub date: NaiveDate,
    pub raw_text: String,
    pub company_name: Option<String>,
    pub role_title: Option<String>,
    pub salary_min: Option<i64>,
    pub salary_max: Option<i64>,
    pub salary_avg: Option<i64>,
    pub currency: Option<Currency>,
    pub is_remote: bool,
    pub tech_stack: BTreeSet<String>,
    pub job_category: JobCategory,
    pub is_senior: bool,
    pub is_junior: bool,
    pub is_manager: bool,
    pub years_experience: Option<i32>,
    pub is_tier_1_city: bool,
    pub is_europe: bool,
    pub is_global_remote: bool,
    pub is_yc: bool,
    pub is_funded: bool,
    pub is_crypto: bool,
    pub has_equity: bool,
    pub offers_visa: bool,
    pub tech_combo_ai: bool,
    pub tech_combo_blockchain: bool,
}
