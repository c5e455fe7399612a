use crate::models::JobCategory;

/// Checked top to bottom; the first category with a matching keyword wins.
pub const ROLE_CASCADE: &[(JobCategory, &[&str])] = &[
    (
        JobCategory::DataAi,
        &[
            "machine learning",
            "ai",
            "data scientist",
            "data engineer",
            "computer vision",
            "nlp",
        ],
    ),
    (
        JobCategory::DevOps,
        &[
            "devops",
            "sre",
            "site reliability",
            "kubernetes",
            "platform engineer",
            "infrastructure",
        ],
    ),
    (
        JobCategory::Mobile,
        &["ios", "android", "swift", "kotlin", "mobile"],
    ),
    (
        JobCategory::Frontend,
        &[
            "frontend",
            "front-end",
            "react",
            "vue",
            "angular",
            "ui/ux",
            "web developer",
        ],
    ),
    (
        JobCategory::Backend,
        &[
            "backend",
            "back-end",
            "java",
            "go",
            "rust",
            "api",
            "distributed systems",
            "scala",
            "ruby",
            "php",
        ],
    ),
    (JobCategory::Fullstack, &["fullstack", "full-stack"]),
];

pub fn classify_role(text: &str) -> JobCategory {
    let lower = text.to_lowercase();
    ROLE_CASCADE
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(category, _)| *category)
        .unwrap_or(JobCategory::General)
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cascade_order() {
        let order: Vec<JobCategory> = ROLE_CASCADE.iter().map(|(c, _)| *c).collect();
        assert_eq!(
            order,
            vec![
                JobCategory::DataAi,
                JobCategory::DevOps,
                JobCategory::Mobile,
                JobCategory::Frontend,
                JobCategory::Backend,
                JobCategory::Fullstack,
            ]
        );
    }

    #[test]
    fn earlier_category_wins() {
        assert_eq!(
            classify_role("React frontend deployed on Kubernetes"),
            JobCategory::DevOps
        );
        assert_eq!(
            classify_role("NLP researcher, Python backend"),
            JobCategory::DataAi
        );
    }

    #[test]
    fn single_category() {
        assert_eq!(classify_role("Senior iOS developer"), JobCategory::Mobile);
        assert_eq!(classify_role("Vue.js wizard"), JobCategory::Frontend);
        assert_eq!(classify_role("Full-Stack Engineer"), JobCategory::Fullstack);
    }

    #[test]
    fn fallback_is_general() {
        assert_eq!(classify_role("Office manager, NYC"), JobCategory::General);
        assert_eq!(classify_role(""), JobCategory::General);
    }
}
