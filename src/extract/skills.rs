use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

/// Canonical skill name and the surface forms that count as a mention.
pub const SKILL_KEYWORDS: &[(&str, &[&str])] = &[
    ("Python", &["python", "py"]),
    (
        "JavaScript",
        &["javascript", "js", "es6", "node.js", "nodejs", "typescript", "ts"],
    ),
    ("React", &["react", "reactjs", "react.js"]),
    ("Vue", &["vue", "vuejs", "vue.js"]),
    ("Angular", &["angular", "angularjs"]),
    ("Java", &["java", "jvm"]),
    ("C++", &["c++", "cpp"]),
    ("C#", &["c#", "csharp", ".net", "dotnet"]),
    ("Go", &["golang", "go"]),
    ("Rust", &["rust"]),
    ("Ruby", &["ruby", "rails"]),
    ("PHP", &["php", "laravel"]),
    ("SQL", &["sql", "mysql", "postgresql", "postgres"]),
    ("NoSQL", &["nosql", "mongodb", "mongo", "cassandra", "redis"]),
    (
        "AWS",
        &["aws", "amazon web services", "ec2", "lambda", "s3"],
    ),
    ("GCP", &["gcp", "google cloud"]),
    ("Azure", &["azure"]),
    ("Docker", &["docker"]),
    ("Kubernetes", &["kubernetes", "k8s"]),
    ("Terraform", &["terraform"]),
    (
        "Linux",
        &["linux", "unix", "ubuntu", "debian", "centos", "redhat"],
    ),
    ("Git", &["git", "github", "gitlab"]),
    (
        "Machine Learning",
        &[
            "machine learning",
            "ml",
            "tensorflow",
            "pytorch",
            "scikit-learn",
            "sklearn",
            "keras",
        ],
    ),
    ("Deep Learning", &["deep learning", "dl", "neural network"]),
    (
        "Data Science",
        &["data science", "data scientist", "pandas", "numpy"],
    ),
    ("Big Data", &["big data", "hadoop", "spark", "kafka"]),
    ("iOS", &["ios", "swift", "objective-c"]),
    ("Android", &["android", "kotlin"]),
    ("Flutter", &["flutter", "dart"]),
    ("React Native", &["react native"]),
];

static SKILL_PATTERNS: LazyLock<Vec<(&'static str, Vec<Regex>)>> = LazyLock::new(|| {
    SKILL_KEYWORDS
        .iter()
        .map(|(skill, variants)| {
            let patterns = variants
                .iter()
                .map(|v| Regex::new(&whole_word(v)).unwrap())
                .collect();
            (*skill, patterns)
        })
        .collect()
});

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// `\b` only makes sense next to a word character, so `c++` and `.net`
/// get a boundary on their alphanumeric side only.
fn whole_word(variant: &str) -> String {
    let starts = variant.chars().next().is_some_and(is_word_char);
    let ends = variant.chars().last().is_some_and(is_word_char);
    format!(
        "{}{}{}",
        if starts { r"\b" } else { "" },
        regex::escape(variant),
        if ends { r"\b" } else { "" }
    )
}

/// Canonical names of every skill mentioned in `text`.
pub fn extract_skills(text: &str) -> BTreeSet<String> {
    let lower = text.to_lowercase();
    SKILL_PATTERNS
        .iter()
        .filter(|(_, patterns)| patterns.iter().any(|re| re.is_match(&lower)))
        .map(|(skill, _)| skill.to_string())
        .collect()
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_word_match() {
        assert!(extract_skills("javascript engineer").contains("JavaScript"));
        assert!(!extract_skills("ecmascript").contains("JavaScript"));
        assert!(!extract_skills("We love mongoose").contains("NoSQL"));
    }

    #[test]
    fn symbol_variants() {
        let skills = extract_skills("Modern C++ and .NET shop, some C# too");
        assert!(skills.contains("C++"));
        assert!(skills.contains("C#"));
    }

    #[test]
    fn every_skill_checked_independently() {
        let skills = extract_skills("Golang, Postgres, Kafka on AWS (EC2) with k8s");
        let expected: BTreeSet<String> = ["AWS", "Big Data", "Go", "Kubernetes", "SQL"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(skills, expected);
    }

    #[test]
    fn nothing_found() {
        assert!(extract_skills("").is_empty());
        assert!(extract_skills("We sell shoes").is_empty());
    }
}
