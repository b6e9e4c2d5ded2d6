use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Where lessons can happen, shared by student and teacher profiles and requirements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeachingMode {
    Online,
    Offline,
    Both,
}

impl TeachingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TeachingMode::Online => "online",
            TeachingMode::Offline => "offline",
            TeachingMode::Both => "both",
        }
    }
}

impl FromStr for TeachingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "online" => Ok(TeachingMode::Online),
            "offline" => Ok(TeachingMode::Offline),
            "both" => Ok(TeachingMode::Both),
            other => Err(format!("Invalid teaching mode: {}", other)),
        }
    }
}

impl fmt::Display for TeachingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trims entries, drops blanks and removes case-insensitive duplicates, keeping first spelling.
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    let mut normalized = Vec::new();
    for tag in tags {
        let trimmed = tag.trim();
        if trimmed.is_empty() {
            continue;
        }
        let key = trimmed.to_lowercase();
        if !seen.contains(&key) {
            seen.push(key);
            normalized.push(trimmed.to_string());
        }
    }
    normalized
}

/// Trims and turns blank strings into `None`.
pub fn clean_optional(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// `LIKE` pattern matching `term` anywhere, with wildcard characters escaped.
pub fn contains_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_are_trimmed_and_deduplicated() {
        let tags = vec![
            " Maths ".to_string(),
            "physics".to_string(),
            "maths".to_string(),
            "  ".to_string(),
        ];
        assert_eq!(normalize_tags(&tags), vec!["Maths", "physics"]);
    }

    #[test]
    fn teaching_mode_parses_any_case() {
        assert_eq!("Online".parse::<TeachingMode>(), Ok(TeachingMode::Online));
        assert!("hybrid".parse::<TeachingMode>().is_err());
    }

    #[test]
    fn like_wildcards_in_terms_match_literally() {
        assert_eq!(contains_pattern("_"), "%\\_%");
        assert_eq!(contains_pattern("100%"), "%100\\%%");
        assert_eq!(contains_pattern("a\\b"), "%a\\\\b%");
        assert_eq!(contains_pattern("maths"), "%maths%");
    }

    #[test]
    fn blank_optional_strings_become_none() {
        assert_eq!(clean_optional(&Some("  ".into())), None);
        assert_eq!(clean_optional(&Some(" Pune ".into())), Some("Pune".into()));
    }
}
