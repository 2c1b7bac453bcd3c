//! Canonical subject taxonomy.
//!
//! One label set serves both paths: LLM classification of asked questions (closed set,
//! unknown output falls back to [`FALLBACK_SUBJECT`]) and the spoken subject of a summary
//! request (open set, unknown names pass through in Title Case).

use once_cell::sync::Lazy;
use regex::Regex;

/// Labels the classifier may return.
pub const CANONICAL_SUBJECTS: &[&str] = &[
    "Mathematics",
    "Physics",
    "Chemistry",
    "Organic Chemistry",
    "Inorganic Chemistry",
    "Biology",
    "Botany",
    "Zoology",
    "Human Biology",
    "English",
    "Grammar",
    "Literature",
    "Composition",
    "History",
    "World History",
    "Indian History",
    "Ancient History",
    "Geography",
    "Computer Science",
    "Economics",
    "Political Science",
    "Social Studies",
    "Environmental Science",
    "General Science",
    "General Knowledge",
];

/// Label used when classification output matches nothing.
pub const FALLBACK_SUBJECT: &str = "General Knowledge";

/// Spoken variations, lowercase.
const ALIASES: &[(&str, &str)] = &[
    ("math", "Mathematics"),
    ("maths", "Mathematics"),
    ("algebra", "Mathematics"),
    ("geometry", "Mathematics"),
    ("trigonometry", "Mathematics"),
    ("calculus", "Mathematics"),
    ("statistics", "Mathematics"),
    ("programming", "Computer Science"),
    ("it", "Computer Science"),
    ("computers", "Computer Science"),
    ("science", "General Science"),
    ("gk", "General Knowledge"),
];

// Aliases this short only count as an exact match.
const MIN_SUBSTRING_ALIAS: usize = 3;

static REQUEST_PHRASES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)give me (?:the )?summary|i want (?:a )?summary|summary (?:of|on|for|about)")
        .expect("request phrase pattern")
});

static FILLERS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\b(?:uh|um|ah|er)\b").expect("filler pattern"));

static SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern"));

fn exact(cleaned: &str) -> Option<&'static str> {
    CANONICAL_SUBJECTS
        .iter()
        .copied()
        .find(|label| label.eq_ignore_ascii_case(cleaned))
        .or_else(|| ALIASES.iter().find(|(alias, _)| *alias == cleaned).map(|(_, l)| *l))
}

/// Longest known label or alias appearing as whole words inside `cleaned`.
fn contained(cleaned: &str) -> Option<&'static str> {
    let padded = format!(" {cleaned} ");
    let labels = CANONICAL_SUBJECTS.iter().map(|l| (l.to_lowercase(), *l));
    let aliases = ALIASES
        .iter()
        .filter(|(a, _)| a.len() >= MIN_SUBSTRING_ALIAS)
        .map(|(a, l)| (a.to_string(), *l));
    labels
        .chain(aliases)
        .filter(|(needle, _)| padded.contains(&format!(" {needle} ")))
        .max_by_key(|(needle, _)| needle.len())
        .map(|(_, label)| label)
}

fn clean(text: &str) -> String {
    let lower = text.to_lowercase();
    let stripped = REQUEST_PHRASES.replace_all(&lower, " ");
    let stripped = FILLERS.replace_all(&stripped, " ");
    let collapsed = SPACES.replace_all(&stripped, " ");
    collapsed
        .trim_matches(|c: char| c.is_whitespace() || ".,!?;:".contains(c))
        .to_string()
}

fn title_case(s: &str) -> String {
    s.split(' ')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Subject label from a spoken summary request. `None` when nothing usable was said.
pub fn extract_subject_name(transcript: &str) -> Option<String> {
    let cleaned = clean(transcript);
    if cleaned.is_empty() {
        return None;
    }
    if let Some(label) = exact(&cleaned).or_else(|| contained(&cleaned)) {
        return Some(label.to_string());
    }
    Some(title_case(&cleaned))
}

/// Map raw classifier output onto the canonical label set.
pub fn normalize_label(raw: &str) -> String {
    let cleaned = raw
        .trim()
        .trim_matches(|c: char| c == '"' || c == '\'' || c == '*' || c == '`')
        .trim_end_matches(|c: char| ".,!?;:".contains(c))
        .trim()
        .to_lowercase();
    let cleaned = SPACES.replace_all(&cleaned, " ");
    exact(&cleaned)
        .or_else(|| contained(&cleaned))
        .unwrap_or(FALLBACK_SUBJECT)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patterns_compile() {
        assert!(REQUEST_PHRASES.is_match("I want a summary"));
        assert!(FILLERS.is_match("um"));
        assert_eq!(SPACES.replace_all("a \t b", " "), "a b");
    }

    #[test]
    fn request_phrases_and_fillers_are_removed() {
        assert_eq!(extract_subject_name("Give me the summary of physics.").as_deref(), Some("Physics"));
        assert_eq!(extract_subject_name("um, maths").as_deref(), Some("Mathematics"));
        assert_eq!(extract_subject_name("I want a summary on uh world history").as_deref(), Some("World History"));
    }

    #[test]
    fn fillers_only_match_whole_words() {
        assert_eq!(extract_subject_name("literature").as_deref(), Some("Literature"));
        assert_eq!(extract_subject_name("Herbology").as_deref(), Some("Herbology"));
    }

    #[test]
    fn unknown_subject_is_title_cased() {
        assert_eq!(extract_subject_name("music theory!").as_deref(), Some("Music Theory"));
    }

    #[test]
    fn substring_prefers_longest_label() {
        assert_eq!(extract_subject_name("my organic chemistry questions").as_deref(), Some("Organic Chemistry"));
        assert_eq!(extract_subject_name("what about it").as_deref(), Some("What About It"));
    }

    #[test]
    fn empty_transcript_yields_none() {
        assert_eq!(extract_subject_name("  um... "), None);
        assert_eq!(extract_subject_name("give me summary"), None);
    }

    #[test]
    fn classifier_output_normalizes_to_closed_set() {
        assert_eq!(normalize_label("Physics"), "Physics");
        assert_eq!(normalize_label("\"computer science\"\n"), "Computer Science");
        assert_eq!(normalize_label("Subject: Indian History."), "Indian History");
        assert_eq!(normalize_label("Astrology"), FALLBACK_SUBJECT);
        assert_eq!(normalize_label(""), FALLBACK_SUBJECT);
    }

    #[test]
    fn every_alias_targets_a_canonical_label() {
        for (_, label) in ALIASES {
            assert!(CANONICAL_SUBJECTS.contains(label), "{label}");
        }
    }
}
