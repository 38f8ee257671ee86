//! Canonicalisation of free-text job titles.
//!
//! Raw credits come in many spellings ("1st Assistant Camera", "A Camera
//! Operator", "Camera Operator: second unit"). [`normalize_job_titles`] runs a
//! fixed sequence of rewrite steps over the list. A step that matches nothing
//! leaves the entry untouched, so normalisation never fails.

use std::{collections::HashSet, sync::OnceLock};

use regex::Regex;

/// Canonical titles, highest priority first.
pub const CANONICAL_JOB_TITLES: &[&str] = &[
    "first assistant camera",
    "second assistant camera",
    "lead assistant camera",
    "assistant camera",
    "camera operator",
    "director of photography",
    "camera utility",
    "steadicam operator",
    "additional camera operator",
    "best boy electric",
    "key grip",
    "lighting director",
];

type Step = fn(Vec<String>) -> Vec<String>;

const STEPS: &[Step] = &[
    split_multi_credits,
    drop_dash_qualifier,
    drop_colon_qualifier,
    canonicalize,
    strip_noise_prefixes,
    drop_aliases,
];

pub fn normalize_job_titles<S: AsRef<str>>(raw: &[S]) -> Vec<String> {
    let list = raw.iter().map(|s| s.as_ref().trim().to_string()).filter(|s| !s.is_empty()).collect();
    let list = STEPS.iter().fold(list, |list, step| step(list));
    dedup(list)
}

/// `"a) / (b"` and `"a / b"` both encode two credits in one entry.
fn split_multi_credits(list: Vec<String>) -> Vec<String> {
    let out = list
        .into_iter()
        .flat_map(|job| {
            job.split(") / (")
                .flat_map(|part| part.split(" / "))
                .map(|part| part.trim_matches(|c| c == '(' || c == ')').trim().to_string())
                .filter(|part| !part.is_empty())
                .collect::<Vec<_>>()
        })
        .collect();
    dedup(out)
}

fn drop_dash_qualifier(list: Vec<String>) -> Vec<String> {
    truncate_at(list, " - ")
}

fn drop_colon_qualifier(list: Vec<String>) -> Vec<String> {
    truncate_at(list, ": ")
}

fn truncate_at(list: Vec<String>, marker: &str) -> Vec<String> {
    let out = list
        .into_iter()
        .map(|job| match job.split_once(marker) {
            Some((head, _)) => head.trim_end().to_string(),
            None => job,
        })
        .collect();
    dedup(out)
}

/// Entries whose words match a canonical title (ignoring case and order) are
/// replaced by the canonical spelling and moved to the end in priority order.
fn canonicalize(list: Vec<String>) -> Vec<String> {
    let canonical: Vec<HashSet<String>> =
        CANONICAL_JOB_TITLES.iter().map(|title| word_set(title)).collect();

    let mut kept = Vec::new();
    let mut matched = Vec::new();
    for job in list {
        let words = word_set(&job);
        match canonical.iter().position(|c| *c == words) {
            Some(idx) => {
                if !matched.contains(&idx) {
                    matched.push(idx);
                }
            },
            None => kept.push(job),
        }
    }
    matched.sort_unstable();
    kept.extend(matched.into_iter().map(|idx| CANONICAL_JOB_TITLES[idx].to_string()));
    kept
}

fn word_set(text: &str) -> HashSet<String> {
    text.split_whitespace()
        .map(|w| {
            let w = w.to_lowercase();
            match w.as_str() {
                "1st" => "first".to_string(),
                "2nd" => "second".to_string(),
                _ => w,
            }
        })
        .collect()
}

fn strip_noise_prefixes(list: Vec<String>) -> Vec<String> {
    static QUOTED_UNIT: OnceLock<Regex> = OnceLock::new();
    static UNIT: OnceLock<Regex> = OnceLock::new();
    let quoted = QUOTED_UNIT.get_or_init(|| {
        Regex::new(r#"^"[a-fA-F]" "#).expect("Invalid regex pattern defined in code")
    });
    let unit = UNIT
        .get_or_init(|| Regex::new(r"^[a-fA-F] ").expect("Invalid regex pattern defined in code"));

    let out = list
        .into_iter()
        .map(|job| {
            if quoted.is_match(&job) {
                job[4..].to_string()
            } else if unit.is_match(&job) {
                job[2..].to_string()
            } else if job.starts_with("Additional ") || job.starts_with("additional ") {
                job["additional ".len()..].to_string()
            } else {
                job
            }
        })
        .filter(|job| !job.is_empty())
        .collect();
    dedup(out)
}

/// "as Himself" and similar are character credits, not jobs.
fn drop_aliases(list: Vec<String>) -> Vec<String> {
    list.into_iter().filter(|job| !(job.starts_with("as ") || job.starts_with("As "))).collect()
}

fn dedup(list: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    list.into_iter().filter(|job| seen.insert(job.clone())).collect()
}

const LOWERCASE_WORDS: &[&str] = &["the", "of", "or", "a"];

/// Title-cases a job label for export, keeping short connectives lower case.
pub fn title_case(text: &str) -> String {
    text.to_lowercase()
        .split_whitespace()
        .map(|word| {
            if LOWERCASE_WORDS.contains(&word) {
                word.to_string()
            } else {
                capitalize_word(word)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Upper-cases every letter that follows a non-letter ("first-unit" becomes
/// "First-Unit").
fn capitalize_word(word: &str) -> String {
    let mut out = String::with_capacity(word.len());
    let mut prev_alpha = false;
    for c in word.chars() {
        if c.is_alphabetic() && !prev_alpha {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        prev_alpha = c.is_alphabetic();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordinal_spelling_is_canonicalised_once() {
        let out = normalize_job_titles(&["1st Assistant Camera", "First Assistant Camera"]);
        assert_eq!(out, vec!["first assistant camera"]);
    }

    #[test]
    fn additional_prefix_is_stripped_after_canonicalising() {
        assert_eq!(normalize_job_titles(&["Additional Camera Operator"]), vec!["camera operator"]);
    }

    #[test]
    fn multi_credit_entries_are_split() {
        let out = normalize_job_titles(&["key grip) / (best boy electric"]);
        assert_eq!(out, vec!["best boy electric", "key grip"]);

        let out = normalize_job_titles(&["Camera Utility / Loader"]);
        assert_eq!(out, vec!["Loader", "camera utility"]);
    }

    #[test]
    fn qualifiers_after_dash_or_colon_are_dropped() {
        let out = normalize_job_titles(&["Steadicam Operator - second unit", "camera operator: ep 4"]);
        assert_eq!(out, vec!["camera operator", "steadicam operator"]);
    }

    #[test]
    fn canonical_entries_move_to_the_end_in_priority_order() {
        let out = normalize_job_titles(&["camera operator", "video assist", "first assistant camera"]);
        assert_eq!(out, vec!["video assist", "first assistant camera", "camera operator"]);
    }

    #[test]
    fn unit_markers_are_stripped() {
        assert_eq!(normalize_job_titles(&["A camera loader"]), vec!["camera loader"]);
        assert_eq!(normalize_job_titles(&["\"B\" camera loader"]), vec!["camera loader"]);
    }

    #[test]
    fn aliases_are_dropped() {
        assert!(normalize_job_titles(&["as Himself"]).is_empty());
        assert!(normalize_job_titles(&["As Cameraman"]).is_empty());
    }

    #[test]
    fn unmatched_entries_pass_through() {
        assert_eq!(normalize_job_titles(&["Drone Pilot"]), vec!["Drone Pilot"]);
    }

    #[test]
    fn title_case_keeps_connectives_lower() {
        assert_eq!(title_case("director of photography"), "Director of Photography");
        assert_eq!(title_case("CAMERA AND ELECTRICAL DEPARTMENT"), "Camera And Electrical Department");
        assert_eq!(title_case("a camera first-unit"), "a Camera First-Unit");
    }
}
