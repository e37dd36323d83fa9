//! Shared string canonicalization for the employer and job normalizers.

pub mod employers;
pub mod jobs;

use once_cell::sync::Lazy;
use regex::Regex;

static EMPLOYER_STRIP: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Z0-9\s-]").unwrap());
static JOB_STRIP: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Z0-9\s/]").unwrap());

/// Canonical cleanup for employer names: uppercase, strip punctuation
/// (keeping digits and dashes), collapse runs of whitespace.
pub fn clean_employer_name(raw: &str) -> String {
    let upper = raw.to_uppercase();
    let stripped = EMPLOYER_STRIP.replace_all(&upper, "");
    collapse_whitespace(&stripped)
}

/// Canonical cleanup for job titles. Slashes are meaningful in titles
/// ("CLERK/TYPIST") so they survive, but spacing around them does not.
pub fn clean_job_title(raw: &str) -> String {
    let upper = raw
        .to_uppercase()
        .replace(" / ", "/")
        .replace(" - ", " ")
        .replace(',', " ");
    let stripped = JOB_STRIP.replace_all(&upper, "");
    collapse_whitespace(&stripped)
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_employer_name_casing_and_punctuation() {
        assert_eq!(clean_employer_name("City of Toronto"), "CITY OF TORONTO");
        assert_eq!(clean_employer_name("City Of  Toronto"), "CITY OF TORONTO");
        assert_eq!(clean_employer_name("St. Mary's Hospital"), "ST MARYS HOSPITAL");
    }

    #[test]
    fn test_clean_employer_name_keeps_digits_and_dashes() {
        assert_eq!(clean_employer_name("District 12 - East"), "DISTRICT 12 - EAST");
    }

    #[test]
    fn test_clean_job_title_slash_handling() {
        assert_eq!(clean_job_title("Clerk / Typist"), "CLERK/TYPIST");
        assert_eq!(clean_job_title("Teacher, Elementary"), "TEACHER ELEMENTARY");
        assert_eq!(clean_job_title("Nurse - ICU"), "NURSE ICU");
    }
}
