//! Slug rules shared by topics and courses
//!
//! A slug is one or more ASCII letters, digits, hyphens or underscores.

use once_cell::sync::Lazy;
use regex::Regex;

/// Maximum slug length, matching the column width
pub const MAX_SLUG_LEN: usize = 100;

static SLUG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[-a-zA-Z0-9_]+$").expect("valid regex literal"));

/// Whether `slug` is a valid slug
pub fn is_valid_slug(slug: &str) -> bool {
    slug.len() <= MAX_SLUG_LEN && SLUG_RE.is_match(slug)
}

/// Derive a slug from a title.
///
/// Lowercases, turns every run of other characters into a single hyphen
/// and trims hyphens from both ends. Non-ASCII letters are dropped, so the
/// result can be empty.
pub fn generate_slug(title: &str) -> String {
    let mut result = String::with_capacity(title.len());
    let mut prev_hyphen = true;

    for c in title.chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            result.push(c.to_ascii_lowercase());
            prev_hyphen = false;
        } else if !prev_hyphen {
            result.push('-');
            prev_hyphen = true;
        }
    }

    let trimmed = result.trim_end_matches('-');
    let mut slug = trimmed.to_string();
    slug.truncate(MAX_SLUG_LEN);
    slug.trim_end_matches('-').to_string()
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn accepts_slug_alphabet(slug in "[-a-zA-Z0-9_]{1,100}") {
            prop_assert!(is_valid_slug(&slug));
        }

        #[test]
        fn rejects_any_other_character(
            prefix in "[-a-z0-9_]{0,10}",
            bad in "[^-a-zA-Z0-9_]",
            suffix in "[-a-z0-9_]{0,10}",
        ) {
            let slug = format!("{}{}{}", prefix, bad, suffix);
            prop_assert!(!is_valid_slug(&slug));
        }

        #[test]
        fn generated_slugs_are_valid_or_empty(title in "\\PC{0,60}") {
            let slug = generate_slug(&title);
            prop_assert!(slug.is_empty() || is_valid_slug(&slug));
        }
    }
}
