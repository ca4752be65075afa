//! Display-name normalization into URL-safe upper-case slugs.

/// Slug used when a name contains no ASCII letters or digits.
pub const FALLBACK_SLUG: &str = "ITEM";

/// Normalize a display name into an upper-case alphanumeric slug.
///
/// Runs of any other characters collapse into a single `-`, leading and
/// trailing separators are dropped, and an empty result becomes
/// [`FALLBACK_SLUG`].
pub fn slugify(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_dash = false;
    for c in name.trim().chars().flat_map(char::to_uppercase) {
        if c.is_ascii_uppercase() || c.is_ascii_digit() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            out.push(c);
            pending_dash = false;
        } else {
            pending_dash = true;
        }
    }
    if out.is_empty() {
        return FALLBACK_SLUG.to_string();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn collapses_runs_and_trims_separators() {
        assert_eq!(slugify("Aurora Watch"), "AURORA-WATCH");
        assert_eq!(slugify("  acme -- & co. "), "ACME-CO");
        assert_eq!(slugify("Zoë's  Shoes"), "ZO-S-SHOES");
    }

    #[test]
    fn empty_names_fall_back() {
        assert_eq!(slugify(""), FALLBACK_SLUG);
        assert_eq!(slugify("***"), FALLBACK_SLUG);
    }

    proptest! {
        #[test]
        fn slug_alphabet_is_closed(name in ".{0,64}") {
            let slug = slugify(&name);
            prop_assert!(!slug.is_empty());
            prop_assert!(slug.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-'));
            prop_assert!(!slug.starts_with('-') && !slug.ends_with('-'));
            prop_assert!(!slug.contains("--"));
        }

        #[test]
        fn slugify_is_idempotent(name in "[ -~]{0,64}") {
            let once = slugify(&name);
            prop_assert_eq!(slugify(&once), once);
        }
    }
}
