//! Requirement identity matching.
//!
//! Views display requirements as `"<item> - <name>"`. Resolving such a title
//! back to a requirement first looks for an exact compound title, which covers
//! legacy identifiers that themselves contain `" - "`, then falls back to the
//! structured identifier in front of the first separator so renamed
//! requirements still match.

use crate::Requirement;

const TITLE_SEPARATOR: &str = " - ";

pub fn find_by_item(requirements: &[Requirement], item: &str) -> Option<usize> {
    let item = item.trim();
    if item.is_empty() {
        return None;
    }
    requirements.iter().position(|r| r.item == item)
}

/// Leading identifier of a displayed title, or the whole title when it has no
/// separator.
pub fn title_identifier(title: &str) -> &str {
    let title = title.trim();
    match title.split_once(TITLE_SEPARATOR) {
        Some((item, _)) => item.trim(),
        None => title,
    }
}

pub fn match_displayed_title(requirements: &[Requirement], title: &str) -> Option<usize> {
    let title = title.trim();
    if title.is_empty() {
        return None;
    }

    // An exact compound title wins, so `"SYS - 7 - Legacy"` resolves to item
    // `SYS - 7` even when an item `SYS` also exists.
    if let Some(ix) = requirements.iter().position(|r| r.display_title() == title) {
        return Some(ix);
    }

    find_by_item(requirements, title_identifier(title))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<Requirement> {
        vec![
            Requirement::new("R-1", "Alpha"),
            Requirement::new("R-2", "Beta"),
            Requirement::new("SYS - 7", "Legacy"),
        ]
    }

    #[test]
    fn structured_identifier_wins() {
        assert_eq!(match_displayed_title(&sample(), "R-2 - Beta"), Some(1));
        // Name drift does not break the match: identity is the item.
        assert_eq!(match_displayed_title(&sample(), "R-2 - Renamed"), Some(1));
    }

    #[test]
    fn bare_identifier_matches() {
        assert_eq!(match_displayed_title(&sample(), "  R-1 "), Some(0));
    }

    #[test]
    fn compound_fallback_for_legacy_items() {
        assert_eq!(match_displayed_title(&sample(), "SYS - 7 - Legacy"), Some(2));
    }

    #[test]
    fn exact_compound_title_beats_shorter_identifier() {
        let mut reqs = sample();
        reqs.push(Requirement::new("SYS", "System"));
        assert_eq!(match_displayed_title(&reqs, "SYS - 7 - Legacy"), Some(2));
        assert_eq!(match_displayed_title(&reqs, "SYS - System"), Some(3));
        assert_eq!(match_displayed_title(&reqs, "SYS - Renamed"), Some(3));
    }

    #[test]
    fn unknown_or_blank_titles_do_not_match() {
        assert_eq!(match_displayed_title(&sample(), "R-9 - Gamma"), None);
        assert_eq!(match_displayed_title(&sample(), "   "), None);
        assert_eq!(find_by_item(&sample(), ""), None);
    }
}
