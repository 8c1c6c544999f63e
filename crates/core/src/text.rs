//! Free-text normalization applied on write.

/// Collapse every run of consecutive whitespace into a single space.
///
/// Leading and trailing runs are collapsed as well but not removed.
pub fn normalize_title(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut in_space = false;
    for ch in raw.chars() {
        if ch.is_whitespace() {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(ch);
            in_space = false;
        }
    }
    out
}

/// Records with a normalized free-text title.
pub trait Titled {
    fn title(&self) -> &str;

    /// Store the title verbatim. Prefer [`Titled::set_title`].
    fn set_title_raw(&mut self, title: String);

    fn set_title(&mut self, title: &str) {
        self.set_title_raw(normalize_title(title));
    }

    /// Re-apply normalization to the current value (write hook).
    fn normalize_title(&mut self) {
        let normalized = normalize_title(self.title());
        if normalized != self.title() {
            self.set_title_raw(normalized);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn collapses_double_space() {
        assert_eq!(normalize_title("a  b"), "a b");
    }

    #[test]
    fn collapses_mixed_whitespace_runs() {
        assert_eq!(normalize_title("Main\t \n Dining   Room"), "Main Dining Room");
        assert_eq!(normalize_title("  edge  "), " edge ");
    }

    #[test]
    fn single_spaces_untouched() {
        assert_eq!(normalize_title("Day Care"), "Day Care");
        assert_eq!(normalize_title(""), "");
    }

    proptest! {
        #[test]
        fn normalization_is_idempotent(s in "[ a-z\t\n]{0,40}") {
            let once = normalize_title(&s);
            prop_assert_eq!(normalize_title(&once), once.clone());
            prop_assert!(!once.contains("  "));
        }
    }
}
