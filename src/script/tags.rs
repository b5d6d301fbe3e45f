use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::warn;

static MARKUP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());
static PLACEHOLDER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<TAG\d+>").unwrap());

/// Placeholder tokens and the markup each one stands for, in creation order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaceholderMap {
    entries: Vec<(String, String)>,
}

/// What a restore pass could not resolve
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreReport {
    /// Placeholders that never came back from the translation
    pub missing: Vec<String>,
    /// Placeholder-shaped tokens with no entry in the map
    pub unknown: Vec<String>,
}

impl RestoreReport {
    pub fn is_clean(&self) -> bool {
        self.missing.is_empty() && self.unknown.is_empty()
    }
}

impl PlaceholderMap {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, token: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key == token)
            .map(|(_, markup)| markup.as_str())
    }

    fn push(&mut self, markup: &str) -> String {
        let token = format!("<TAG{}>", self.entries.len());
        self.entries.push((token.clone(), markup.to_string()));
        token
    }

    /// Put the original markup back in place of every known placeholder.
    ///
    /// Runs as a single pass over the text, so restored markup is never
    /// rescanned for placeholders.
    pub fn restore_with_report(&self, safe: &str) -> (String, RestoreReport) {
        let mut seen = vec![false; self.entries.len()];
        let mut unknown = Vec::new();

        let restored = PLACEHOLDER_RE.replace_all(safe, |caps: &Captures| {
            let token = &caps[0];
            match self.entries.iter().position(|(key, _)| key == token) {
                Some(index) => {
                    seen[index] = true;
                    self.entries[index].1.clone()
                }
                None => {
                    unknown.push(token.to_string());
                    token.to_string()
                }
            }
        });
        let restored = restored.into_owned();

        let missing = self
            .entries
            .iter()
            .zip(&seen)
            .filter(|(_, seen)| !**seen)
            .map(|((key, _), _)| key.clone())
            .collect();

        (restored, RestoreReport { missing, unknown })
    }

    /// Restore placeholders, logging anything that could not be resolved
    pub fn restore(&self, safe: &str) -> String {
        let (restored, report) = self.restore_with_report(safe);
        if !report.missing.is_empty() {
            warn!("Placeholders missing from translated text: {:?}", report.missing);
        }
        if !report.unknown.is_empty() {
            warn!("Unknown placeholders left in translated text: {:?}", report.unknown);
        }
        restored
    }
}

/// Swap every inline markup span for an opaque placeholder
pub fn protect(text: &str) -> (String, PlaceholderMap) {
    let mut map = PlaceholderMap::default();
    let safe = MARKUP_RE
        .replace_all(text, |caps: &Captures| map.push(&caps[0]))
        .into_owned();
    (safe, map)
}

/// Inverse of [`protect`]
pub fn restore(safe: &str, map: &PlaceholderMap) -> String {
    map.restore(safe)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_without_markup() {
        let text = "【ミナト】\\r\\nこんにちは";
        let (safe, map) = protect(text);
        assert_eq!(safe, text);
        assert!(map.is_empty());
        assert_eq!(restore(&safe, &map), text);
    }

    #[test]
    fn test_round_trip_single_and_multiple() {
        let single = "見ろ<sprite name=heart>";
        let (safe, map) = protect(single);
        assert_eq!(safe, "見ろ<TAG0>");
        assert_eq!(map.get("<TAG0>"), Some("<sprite name=heart>"));
        assert_eq!(restore(&safe, &map), single);

        let multiple = "<L>左<R> and <r=腰>枯死</r>";
        let (safe, map) = protect(multiple);
        assert_eq!(safe, "<TAG0>左<TAG1> and <TAG2>枯死<TAG3>");
        assert_eq!(map.len(), 4);
        assert_eq!(restore(&safe, &map), multiple);
    }

    #[test]
    fn test_round_trip_adjacent_markup() {
        let text = "<a><b></b></a>";
        let (safe, map) = protect(text);
        assert_eq!(safe, "<TAG0><TAG1><TAG2><TAG3>");
        assert_eq!(restore(&safe, &map), text);
    }

    #[test]
    fn test_restore_is_single_pass() {
        // The original markup looks like a later placeholder
        let text = "<TAG1>x<b>";
        let (safe, map) = protect(text);
        assert_eq!(safe, "<TAG0>x<TAG1>");
        assert_eq!(restore(&safe, &map), text);
    }

    #[test]
    fn test_restore_ignores_stray_angle_brackets() {
        let (safe, map) = protect("1<i>2</i>");
        assert_eq!(safe, "1<TAG0>2<TAG1>");
        assert_eq!(map.restore("1 < <TAG0>2<TAG1>"), "1 < <i>2</i>");
    }

    #[test]
    fn test_restore_reports_leaks() {
        let (_, map) = protect("<a>one<b>");
        let (restored, report) = map.restore_with_report("<TAG0>uno <TAG7>");

        assert_eq!(restored, "<a>uno <TAG7>");
        assert_eq!(report.missing, vec!["<TAG1>".to_string()]);
        assert_eq!(report.unknown, vec!["<TAG7>".to_string()]);
        assert!(!report.is_clean());
    }
}
