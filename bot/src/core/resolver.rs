//! Fuzzy resolution of noisy OCR text against the known roster.

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Score a resolution must reach to be trusted without a second OCR pass.
pub const ACCEPT_SCORE: f64 = 0.79;

/// Immutable roster entry loaded once at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub id: String,
    pub name: String,
    pub category: String,
    pub rarity: u8,
}

/// Best roster match for a piece of text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolution {
    pub name: String,
    pub score: f64,
}

impl Resolution {
    pub fn is_confident(&self) -> bool {
        self.score >= ACCEPT_SCORE
    }
}

/// Which read a two-pass resolution keeps when neither clears [`ACCEPT_SCORE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    /// Keep the thresholded (first) read.
    First,
    /// Keep the unthresholded (second) read regardless of score.
    Second,
}

/// Jaro-Winkler matcher over roster names.
#[derive(Debug, Clone)]
pub struct EntityResolver {
    entries: Vec<RosterEntry>,
}

impl EntityResolver {
    pub fn new(entries: Vec<RosterEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[RosterEntry] {
        &self.entries
    }

    /// Look up an entry by exact name.
    pub fn entry(&self, name: &str) -> Option<&RosterEntry> {
        self.entries.iter().find(|entry| entry.name == name)
    }

    /// Return the highest-scoring roster name for `text`.
    ///
    /// Ties keep the earliest roster entry. Returns `None` only for an empty
    /// roster; an empty `text` scores 0.0 against every name and therefore
    /// yields the first entry.
    pub fn resolve(&self, text: &str) -> Option<Resolution> {
        let text = text.trim();
        let mut best: Option<Resolution> = None;
        for entry in &self.entries {
            let score = strsim::jaro_winkler(text, &entry.name);
            let better = match &best {
                Some(current) => score > current.score,
                None => true,
            };
            if better {
                best = Some(Resolution {
                    name: entry.name.clone(),
                    score,
                });
            }
        }
        best
    }

    /// Resolve with the two-pass OCR policy.
    ///
    /// `first` is the thresholded read. `second_read` is only invoked when the
    /// first resolution scores below [`ACCEPT_SCORE`]; its result wins when it
    /// clears the threshold, otherwise `fallback` picks the survivor.
    pub fn resolve_two_pass<F>(
        &self,
        first: &str,
        second_read: F,
        fallback: Fallback,
    ) -> Result<Option<Resolution>>
    where
        F: FnOnce() -> Result<String>,
    {
        let first = self.resolve(first);
        if first.as_ref().is_some_and(Resolution::is_confident) {
            return Ok(first);
        }
        let second = self.resolve(&second_read()?);
        if second.as_ref().is_some_and(Resolution::is_confident) {
            return Ok(second);
        }
        Ok(match fallback {
            Fallback::First => first,
            Fallback::Second => second,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    fn entry(id: &str, name: &str) -> RosterEntry {
        RosterEntry {
            id: id.to_string(),
            name: name.to_string(),
            category: "AR".to_string(),
            rarity: 4,
        }
    }

    fn resolver() -> EntityResolver {
        EntityResolver::new(vec![
            entry("1", "M4A1"),
            entry("2", "M4 SOPMOD II"),
            entry("3", "ST AR-15"),
            entry("4", "Springfield"),
        ])
    }

    #[test]
    fn exact_name_scores_one() {
        let resolution = resolver().resolve("Springfield").expect("match");
        assert_eq!(resolution.name, "Springfield");
        assert!((resolution.score - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn noisy_text_resolves_to_closest_name() {
        let resolution = resolver().resolve("Sprlngfleld").expect("match");
        assert_eq!(resolution.name, "Springfield");
        assert!(resolution.is_confident());
    }

    #[test]
    fn ties_keep_first_roster_entry() {
        let resolver = EntityResolver::new(vec![entry("1", "AAA"), entry("2", "AAA")]);
        let resolution = resolver.resolve("AAA").expect("match");
        assert_eq!(resolution.name, "AAA");

        // Empty text scores zero everywhere, so the first entry wins.
        let empty = resolver.resolve("").expect("match");
        assert_eq!(empty.score, 0.0);
    }

    #[test]
    fn empty_roster_resolves_nothing() {
        assert!(EntityResolver::new(Vec::new()).resolve("M4A1").is_none());
    }

    #[test]
    fn confident_first_pass_skips_second_read() {
        let called = Cell::new(false);
        let resolution = resolver()
            .resolve_two_pass(
                "M4A1",
                || {
                    called.set(true);
                    Ok(String::new())
                },
                Fallback::Second,
            )
            .expect("resolve")
            .expect("match");
        assert_eq!(resolution.name, "M4A1");
        assert!(!called.get());
    }

    #[test]
    fn confident_second_pass_replaces_weak_first() {
        let resolution = resolver()
            .resolve_two_pass("#@!", || Ok("ST AR-15".to_string()), Fallback::First)
            .expect("resolve")
            .expect("match");
        assert_eq!(resolution.name, "ST AR-15");
    }

    #[test]
    fn weak_reads_follow_fallback() {
        let resolver = resolver();
        let first_read = "Mxx";
        let second_read = "Sxxxxxxx";
        let first = resolver.resolve(first_read).expect("first");
        let second = resolver.resolve(second_read).expect("second");
        assert!(!first.is_confident() && !second.is_confident());
        assert_ne!(first.name, second.name);

        let kept_first = resolver
            .resolve_two_pass(first_read, || Ok(second_read.to_string()), Fallback::First)
            .expect("resolve");
        assert_eq!(kept_first, Some(first));

        let kept_second = resolver
            .resolve_two_pass(first_read, || Ok(second_read.to_string()), Fallback::Second)
            .expect("resolve");
        assert_eq!(kept_second, Some(second));
    }
}
