//! The word-oracle capability interface: one method, no engine-visible
//! state. When a domain empties, the engine describes the slot as a letter
//! pattern and asks the host for more candidates; the host can back the
//! request with anything from a bigger dictionary to a network service.
//! Latency is the host's problem, errors come back as empty replies, and
//! everything the oracle returns is filtered before it touches the supply.

use fancy_regex::Regex;
use std::collections::HashSet;
use std::fmt;

/// The wildcard character in slot patterns.
pub const WILDCARD: char = '.';

/// A slot's current letter pattern: uppercase letters where cells are fixed
/// or implied by assigned crossings, `.` everywhere else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern(String);

impl Pattern {
    /// Build a pattern from per-cell letters.
    #[must_use]
    pub fn from_letters<I>(letters: I) -> Pattern
    where
        I: IntoIterator<Item = Option<char>>,
    {
        Pattern(
            letters
                .into_iter()
                .map(|letter| letter.unwrap_or(WILDCARD))
                .collect(),
        )
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Does the word fit this pattern? Lengths must agree and every fixed
    /// position must match exactly.
    #[must_use]
    pub fn matches(&self, word: &str) -> bool {
        word.len() == self.0.len()
            && word
                .bytes()
                .zip(self.0.bytes())
                .all(|(word_byte, pattern_byte)| {
                    pattern_byte == WILDCARD as u8 || word_byte == pattern_byte
                })
    }

    /// The anchored regex form of this pattern, with `[A-Z]` standing in for
    /// wildcards.
    #[must_use]
    pub fn to_regex(&self) -> Regex {
        let mut source = String::with_capacity(self.0.len() * 5 + 2);
        source.push('^');
        for ch in self.0.chars() {
            if ch == WILDCARD {
                source.push_str("[A-Z]");
            } else {
                source.push(ch);
            }
        }
        source.push('$');

        // Patterns only ever contain A-Z and wildcards, so the source is
        // always a valid regex.
        Regex::new(&source).expect("pattern regex failed to compile")
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An oracle-side failure. The engine logs it and treats the call as having
/// returned nothing.
#[derive(Debug, Clone)]
pub struct OracleError(pub String);

impl fmt::Display for OracleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "oracle request failed: {}", self.0)
    }
}

/// The capability the host hands the engine for on-demand supply growth.
///
/// `count` is an advisory upper bound and `used` must be excluded from the
/// reply, but the engine re-filters everything it gets back (length,
/// alphabet, pattern, and uniqueness), so a sloppy implementation degrades
/// the fill rather than corrupting it. If the host needs timeouts it wraps
/// the request and returns an empty reply on expiry.
pub trait WordOracle {
    fn request(
        &mut self,
        pattern: &Pattern,
        count: usize,
        used: &HashSet<String>,
    ) -> Result<Vec<String>, OracleError>;
}

#[cfg(test)]
mod tests {
    use crate::oracle::Pattern;

    #[test]
    fn test_pattern_from_letters() {
        let pattern = Pattern::from_letters(vec![Some('A'), None, Some('T'), None]);
        assert_eq!(pattern.as_str(), "A.T.");
        assert_eq!(pattern.to_string(), "A.T.");
        assert_eq!(pattern.len(), 4);
    }

    #[test]
    fn test_pattern_matching() {
        let pattern = Pattern::from_letters(vec![Some('A'), None, None, Some('E')]);
        assert!(pattern.matches("ABLE"));
        assert!(pattern.matches("ACRE"));
        assert!(!pattern.matches("ALSO"));
        assert!(!pattern.matches("APPLE"));
        assert!(!pattern.matches("ALE"));
    }

    #[test]
    fn test_pattern_regex() {
        let regex = Pattern::from_letters(vec![None, Some('L'), None, Some('E')]).to_regex();
        assert!(regex.is_match("GLUE").unwrap());
        assert!(regex.is_match("FLEE").unwrap());
        assert!(!regex.is_match("LEAF").unwrap());
        assert!(!regex.is_match("glue").unwrap());
    }

    #[test]
    fn test_all_wildcards() {
        let pattern = Pattern::from_letters(vec![None; 3]);
        assert_eq!(pattern.as_str(), "...");
        assert!(pattern.matches("SOD"));
        assert!(!pattern.matches("SODA"));
    }
}
