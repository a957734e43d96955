//! Whole-word, case-insensitive keyword matching.

use regex::Regex;

use discurso_core::{Error, KeywordTables, Result};

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Regex source for one keyword.
///
/// A word boundary is required at each end of the keyword that is itself a
/// word character, so `EE.UU.` still matches before a space or comma.
fn keyword_pattern(keyword: &str) -> String {
    let mut pattern = String::from("(?i)");
    if keyword.chars().next().is_some_and(is_word_char) {
        pattern.push_str(r"\b");
    }
    pattern.push_str(&regex::escape(keyword));
    if keyword.chars().last().is_some_and(is_word_char) {
        pattern.push_str(r"\b");
    }
    pattern
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| Error::Pattern(format!("{}: {}", pattern, e)))
}

/// One compiled keyword set.
#[derive(Debug, Clone)]
pub struct KeywordMatcher {
    keywords: Vec<String>,
    patterns: Vec<Regex>,
    any: Option<Regex>,
}

impl KeywordMatcher {
    pub fn new(keywords: &[String]) -> Result<Self> {
        let sources: Vec<String> = keywords.iter().map(|k| keyword_pattern(k)).collect();
        let patterns = sources
            .iter()
            .map(|s| compile(s))
            .collect::<Result<Vec<_>>>()?;
        let any = if sources.is_empty() {
            None
        } else {
            let alternation = sources
                .iter()
                .map(|s| format!("(?:{})", s))
                .collect::<Vec<_>>()
                .join("|");
            Some(compile(&alternation)?)
        };
        Ok(Self {
            keywords: keywords.to_vec(),
            patterns,
            any,
        })
    }

    /// Total number of keyword hits. Each keyword is counted on its own, so
    /// overlapping mentions of different keywords all add up.
    pub fn score(&self, text: &str) -> usize {
        self.patterns.iter().map(|re| re.find_iter(text).count()).sum()
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.any.as_ref().is_some_and(|re| re.is_match(text))
    }

    /// Keywords with at least one hit, in table order.
    pub fn matched<'a>(&'a self, text: &str) -> Vec<&'a str> {
        self.keywords
            .iter()
            .zip(&self.patterns)
            .filter(|(_, re)| re.is_match(text))
            .map(|(k, _)| k.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }
}

/// Scoring matchers for the two topics and the domestic context.
#[derive(Debug, Clone)]
pub struct Lexicon {
    pub gdp: KeywordMatcher,
    pub inflation: KeywordMatcher,
    pub mexico: KeywordMatcher,
}

impl Lexicon {
    pub fn compile(tables: &KeywordTables) -> Result<Self> {
        Ok(Self {
            gdp: KeywordMatcher::new(&tables.gdp)?,
            inflation: KeywordMatcher::new(&tables.inflation)?,
            mexico: KeywordMatcher::new(&tables.mexico)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher(words: &[&str]) -> KeywordMatcher {
        let owned: Vec<String> = words.iter().map(|w| w.to_string()).collect();
        KeywordMatcher::new(&owned).unwrap()
    }

    #[test]
    fn test_whole_word_case_insensitive() {
        let m = matcher(&["PIB"]);
        assert_eq!(m.score("El pib y el PIB, no el PIBE."), 2);
        assert!(!m.is_match("PIBE"));
    }

    #[test]
    fn test_accented_boundaries() {
        let m = matcher(&["México", "mexicano"]);
        assert_eq!(m.score("MÉXICO y el peso mexicano"), 2);
        assert_eq!(m.score("Nuevo Méxicoano"), 0);
    }

    #[test]
    fn test_overlapping_keywords_add_up() {
        let m = matcher(&["inflación", "inflación subyacente"]);
        assert_eq!(m.score("La inflación subyacente bajó."), 2);
        assert_eq!(m.matched("La inflación subyacente bajó."), vec!["inflación", "inflación subyacente"]);
    }

    #[test]
    fn test_punctuated_keyword() {
        let m = matcher(&["EE.UU."]);
        assert!(m.is_match("la economía de EE.UU. creció"));
        assert!(m.is_match("en EE.UU., la actividad"));
        assert!(!m.is_match("en EEXUU, la actividad"));
    }

    #[test]
    fn test_empty_matcher() {
        let m = matcher(&[]);
        assert!(m.is_empty());
        assert_eq!(m.score("PIB"), 0);
        assert!(!m.is_match("PIB"));
    }

    #[test]
    fn test_lexicon_defaults() {
        let lexicon = Lexicon::compile(&KeywordTables::default()).unwrap();
        let s = "La inflación en México subió en el trimestre.";
        assert_eq!(lexicon.inflation.score(s), 1);
        assert_eq!(lexicon.mexico.score(s), 1);
        assert_eq!(lexicon.gdp.score(s), 0);
    }
}
