//! Local keyword moderation.
//!
//! Scans text against per-rule term tables:
//! - Terms match case-insensitively on word boundaries ("crap" does not fire on "scrap")
//! - Zero-width and bidirectional control characters are stripped first, so
//!   "pro\u{200B}fanity" style evasion still matches
//! - Rules without a term table (factual-accuracy, response-relevance) never fire

use std::collections::BTreeMap;

use async_trait::async_trait;
use colloquy_core::{ContentFilter, FilterVerdict, PolicyRule, PolicySet, Unavailable};

/// A term hit in the scanned text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermMatch {
    pub rule: PolicyRule,
    pub term: String,
    /// Byte span in the normalized (lowercased, stripped) text.
    pub span: (usize, usize),
}

const PROFANITY_TERMS: &[&str] = &[
    "damn", "shit", "fuck", "fucking", "bastard", "crap", "asshole", "bitch", "bullshit",
];

const HARASSMENT_TERMS: &[&str] = &[
    "shut up",
    "you are worthless",
    "you're worthless",
    "nobody likes you",
    "you are pathetic",
    "you're pathetic",
    "you idiot",
    "loser",
];

const HATE_SPEECH_TERMS: &[&str] = &[
    "subhuman",
    "inferior race",
    "go back to your country",
    "ethnic cleansing",
];

const SEXUAL_CONTENT_TERMS: &[&str] = &["porn", "pornography", "nude photos", "explicit sex"];

const VIOLENCE_TERMS: &[&str] = &[
    "i will kill",
    "i'm going to kill",
    "murder",
    "stab you",
    "shoot you",
    "build a bomb",
    "make a bomb",
];

/// Zero-width and bidirectional override characters removed before matching.
const HIDDEN_UNICODE: &[char] = &[
    '\u{200B}', '\u{200C}', '\u{200D}', '\u{FEFF}', '\u{202A}', '\u{202B}', '\u{202C}',
    '\u{202D}', '\u{202E}', '\u{2066}', '\u{2067}', '\u{2068}', '\u{2069}',
];

fn builtin_terms(rule: PolicyRule) -> &'static [&'static str] {
    match rule {
        PolicyRule::Profanity => PROFANITY_TERMS,
        PolicyRule::Harassment => HARASSMENT_TERMS,
        PolicyRule::HateSpeech => HATE_SPEECH_TERMS,
        PolicyRule::SexualContent => SEXUAL_CONTENT_TERMS,
        PolicyRule::Violence => VIOLENCE_TERMS,
        PolicyRule::FactualAccuracy | PolicyRule::ResponseRelevance => &[],
    }
}

/// Content filter backed by in-process term tables. Never unavailable.
#[derive(Debug, Clone, Default)]
pub struct KeywordFilter {
    extra: BTreeMap<PolicyRule, Vec<String>>,
}

impl KeywordFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add terms on top of the built-in tables.
    pub fn with_terms(mut self, extra: BTreeMap<PolicyRule, Vec<String>>) -> Self {
        for (rule, terms) in extra {
            let entry = self.extra.entry(rule).or_default();
            entry.extend(terms.into_iter().map(|t| t.to_lowercase()));
        }
        self
    }

    /// Scan `text` for every rule in `policies`, in policy order.
    pub fn scan(&self, text: &str, policies: &PolicySet) -> Vec<TermMatch> {
        let normalized = normalize(text);
        let mut matches = Vec::new();

        for rule in policies.iter() {
            let builtin = builtin_terms(rule).iter().copied();
            let extra = self
                .extra
                .get(&rule)
                .into_iter()
                .flatten()
                .map(String::as_str);
            for term in builtin.chain(extra) {
                if let Some(pos) = find_word(&normalized, term) {
                    matches.push(TermMatch {
                        rule,
                        term: term.to_string(),
                        span: (pos, pos + term.len()),
                    });
                }
            }
        }
        matches
    }
}

#[async_trait]
impl ContentFilter for KeywordFilter {
    async fn check(&self, text: &str, policies: &PolicySet) -> Result<FilterVerdict, Unavailable> {
        let matches = self.scan(text, policies);
        let mut violations: Vec<String> = Vec::new();
        for m in &matches {
            tracing::debug!("Keyword match: rule={} term={:?}", m.rule, m.term);
            let reason = m.rule.as_str();
            if !violations.iter().any(|v| v == reason) {
                violations.push(reason.to_string());
            }
        }

        if violations.is_empty() {
            Ok(FilterVerdict::pass())
        } else {
            Ok(FilterVerdict::block(violations))
        }
    }
}

fn normalize(text: &str) -> String {
    text.chars()
        .filter(|c| !HIDDEN_UNICODE.contains(c))
        .collect::<String>()
        .to_lowercase()
}

/// Find `term` in `haystack` where both ends fall on a word boundary.
fn find_word(haystack: &str, term: &str) -> Option<usize> {
    if term.is_empty() {
        return None;
    }
    haystack.match_indices(term).map(|(pos, _)| pos).find(|&pos| {
        let before = haystack[..pos].chars().next_back();
        let after = haystack[pos + term.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_rules() -> PolicySet {
        PolicySet::new(PolicyRule::output_defaults())
    }

    #[tokio::test]
    async fn clean_text_passes() {
        let filter = KeywordFilter::new();
        let verdict = filter
            .check("What is the capital of France?", &all_rules())
            .await
            .unwrap();
        assert!(verdict.passed);
        assert!(verdict.violations.is_empty());
    }

    #[tokio::test]
    async fn profanity_is_blocked() {
        let filter = KeywordFilter::new();
        let verdict = filter
            .check("Well damn, that is annoying", &all_rules())
            .await
            .unwrap();
        assert!(!verdict.passed);
        assert_eq!(verdict.violations, vec!["profanity".to_string()]);
    }

    #[test]
    fn respects_word_boundaries() {
        let filter = KeywordFilter::new();
        let matches = filter.scan("Scrap metal and a crapshoot", &all_rules());
        assert!(matches.is_empty(), "unexpected matches: {:?}", matches);
    }

    #[test]
    fn hidden_unicode_does_not_evade() {
        let filter = KeywordFilter::new();
        let matches = filter.scan("oh da\u{200B}mn", &all_rules());
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].rule, PolicyRule::Profanity);
    }

    #[test]
    fn only_requested_rules_are_checked() {
        let filter = KeywordFilter::new();
        let only_violence = PolicySet::new([PolicyRule::Violence]);
        assert!(filter.scan("damn it", &only_violence).is_empty());
        assert_eq!(filter.scan("I will kill the lights", &only_violence).len(), 1);
    }

    #[tokio::test]
    async fn violations_follow_policy_order_without_duplicates() {
        let filter = KeywordFilter::new();
        let policies = PolicySet::new([PolicyRule::Violence, PolicyRule::Profanity]);
        let verdict = filter
            .check("shit, shit, bullshit. I will kill you", &policies)
            .await
            .unwrap();
        assert_eq!(
            verdict.violations,
            vec!["violence".to_string(), "profanity".to_string()]
        );
    }

    #[test]
    fn extra_terms_extend_tables() {
        let mut extra = BTreeMap::new();
        extra.insert(PolicyRule::Harassment, vec!["Nincompoop".to_string()]);
        let filter = KeywordFilter::new().with_terms(extra);
        let matches = filter.scan("you NINCOMPOOP", &all_rules());
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].rule, PolicyRule::Harassment);
        assert_eq!(matches[0].term, "nincompoop");
    }

    #[test]
    fn accuracy_rules_never_fire_locally() {
        let filter = KeywordFilter::new();
        let policies = PolicySet::new([PolicyRule::FactualAccuracy, PolicyRule::ResponseRelevance]);
        assert!(filter.scan("The moon is made of cheese.", &policies).is_empty());
    }

    #[test]
    fn find_word_handles_edges() {
        assert_eq!(find_word("damn", "damn"), Some(0));
        assert_eq!(find_word("oh damn!", "damn"), Some(3));
        assert_eq!(find_word("damnation", "damn"), None);
        assert_eq!(find_word("anything", ""), None);
    }
}
