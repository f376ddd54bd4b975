//! Exchange data model.
//!
//! An [`Exchange`] is one user turn and its resolved outcome. Exchanges are
//! built only in a terminal state; nothing in the crate hands out `&mut`
//! access once one is stored.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Terminal outcome of one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExchangeStatus {
    Answered,
    BlockedInput,
    BlockedOutput,
    GenerationFailed,
}

impl ExchangeStatus {
    pub fn is_blocked(self) -> bool {
        matches!(self, Self::BlockedInput | Self::BlockedOutput)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Answered => "ANSWERED",
            Self::BlockedInput => "BLOCKED_INPUT",
            Self::BlockedOutput => "BLOCKED_OUTPUT",
            Self::GenerationFailed => "GENERATION_FAILED",
        }
    }
}

impl fmt::Display for ExchangeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which side of the exchange a filter ran on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Input,
    Output,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Input => f.write_str("input"),
            Stage::Output => f.write_str("output"),
        }
    }
}

/// One resolved user-turn/bot-turn pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exchange {
    pub id: Uuid,
    pub user_message: String,
    pub bot_response: String,
    pub status: ExchangeStatus,
    #[serde(default)]
    pub violations: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Exchange {
    /// Build a terminal exchange. `violations` is dropped unless the status
    /// is one of the blocked variants.
    pub fn resolved(
        user_message: impl Into<String>,
        bot_response: impl Into<String>,
        status: ExchangeStatus,
        violations: Vec<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_message: user_message.into(),
            bot_response: bot_response.into(),
            status,
            violations: if status.is_blocked() {
                violations
            } else {
                Vec::new()
            },
            created_at: Utc::now(),
        }
    }

    pub fn answered(user_message: impl Into<String>, reply: impl Into<String>) -> Self {
        Self::resolved(user_message, reply, ExchangeStatus::Answered, Vec::new())
    }
}

/// Outcome of a completed content-filter check.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FilterVerdict {
    pub passed: bool,
    #[serde(default)]
    pub violations: Vec<String>,
}

impl FilterVerdict {
    pub fn pass() -> Self {
        Self {
            passed: true,
            violations: Vec::new(),
        }
    }

    pub fn block<I, S>(violations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            passed: false,
            violations: violations.into_iter().map(Into::into).collect(),
        }
    }
}

/// Moderation policy rule identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PolicyRule {
    Harassment,
    HateSpeech,
    Profanity,
    SexualContent,
    Violence,
    FactualAccuracy,
    ResponseRelevance,
}

impl PolicyRule {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Harassment => "harassment",
            Self::HateSpeech => "hate-speech",
            Self::Profanity => "profanity",
            Self::SexualContent => "sexual-content",
            Self::Violence => "violence",
            Self::FactualAccuracy => "factual-accuracy",
            Self::ResponseRelevance => "response-relevance",
        }
    }

    /// Rules checked against user input by default.
    pub fn input_defaults() -> Vec<PolicyRule> {
        vec![
            Self::Harassment,
            Self::HateSpeech,
            Self::Profanity,
            Self::SexualContent,
            Self::Violence,
        ]
    }

    /// Rules checked against generated output by default.
    pub fn output_defaults() -> Vec<PolicyRule> {
        let mut rules = Self::input_defaults();
        rules.push(Self::FactualAccuracy);
        rules.push(Self::ResponseRelevance);
        rules
    }
}

impl fmt::Display for PolicyRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An ordered, duplicate-free set of policy rules.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Vec<PolicyRule>", into = "Vec<PolicyRule>")]
pub struct PolicySet {
    rules: Vec<PolicyRule>,
}

impl PolicySet {
    pub fn new(rules: impl IntoIterator<Item = PolicyRule>) -> Self {
        let mut set = Self::default();
        for rule in rules {
            if !set.rules.contains(&rule) {
                set.rules.push(rule);
            }
        }
        set
    }

    pub fn rules(&self) -> &[PolicyRule] {
        &self.rules
    }

    pub fn contains(&self, rule: PolicyRule) -> bool {
        self.rules.contains(&rule)
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = PolicyRule> + '_ {
        self.rules.iter().copied()
    }
}

impl From<Vec<PolicyRule>> for PolicySet {
    fn from(rules: Vec<PolicyRule>) -> Self {
        Self::new(rules)
    }
}

impl From<PolicySet> for Vec<PolicyRule> {
    fn from(set: PolicySet) -> Self {
        set.rules
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answered_exchange_has_no_violations() {
        let ex = Exchange::resolved(
            "hi",
            "hello",
            ExchangeStatus::Answered,
            vec!["profanity".into()],
        );
        assert!(ex.violations.is_empty());
    }

    #[test]
    fn blocked_exchange_keeps_violations() {
        let ex = Exchange::resolved(
            "hi",
            "blocked",
            ExchangeStatus::BlockedInput,
            vec!["profanity".into()],
        );
        assert_eq!(ex.violations, vec!["profanity".to_string()]);
    }

    #[test]
    fn status_serializes_screaming_snake() {
        let json = serde_json::to_string(&ExchangeStatus::GenerationFailed).unwrap();
        assert_eq!(json, "\"GENERATION_FAILED\"");
        assert_eq!(ExchangeStatus::BlockedOutput.to_string(), "BLOCKED_OUTPUT");
    }

    #[test]
    fn policy_rule_kebab_case() {
        let json = serde_json::to_string(&PolicyRule::HateSpeech).unwrap();
        assert_eq!(json, "\"hate-speech\"");
        let rule: PolicyRule = serde_json::from_str("\"response-relevance\"").unwrap();
        assert_eq!(rule, PolicyRule::ResponseRelevance);
    }

    #[test]
    fn policy_set_dedups_and_keeps_order() {
        let set = PolicySet::new([
            PolicyRule::Violence,
            PolicyRule::Profanity,
            PolicyRule::Violence,
        ]);
        assert_eq!(set.rules(), &[PolicyRule::Violence, PolicyRule::Profanity]);
    }

    #[test]
    fn output_defaults_extend_input_defaults() {
        let input = PolicyRule::input_defaults();
        let output = PolicyRule::output_defaults();
        assert!(input.iter().all(|r| output.contains(r)));
        assert!(output.contains(&PolicyRule::FactualAccuracy));
        assert!(!input.contains(&PolicyRule::ResponseRelevance));
    }

    #[test]
    fn verdict_block_collects_reasons() {
        let verdict = FilterVerdict::block(["profanity"]);
        assert!(!verdict.passed);
        assert_eq!(verdict.violations, vec!["profanity".to_string()]);
    }
}
