//! Protected-attribute heuristics.
//!
//! A column is flagged as a protected attribute by an ordered list of rules
//! where the first match wins. The default table checks, in order:
//!
//! 1. the column name against known sensitive-attribute patterns,
//! 2. the first 100 values against gender tokens,
//! 3. the numeric range of the values against a plausible age range.
//!
//! Columns matching none of the rules are reported as not protected with a
//! low confidence. The output is meant to flag columns for human review, not
//! to be a certain classification.
//!
//! # Example
//!
//! ```rust
//! use fairlens::dataset::protected::{ProtectedAttributeDetector, RiskLevel};
//!
//! let detector = ProtectedAttributeDetector::new();
//! let assessment = detector.assess("Gender", &["Male", "Female"]);
//! assert!(assessment.is_protected);
//! assert_eq!(assessment.confidence, 0.95);
//! assert_eq!(assessment.risk_level, RiskLevel::High);
//! ```

use std::collections::HashSet;
use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::dataset::inference::parse_number;
use crate::error::{FairlensError, Result};

/// Values inspected by the value-set rule.
pub const VALUE_SAMPLE_LIMIT: usize = 100;

/// Lower-cased tokens that mark a column as encoding gender.
pub const GENDER_TOKENS: [&str; 6] = ["male", "female", "m", "f", "man", "woman"];

/// Confidence reported for columns no rule matched.
pub const FALLBACK_CONFIDENCE: f64 = 0.1;

/// How much scrutiny a protected attribute needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Lower-case name as used in reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Condition a rule checks.
#[derive(Debug, Clone)]
pub enum RuleMatcher {
    /// The lower-cased column name matches the pattern anywhere.
    NamePattern(Regex),
    /// One of the first `sample_limit` lower-cased values is in `tokens`.
    ValueSet {
        tokens: Vec<String>,
        sample_limit: usize,
    },
    /// At least one numeric value, every number within `[min, max]`, and a
    /// spread strictly wider than `min_spread`.
    NumericRange { min: f64, max: f64, min_spread: f64 },
}

impl RuleMatcher {
    fn matches<S: AsRef<str>>(&self, lowered_name: &str, values: &[S]) -> bool {
        match self {
            RuleMatcher::NamePattern(pattern) => pattern.is_match(lowered_name),
            RuleMatcher::ValueSet {
                tokens,
                sample_limit,
            } => {
                let sampled: HashSet<String> = values
                    .iter()
                    .take(*sample_limit)
                    .map(|v| v.as_ref().to_lowercase())
                    .collect();
                tokens.iter().any(|token| sampled.contains(token))
            }
            RuleMatcher::NumericRange {
                min,
                max,
                min_spread,
            } => {
                let mut numbers = values.iter().filter_map(|v| parse_number(v.as_ref()));
                let Some(first) = numbers.next() else {
                    return false;
                };
                let (lo, hi) = numbers.fold((first, first), |(lo, hi), n| (lo.min(n), hi.max(n)));
                *min <= lo && hi <= *max && hi - lo > *min_spread
            }
        }
    }
}

/// One row of the rule table: a condition and the verdict it produces.
#[derive(Debug, Clone)]
pub struct ProtectedRule {
    name: String,
    matcher: RuleMatcher,
    confidence: f64,
    risk_level: RiskLevel,
}

impl ProtectedRule {
    /// Creates a rule flagging columns whose lower-cased name matches `pattern`.
    ///
    /// # Errors
    ///
    /// Returns [`FairlensError::Configuration`] if `pattern` is not a valid regex.
    pub fn name_pattern(
        name: impl Into<String>,
        pattern: &str,
        confidence: f64,
        risk_level: RiskLevel,
    ) -> Result<Self> {
        let regex = Regex::new(&format!("(?i){pattern}")).map_err(|e| {
            FairlensError::Configuration(format!("Invalid protected-attribute pattern '{pattern}': {e}"))
        })?;
        Ok(Self {
            name: name.into(),
            matcher: RuleMatcher::NamePattern(regex),
            confidence,
            risk_level,
        })
    }

    /// Creates a rule flagging columns whose sampled values contain one of `tokens`.
    pub fn value_set<I, S>(
        name: impl Into<String>,
        tokens: I,
        sample_limit: usize,
        confidence: f64,
        risk_level: RiskLevel,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            name: name.into(),
            matcher: RuleMatcher::ValueSet {
                tokens: tokens
                    .into_iter()
                    .map(|t| t.as_ref().to_lowercase())
                    .collect(),
                sample_limit,
            },
            confidence,
            risk_level,
        }
    }

    /// Creates a rule flagging numeric columns whose values fall in `[min, max]`
    /// with a spread wider than `min_spread`.
    pub fn numeric_range(
        name: impl Into<String>,
        min: f64,
        max: f64,
        min_spread: f64,
        confidence: f64,
        risk_level: RiskLevel,
    ) -> Self {
        Self {
            name: name.into(),
            matcher: RuleMatcher::NumericRange {
                min,
                max,
                min_spread,
            },
            confidence,
            risk_level,
        }
    }

    /// Rule identifier, reported as `matched_rule`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The rule's condition.
    pub fn matcher(&self) -> &RuleMatcher {
        &self.matcher
    }

    /// Confidence reported when the rule fires.
    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    /// Risk level reported when the rule fires.
    pub fn risk_level(&self) -> RiskLevel {
        self.risk_level
    }
}

/// Verdict for one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtectedAssessment {
    pub is_protected: bool,
    pub confidence: f64,
    pub risk_level: RiskLevel,
    /// Name of the rule that fired, `None` for the fallback.
    pub matched_rule: Option<String>,
}

impl ProtectedAssessment {
    /// The verdict for columns no rule matched.
    pub fn not_protected() -> Self {
        Self {
            is_protected: false,
            confidence: FALLBACK_CONFIDENCE,
            risk_level: RiskLevel::Low,
            matched_rule: None,
        }
    }
}

// (rule name, name pattern, confidence, risk)
const NAME_RULES: [(&str, &str, f64, RiskLevel); 9] = [
    ("gender", "gender|sex", 0.95, RiskLevel::High),
    ("age", "age|birth|dob", 0.92, RiskLevel::High),
    ("race", "race|ethnic|nationality", 0.98, RiskLevel::High),
    ("religion", "religion|faith", 0.90, RiskLevel::High),
    ("disability", "disability|handicap", 0.88, RiskLevel::High),
    ("marital_status", "marital|marriage", 0.85, RiskLevel::Medium),
    ("location", "zip|postal|address", 0.75, RiskLevel::Medium),
    ("income", "income|salary|wage", 0.80, RiskLevel::Medium),
    ("education", "education|degree", 0.70, RiskLevel::Medium),
];

/// The built-in rule table in evaluation order.
pub fn default_rules() -> Vec<ProtectedRule> {
    let mut rules: Vec<ProtectedRule> = NAME_RULES
        .iter()
        .map(|(name, pattern, confidence, risk)| {
            #[allow(clippy::expect_used)]
            ProtectedRule::name_pattern(format!("name:{name}"), pattern, *confidence, *risk)
                .expect("Hard-coded regex pattern should be valid")
        })
        .collect();
    rules.push(ProtectedRule::value_set(
        "values:gender_tokens",
        GENDER_TOKENS,
        VALUE_SAMPLE_LIMIT,
        0.90,
        RiskLevel::High,
    ));
    rules.push(ProtectedRule::numeric_range(
        "range:age_like",
        16.0,
        100.0,
        10.0,
        0.85,
        RiskLevel::High,
    ));
    rules
}

/// Builder for [`ProtectedAttributeDetector`].
#[derive(Debug, Clone)]
pub struct ProtectedAttributeDetectorBuilder {
    leading: Vec<ProtectedRule>,
    rules: Vec<ProtectedRule>,
    trailing: Vec<ProtectedRule>,
}

impl ProtectedAttributeDetectorBuilder {
    /// Adds a rule evaluated before the built-in table.
    pub fn prepend_rule(mut self, rule: ProtectedRule) -> Self {
        self.leading.push(rule);
        self
    }

    /// Adds a rule evaluated after the built-in table and before the fallback.
    pub fn append_rule(mut self, rule: ProtectedRule) -> Self {
        self.trailing.push(rule);
        self
    }

    /// Replaces the built-in table.
    pub fn rules(mut self, rules: Vec<ProtectedRule>) -> Self {
        self.rules = rules;
        self
    }

    /// Overrides the sample limit of every value-set rule added so far.
    pub fn value_sample_limit(mut self, limit: usize) -> Self {
        let all = self
            .leading
            .iter_mut()
            .chain(self.rules.iter_mut())
            .chain(self.trailing.iter_mut());
        for rule in all {
            if let RuleMatcher::ValueSet { sample_limit, .. } = &mut rule.matcher {
                *sample_limit = limit;
            }
        }
        self
    }

    /// Builds the detector.
    pub fn build(self) -> ProtectedAttributeDetector {
        let mut rules = self.leading;
        rules.extend(self.rules);
        rules.extend(self.trailing);
        ProtectedAttributeDetector { rules }
    }
}

/// First-match-wins evaluator over a [`ProtectedRule`] table.
#[derive(Debug, Clone)]
pub struct ProtectedAttributeDetector {
    rules: Vec<ProtectedRule>,
}

impl ProtectedAttributeDetector {
    /// Creates a builder seeded with [`default_rules`].
    pub fn builder() -> ProtectedAttributeDetectorBuilder {
        ProtectedAttributeDetectorBuilder {
            leading: Vec::new(),
            rules: default_rules(),
            trailing: Vec::new(),
        }
    }

    /// Creates a detector with the built-in table.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Rules in evaluation order.
    pub fn rules(&self) -> &[ProtectedRule] {
        &self.rules
    }

    /// Assesses a column from its name and non-empty values.
    pub fn assess<S: AsRef<str>>(&self, column_name: &str, values: &[S]) -> ProtectedAssessment {
        let lowered = column_name.to_lowercase();
        for rule in &self.rules {
            if rule.matcher.matches(&lowered, values) {
                trace!(column = column_name, rule = rule.name(), "Protected-attribute rule matched");
                return ProtectedAssessment {
                    is_protected: true,
                    confidence: rule.confidence,
                    risk_level: rule.risk_level,
                    matched_rule: Some(rule.name.clone()),
                };
            }
        }
        ProtectedAssessment::not_protected()
    }
}

impl Default for ProtectedAttributeDetector {
    fn default() -> Self {
        Self::new()
    }
}
