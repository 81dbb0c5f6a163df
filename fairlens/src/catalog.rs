//! Fairness dimensions and metric identifiers sent to the analysis backend.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::FairlensError;

/// Lens through which fairness is evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FairnessDimension {
    /// Outcomes compared across groups of a protected attribute.
    Group,
    /// Similar individuals should receive similar outcomes.
    Individual,
    /// Groups formed by combining several protected attributes.
    Intersectional,
}

impl FairnessDimension {
    /// All dimensions in display order.
    pub const ALL: [FairnessDimension; 3] = [
        FairnessDimension::Group,
        FairnessDimension::Individual,
        FairnessDimension::Intersectional,
    ];

    /// Identifier sent as `fairness_dimension`.
    pub fn as_str(&self) -> &'static str {
        match self {
            FairnessDimension::Group => "group",
            FairnessDimension::Individual => "individual",
            FairnessDimension::Intersectional => "intersectional",
        }
    }

    /// Metric identifiers selected when the user picks none.
    pub fn default_metrics(&self) -> &'static [&'static str] {
        match self {
            FairnessDimension::Group => &[
                "demographic_parity",
                "equal_opportunity",
                "equalized_odds",
                "disparate_impact",
            ],
            FairnessDimension::Individual => &["consistency", "counterfactual_fairness"],
            FairnessDimension::Intersectional => {
                &["subgroup_parity", "intersectional_disparate_impact"]
            }
        }
    }
}

impl fmt::Display for FairnessDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FairnessDimension {
    type Err = FairlensError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "group" => Ok(FairnessDimension::Group),
            "individual" => Ok(FairnessDimension::Individual),
            "intersectional" => Ok(FairnessDimension::Intersectional),
            other => Err(FairlensError::Configuration(format!(
                "Unknown fairness dimension '{other}' (expected group, individual or intersectional)"
            ))),
        }
    }
}

/// The user's choice of dimension and metrics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FairnessSelection {
    pub dimension: FairnessDimension,
    pub metrics: Vec<String>,
}

impl FairnessSelection {
    /// Creates a selection; blank metric names are dropped.
    pub fn new<I, S>(dimension: FairnessDimension, metrics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let metrics = metrics
            .into_iter()
            .map(|m| m.as_ref().trim().to_string())
            .filter(|m| !m.is_empty())
            .collect();
        Self { dimension, metrics }
    }

    /// Selection using the dimension's default metrics.
    pub fn with_defaults(dimension: FairnessDimension) -> Self {
        Self::new(dimension, dimension.default_metrics())
    }

    /// Metrics actually requested, falling back to the dimension defaults.
    pub fn effective_metrics(&self) -> Vec<&str> {
        if self.metrics.is_empty() {
            self.dimension.default_metrics().to_vec()
        } else {
            self.metrics.iter().map(String::as_str).collect()
        }
    }

    /// Value of the `fairness_metrics` form field.
    pub fn metrics_param(&self) -> String {
        self.effective_metrics().join(",")
    }
}
