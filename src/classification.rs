//! Category enumeration and classifier results.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Default labels, in classifier output order.
pub const DEFAULT_CATEGORIES: [&str; 2] = ["female", "male"];

/// The fixed, ordered set of category labels for a session.
///
/// A label's position is the classifier output index it corresponds to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct CategorySet {
    labels: Vec<String>,
}

impl CategorySet {
    /// Create a category set from unique, non-empty labels.
    pub fn new<I, S>(labels: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();

        if labels.is_empty() {
            return Err(Error::InvalidConfig(
                "category set must contain at least one label".to_string(),
            ));
        }

        for (i, label) in labels.iter().enumerate() {
            if label.trim().is_empty() {
                return Err(Error::InvalidConfig(format!("category {} has an empty label", i)));
            }
            if labels[..i].contains(label) {
                return Err(Error::InvalidConfig(format!("duplicate category label: {}", label)));
            }
        }

        Ok(Self { labels })
    }

    /// Number of categories.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Always false for a constructed set.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Index of a label, if it belongs to the set.
    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.labels.iter().position(|l| l == label)
    }

    /// Label at an index.
    pub fn label(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    /// Labels in index order.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }
}

impl Default for CategorySet {
    fn default() -> Self {
        Self {
            labels: DEFAULT_CATEGORIES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl TryFrom<Vec<String>> for CategorySet {
    type Error = Error;

    fn try_from(labels: Vec<String>) -> Result<Self> {
        Self::new(labels)
    }
}

impl From<CategorySet> for Vec<String> {
    fn from(set: CategorySet) -> Self {
        set.labels
    }
}

/// A classifier result for one identity in one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    /// Category label.
    pub category: String,

    /// Confidence in [0, 1].
    pub confidence: f64,
}

impl Classification {
    /// Create a classification. Validation against a category set happens on use.
    pub fn new(category: impl Into<String>, confidence: f64) -> Self {
        Self {
            category: category.into(),
            confidence,
        }
    }

    /// Pick the highest-scoring category from a score vector.
    ///
    /// `scores[i]` is the score of `categories.label(i)`. The winning score is
    /// the confidence. Ties go to the lower index.
    pub fn from_scores(scores: &[f64], categories: &CategorySet) -> Result<Self> {
        if scores.len() != categories.len() {
            return Err(Error::InvalidClassification(format!(
                "expected {} scores, got {}",
                categories.len(),
                scores.len()
            )));
        }

        let mut best = 0;
        for (i, &score) in scores.iter().enumerate() {
            if score.is_nan() {
                return Err(Error::InvalidClassification(format!("score {} is NaN", i)));
            }
            if score > scores[best] {
                best = i;
            }
        }

        let classification = Self::new(categories.labels[best].clone(), scores[best]);
        classification.validate(categories)?;
        Ok(classification)
    }

    /// Check the label against `categories` and the confidence range.
    ///
    /// Returns the category index on success.
    pub fn validate(&self, categories: &CategorySet) -> Result<usize> {
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(Error::InvalidClassification(format!(
                "confidence {} outside [0, 1]",
                self.confidence
            )));
        }

        categories
            .index_of(&self.category)
            .ok_or_else(|| Error::UnknownCategory(self.category.clone()))
    }
}
