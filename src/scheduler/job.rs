use std::sync::Arc;
use std::time::Duration;

use crate::error::{DispatchError, Result};

/// The closed set of labels a job can be tagged with.
///
/// Cloning is cheap; every clone shares the same labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategorySet {
    labels: Arc<[Arc<str>]>,
}

impl CategorySet {
    /// Build a set from labels, keeping first-seen order and dropping duplicates.
    pub fn new<I, S>(labels: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut unique: Vec<Arc<str>> = Vec::new();
        for label in labels {
            let label = label.as_ref().trim();
            if label.is_empty() {
                return Err(DispatchError::InvalidConfig(
                    "job categories must not be empty".to_string(),
                ));
            }
            if !unique.iter().any(|existing| &**existing == label) {
                unique.push(Arc::from(label));
            }
        }

        if unique.is_empty() {
            return Err(DispatchError::InvalidConfig(
                "at least one job category is required".to_string(),
            ));
        }

        Ok(Self {
            labels: unique.into(),
        })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Always false; construction rejects empty sets.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Arc<str>> {
        self.labels.get(index)
    }

    pub fn contains(&self, label: &str) -> bool {
        self.labels.iter().any(|l| &**l == label)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<str>> {
        self.labels.iter()
    }
}

/// One unit of simulated work. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    category: Arc<str>,
    duration: Duration,
}

impl Job {
    pub fn new(category: impl Into<Arc<str>>, duration: Duration) -> Self {
        Self {
            category: category.into(),
            duration,
        }
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    /// Shared handle to the category label, for callers that outlive the job
    pub fn category_label(&self) -> Arc<str> {
        Arc::clone(&self.category)
    }

    /// How long a worker is suspended while "processing" this job
    pub fn duration(&self) -> Duration {
        self.duration
    }
}
