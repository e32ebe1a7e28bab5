//! Intent classification interface.

use crate::types::Intent;

/// Maps free text to a structured intent.
pub trait IntentClassifier: Send + Sync {
    fn classify(&self, command: &str) -> Intent;

    /// Human-readable name for this classifier.
    fn name(&self) -> &str;
}
