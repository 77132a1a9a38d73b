use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

/// Default substitutions, applied in this order
const DEFAULT_RULES: [(&str, &str); 5] = [
    ("teh", "the"),
    ("adn", "and"),
    ("thsi", "this"),
    ("taht", "that"),
    ("msitake", "mistake"),
];

/// Tokens counted in the stats document. `msitake` is corrected but never counted.
const DEFAULT_TRACKED: [&str; 4] = ["teh", "adn", "thsi", "taht"];

/// A single literal substitution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrectionRule {
    /// Substring to look for
    pub misspelled: String,

    /// Replacement text
    pub corrected: String,
}

impl CorrectionRule {
    pub fn new(misspelled: &str, corrected: &str) -> Self {
        Self {
            misspelled: misspelled.to_string(),
            corrected: corrected.to_string(),
        }
    }
}

/// Ordered rule table plus the subset of tokens that feed statistics
///
/// The table is validated on construction and never changes afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleTable {
    rules: Vec<CorrectionRule>,

    #[serde(default)]
    tracked: Vec<String>,
}

impl Default for RuleTable {
    /// The built-in five-rule table with four tracked tokens
    fn default() -> Self {
        Self {
            rules: DEFAULT_RULES
                .iter()
                .map(|(wrong, right)| CorrectionRule::new(wrong, right))
                .collect(),
            tracked: DEFAULT_TRACKED.iter().map(|t| t.to_string()).collect(),
        }
    }
}

impl RuleTable {
    /// Build a table from explicit rules and tracked tokens
    ///
    /// # Arguments
    /// * `rules` - Substitutions in application order
    /// * `tracked` - Tokens to count; each must be one of the rules' misspelled tokens
    ///
    /// # Errors
    /// * `Error::Config` if the table is empty, contains an empty or duplicate
    ///   token, or tracks a token that no rule corrects
    pub fn new(rules: Vec<CorrectionRule>, tracked: Vec<String>) -> Result<Self> {
        let table = Self { rules, tracked };
        table.validate()?;
        Ok(table)
    }

    /// Load a rule table from a JSON file
    ///
    /// The file looks like
    /// `{"rules": [{"misspelled": "teh", "corrected": "the"}], "tracked": ["teh"]}`.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read rule file {}: {}", path.display(), e))
        })?;
        Self::from_json(&contents)
    }

    /// Parse and validate a rule table from a JSON string
    pub fn from_json(contents: &str) -> Result<Self> {
        let table: RuleTable = serde_json::from_str(contents)
            .map_err(|e| Error::Config(format!("Failed to parse rule table: {}", e)))?;
        table.validate()?;
        Ok(table)
    }

    fn validate(&self) -> Result<()> {
        if self.rules.is_empty() {
            return Err(Error::Config("Rule table must contain at least one rule".to_string()));
        }

        let mut seen = HashSet::new();
        for rule in &self.rules {
            // An empty pattern would match between every character
            if rule.misspelled.is_empty() {
                return Err(Error::Config("Misspelled token cannot be empty".to_string()));
            }
            if !seen.insert(rule.misspelled.as_str()) {
                return Err(Error::Config(format!(
                    "Duplicate misspelled token: {}",
                    rule.misspelled
                )));
            }
        }

        if let Some(unknown) = self.tracked.iter().find(|t| !seen.contains(t.as_str())) {
            return Err(Error::Config(format!(
                "Tracked token {} has no matching rule",
                unknown
            )));
        }

        Ok(())
    }

    pub fn rules(&self) -> &[CorrectionRule] {
        &self.rules
    }

    pub fn tracked(&self) -> &[String] {
        &self.tracked
    }
}

/// Literal substring corrector driven by a [`RuleTable`]
#[derive(Debug, Clone, Default)]
pub struct Corrector {
    table: RuleTable,
}

impl Corrector {
    pub fn new(table: RuleTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &RuleTable {
        &self.table
    }

    /// Apply every rule to the text
    ///
    /// Rules run in table order and each replaces all non-overlapping
    /// occurrences, case-sensitively, anywhere in the text (not only whole
    /// words). Output of an earlier rule is visible to later rules.
    ///
    /// # Arguments
    /// * `text` - Arbitrary input, possibly empty
    ///
    /// # Returns
    /// * `String` - The corrected text, equal to the input if nothing matched
    ///
    /// # Examples
    /// ```
    /// use thinkfast::corrector::Corrector;
    ///
    /// let corrector = Corrector::default();
    /// assert_eq!(corrector.correct("teh cat"), "the cat");
    /// ```
    pub fn correct(&self, text: &str) -> String {
        let mut corrected = text.to_string();
        for rule in &self.table.rules {
            if corrected.contains(&rule.misspelled) {
                corrected = corrected.replace(&rule.misspelled, &rule.corrected);
            }
        }
        corrected
    }

    /// Misspelled tokens from the whole table found in the text, ignoring case
    ///
    /// Detection is independent of [`Corrector::correct`]: `"TEH"` is reported
    /// here although correction leaves it alone.
    pub fn detect(&self, text: &str) -> Vec<String> {
        let lowered = text.to_lowercase();
        self.table
            .rules
            .iter()
            .filter(|rule| lowered.contains(&rule.misspelled))
            .map(|rule| rule.misspelled.clone())
            .collect()
    }
}
