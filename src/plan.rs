//! Plan boundary types consumed by the formatter.

use serde::{Deserialize, Serialize};

/// A migration plan handed over by an external planner.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Plan {
    /// Version for the rendered file name; minted at render time if unset.
    #[serde(default)]
    pub version: Option<String>,
    /// Human-readable name appended to the version.
    #[serde(default)]
    pub name: Option<String>,
    /// Statement delimiter, when not the default `;`.
    #[serde(default)]
    pub delimiter: String,
    /// Extra file directives, emitted verbatim after validation.
    #[serde(default)]
    pub directives: Vec<String>,
    /// The changes to apply, in order.
    #[serde(default)]
    pub changes: Vec<Change>,
}

/// A single planned change.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Change {
    /// Optional comment rendered above the statement.
    #[serde(default)]
    pub comment: Option<String>,
    /// The SQL statement to run.
    pub cmd: String,
}
