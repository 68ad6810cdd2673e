//! The `atlas:<name>` directive mini-language embedded in SQL comments.
//!
//! Directives live in leading comment lines of a migration file, e.g.
//! `-- atlas:sum ignore` or `-- atlas:checkpoint v1`. File-global directives
//! are the ones found in the header comment block (see
//! [`MigrationFile::directive`](crate::file::MigrationFile::directive));
//! everything else is attached to the statement that follows it.

use once_cell::sync::Lazy;
use regex::Regex;

/// Name of the checksum directive (`atlas:sum`).
pub const DIRECTIVE_SUM: &str = "sum";
/// Argument to `atlas:sum` that excludes a file's bytes from the manifest.
pub const SUM_MODE_IGNORE: &str = "ignore";
/// Name of the statement delimiter directive (`atlas:delimiter`).
pub const DIRECTIVE_DELIMITER: &str = "delimiter";
/// Name of the checkpoint directive (`atlas:checkpoint`).
pub const DIRECTIVE_CHECKPOINT: &str = "checkpoint";
/// Comment prefix used when the engine emits directives.
pub const DIRECTIVE_PREFIX_SQL: &str = "-- ";

// Single source of truth for directive recognition.
static RE_DIRECTIVE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([ -~]*)atlas:(\w+)(?: +([ -~]*))*").expect("directive regex"));

/// Parse a directive line into its name and space-joined arguments.
///
/// Returns `None` when the line is not a directive.
pub fn parse_directive(content: &str) -> Option<(&str, &str)> {
    let m = RE_DIRECTIVE.captures(content)?;
    let name = m.get(2)?.as_str();
    let args = m.get(3).map_or("", |g| g.as_str());
    Some((name, args))
}

/// Match a directive with the given name at the start of `content`, returning
/// its arguments. When `prefix` is given, the comment prefix must match it
/// exactly; `Some("")` requires a bare `atlas:` line.
pub fn directive<'a>(content: &'a str, name: &str, prefix: Option<&str>) -> Option<&'a str> {
    let m = RE_DIRECTIVE.captures(content)?;
    if m.get(2)?.as_str() != name {
        return None;
    }
    if let Some(p) = prefix {
        if m.get(1).map_or("", |g| g.as_str()) != p {
            return None;
        }
    }
    Some(m.get(3).map_or("", |g| g.as_str()))
}

/// Format a delimiter as its stored `atlas:delimiter` directive form.
///
/// The stored form is escaped: LF, CR and TAB become `\n`, `\r` and `\t`.
pub fn delim(s: &str) -> String {
    let escaped = s.replace('\n', "\\n").replace('\r', "\\r").replace('\t', "\\t");
    format!("{DIRECTIVE_PREFIX_SQL}atlas:{DIRECTIVE_DELIMITER} {escaped}")
}
