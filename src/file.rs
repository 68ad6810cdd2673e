//! Migration file model.

use crate::directive::{self, DIRECTIVE_CHECKPOINT, DIRECTIVE_SUM, SUM_MODE_IGNORE};
use crate::error::{MigrateError, MigrateResult};

/// A single migration file: a name plus raw byte content.
///
/// Files are immutable once constructed, except for prepending header
/// directives via [`add_directive`](MigrationFile::add_directive).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationFile {
    name: String,
    bytes: Vec<u8>,
}

impl MigrationFile {
    /// Create a file from its name and raw content.
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self { name: name.into(), bytes: bytes.into() }
    }

    /// The file name, unique within its directory.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The raw content, verbatim.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The version component of the name: everything up to the first `_`,
    /// with a trailing `.sql` stripped.
    pub fn version(&self) -> &str {
        let stem = self.name.strip_suffix(".sql").unwrap_or(&self.name);
        stem.split('_').next().unwrap_or(stem)
    }

    /// The description component of the name: everything after the first `_`,
    /// with a trailing `.sql` stripped. Empty when the name has no `_`.
    pub fn desc(&self) -> &str {
        match self.name.split_once('_') {
            Some((_, rest)) => rest.strip_suffix(".sql").unwrap_or(rest),
            None => "",
        }
    }

    /// The file-global directives matching `name`, in order of appearance.
    ///
    /// File directives live in the header comment block: the run of `#` or
    /// `--` lines at the very start of the file, detached from the statements
    /// below it by a blank line (or followed by nothing at all).
    pub fn directive(&self, name: &str) -> Vec<String> {
        let mut ds = Vec::new();
        for c in self.comments() {
            if let Some(args) = directive::directive(&c, name, None) {
                ds.push(args.to_string());
            }
        }
        ds
    }

    /// Prepend a new file directive.
    ///
    /// If the file has no header comment block yet, a blank line is inserted
    /// after the directive to detach it from the statements below.
    pub fn add_directive(&mut self, name: &str, args: &[&str]) {
        let mut line = format!("-- atlas:{name}");
        if !args.is_empty() {
            line.push(' ');
            line.push_str(&args.join(" "));
        }
        line.push('\n');
        if self.comments().is_empty() {
            line.push('\n');
        }
        let mut b = line.into_bytes();
        b.extend_from_slice(&self.bytes);
        self.bytes = b;
    }

    /// Whether the file is tagged as a checkpoint.
    pub fn is_checkpoint(&self) -> bool {
        !self.directive(DIRECTIVE_CHECKPOINT).is_empty()
    }

    /// The checkpoint tag, empty if the directive has no argument.
    ///
    /// Fails with [`MigrateError::NotCheckpoint`] on non-checkpoint files.
    pub fn checkpoint_tag(&self) -> MigrateResult<String> {
        self.directive(DIRECTIVE_CHECKPOINT)
            .into_iter()
            .next()
            .ok_or(MigrateError::NotCheckpoint)
    }

    /// Whether the file's bytes are excluded from the integrity manifest.
    pub fn sum_ignored(&self) -> bool {
        self.directive(DIRECTIVE_SUM).iter().any(|m| m == SUM_MODE_IGNORE)
    }

    // The header comment block: `#`/`--` lines from byte 0, terminated by a
    // blank-line separator. Leading comments without that separator belong to
    // the first statement and yield no block. A comments-only file is its own
    // header. Each line is trimmed, so CRLF endings behave like LF.
    fn comments(&self) -> Vec<String> {
        let mut comments = Vec::new();
        let mut rest: &[u8] = &self.bytes;
        while rest.starts_with(b"#") || rest.starts_with(b"--") {
            match rest.iter().position(|&b| b == b'\n') {
                Some(idx) => {
                    comments.push(String::from_utf8_lossy(&rest[..idx]).trim().to_string());
                    rest = &rest[idx + 1..];
                }
                None => {
                    comments.push(String::from_utf8_lossy(rest).trim().to_string());
                    rest = b"";
                }
            }
        }
        if !rest.is_empty() {
            // CRLF endings count as LF here.
            let first = rest.iter().find(|&&b| b != b' ' && b != b'\t');
            if first != Some(&b'\n') && first != Some(&b'\r') {
                return Vec::new();
            }
        }
        comments
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_and_desc_from_name() {
        let f = MigrationFile::new("20240101000000_add_users.sql", "");
        assert_eq!(f.version(), "20240101000000");
        assert_eq!(f.desc(), "add_users");

        let f = MigrationFile::new("baseline.sql", "");
        assert_eq!(f.version(), "baseline");
        assert_eq!(f.desc(), "");

        let f = MigrationFile::new("1_a_b.sql", "");
        assert_eq!(f.version(), "1");
        assert_eq!(f.desc(), "a_b");
    }

    #[test]
    fn header_directives_require_blank_separator() {
        let f = MigrationFile::new("x.sql", "-- atlas:sum ignore\n\nSELECT 1;\n");
        assert_eq!(f.directive("sum"), vec!["ignore"]);

        // No separator: the comment is attached to the first statement.
        let f = MigrationFile::new("x.sql", "-- atlas:sum ignore\nSELECT 1;\n");
        assert!(f.directive("sum").is_empty());

        // Separator may carry spaces and tabs before the newline.
        let f = MigrationFile::new("x.sql", "-- atlas:sum ignore\n \t \nSELECT 1;\n");
        assert_eq!(f.directive("sum"), vec!["ignore"]);
    }

    #[test]
    fn comments_only_file_is_its_own_header() {
        let f = MigrationFile::new("x.sql", "-- atlas:checkpoint v1\n");
        assert!(f.is_checkpoint());

        let f = MigrationFile::new("x.sql", "-- atlas:checkpoint v1");
        assert!(f.is_checkpoint());

        let f = MigrationFile::new("x.sql", "# atlas:checkpoint\n-- atlas:sum ignore\n");
        assert!(f.is_checkpoint());
        assert!(f.sum_ignored());
    }

    #[test]
    fn header_directives_preserve_order() {
        let f = MigrationFile::new(
            "x.sql",
            "-- atlas:lint a\n-- atlas:lint b\n\nSELECT 1;\n",
        );
        assert_eq!(f.directive("lint"), vec!["a", "b"]);
    }

    #[test]
    fn add_directive_establishes_separator_when_needed() {
        let mut f = MigrationFile::new("x.sql", "SELECT 1;\n");
        f.add_directive("checkpoint", &["v1"]);
        assert_eq!(f.bytes(), b"-- atlas:checkpoint v1\n\nSELECT 1;\n");
        assert!(f.is_checkpoint());
        assert_eq!(f.checkpoint_tag().unwrap(), "v1");
    }

    #[test]
    fn add_directive_reuses_existing_header() {
        let mut f = MigrationFile::new("x.sql", "-- atlas:sum ignore\n\nSELECT 1;\n");
        f.add_directive("checkpoint", &[]);
        assert_eq!(f.bytes(), b"-- atlas:checkpoint\n-- atlas:sum ignore\n\nSELECT 1;\n");
        assert!(f.is_checkpoint());
        assert_eq!(f.checkpoint_tag().unwrap(), "");
        assert!(f.sum_ignored());
    }

    #[test]
    fn checkpoint_tag_fails_on_plain_files() {
        let f = MigrationFile::new("x.sql", "SELECT 1;\n");
        assert!(!f.is_checkpoint());
        assert!(matches!(f.checkpoint_tag(), Err(MigrateError::NotCheckpoint)));
    }

    #[test]
    fn crlf_endings_behave_like_lf() {
        let f = MigrationFile::new("x.sql", "-- atlas:sum ignore\r\n\r\nSELECT 1;\r\n");
        assert_eq!(f.directive("sum"), vec!["ignore"]);

        let g = MigrationFile::new("x.sql", "-- atlas:sum ignore\r\n\nSELECT 1;\n");
        assert_eq!(g.directive("sum"), vec!["ignore"]);
    }
}
