use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use anyhow::{Context, Result};
use tempfile::NamedTempFile;

use crate::config::RuleSet;

/// Apply the rewrite rules to every line of a staged file, in place.
///
/// The transformed content is written to a temporary file in the same
/// directory and renamed over the staged copy, so the rewrite never leaves a
/// half-written file behind. With an empty rule set the file is left exactly
/// as copied.
pub fn rewrite_file(path: &Path, rules: &RuleSet) -> Result<()> {
    if rules.is_empty() {
        return Ok(());
    }

    let source =
        File::open(path).context(format!("Failed to open staged file {}", path.display()))?;
    let permissions = source
        .metadata()
        .context(format!("Failed to stat staged file {}", path.display()))?
        .permissions();
    let reader = BufReader::new(source);

    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let mut rewritten = NamedTempFile::new_in(parent)
        .context("Failed to create temporary file for rewrite")?;

    for line in reader.lines() {
        let line = line.context(format!("Failed to read line from {}", path.display()))?;
        writeln!(rewritten, "{}", rules.apply(&line))
            .context("Failed to write rewritten line")?;
    }

    // The temporary file is created with restrictive permissions; carry the
    // staged copy's mode over before it takes the staged file's place.
    rewritten
        .as_file()
        .set_permissions(permissions)
        .context("Failed to set permissions on rewritten file")?;
    rewritten
        .persist(path)
        .context(format!("Failed to replace staged file {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RewriteRule;
    use std::fs;
    use tempfile::TempDir;

    fn rules(pairs: &[(&str, &str)]) -> RuleSet {
        let raw: Vec<RewriteRule> = pairs
            .iter()
            .map(|(p, r)| RewriteRule {
                pattern: p.to_string(),
                replacement: r.to_string(),
            })
            .collect();
        RuleSet::compile(&raw).unwrap()
    }

    #[test]
    fn test_empty_rule_set_leaves_file_untouched() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        fs::write(&path, "password=hunter2\n").unwrap();

        rewrite_file(&path, &RuleSet::default()).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "password=hunter2\n");
    }

    #[test]
    fn test_matching_lines_are_redacted() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        fs::write(&path, "user=alice\npassword=hunter2\nuser=bob\n").unwrap();

        rewrite_file(&path, &rules(&[("password=.*", "password=REDACTED")])).unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "user=alice\npassword=REDACTED\nuser=bob\n"
        );
    }

    #[test]
    fn test_rules_apply_to_every_line() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        fs::write(&path, "token=1\ntoken=2\n").unwrap();

        rewrite_file(&path, &rules(&[("token=\\d+", "token=X")])).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "token=X\ntoken=X\n");
    }

    #[test]
    fn test_rewrite_twice_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        fs::write(&path, "password=hunter2\nplain line\n").unwrap();

        let set = rules(&[("password=.*", "password=REDACTED")]);
        rewrite_file(&path, &set).unwrap();
        let once = fs::read_to_string(&path).unwrap();
        rewrite_file(&path, &set).unwrap();
        let twice = fs::read_to_string(&path).unwrap();

        assert_eq!(once, twice);
    }

    #[test]
    fn test_file_without_trailing_newline_gains_one() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        fs::write(&path, "a=1").unwrap();

        rewrite_file(&path, &rules(&[("a", "b")])).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "b=1\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_rewrite_preserves_file_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        fs::write(&path, "password=hunter2\n").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o640)).unwrap();

        rewrite_file(&path, &rules(&[("password=.*", "password=REDACTED")])).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o640);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gone.log");
        let result = rewrite_file(&path, &rules(&[("a", "b")]));
        assert!(result.is_err());
    }
}
