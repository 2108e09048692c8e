use anyhow::{anyhow, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// A single pattern/replacement pair applied per line for redaction or
/// normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewriteRule {
    pub pattern: String,
    pub replacement: String,
}

/// A rewrite rule with its pattern compiled.
#[derive(Debug, Clone)]
struct CompiledRule {
    regex: Regex,
    replacement: String,
}

/// An ordered, pre-compiled rewrite rule list.
///
/// Rules apply cumulatively: each rule rewrites the output of the previous
/// one. Compilation happens once at startup so an invalid pattern aborts the
/// run before any file is touched.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<CompiledRule>,
}

impl RuleSet {
    /// Compile every rule, reporting all invalid patterns together.
    pub fn compile(rules: &[RewriteRule]) -> Result<Self> {
        let mut compiled = Vec::with_capacity(rules.len());
        let mut errors = Vec::new();

        for rule in rules {
            match Regex::new(&rule.pattern) {
                Ok(regex) => compiled.push(CompiledRule {
                    regex,
                    replacement: rule.replacement.clone(),
                }),
                Err(e) => errors.push(format!("'{}': {}", rule.pattern, e)),
            }
        }

        if errors.is_empty() {
            Ok(RuleSet { rules: compiled })
        } else {
            Err(anyhow!("invalid rewrite rule patterns: {}", errors.join("; ")))
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Apply every rule in order to a single line (without its newline).
    pub fn apply(&self, line: &str) -> String {
        let mut current = line.to_string();
        for rule in &self.rules {
            current = rule
                .regex
                .replace_all(&current, rule.replacement.as_str())
                .into_owned();
        }
        current
    }
}
