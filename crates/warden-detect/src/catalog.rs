//! # Pattern Catalog
//!
//! Loads declarative pattern files into a compiled rule set. Each file
//! describes one category:
//!
//! ```json
//! {
//!   "name": "instruction_override",
//!   "description": "Attempts to replace the agent's standing instructions",
//!   "risk": 0.85,
//!   "action": "block",
//!   "patterns": [
//!     { "regex": "ignore\\s+(all\\s+)?previous\\s+instructions?",
//!       "description": "ignore previous instructions",
//!       "decoder": "base64",
//!       "examples": ["Ignore all previous instructions"] }
//!   ]
//! }
//! ```
//!
//! Regexes are compiled case-insensitive. Loading is all-or-nothing: a
//! missing directory, unreadable file, malformed JSON document, or regex
//! that fails to compile aborts initialization with a precise error.
//! There is deliberately no partial catalog, since a silently dropped
//! category would weaken detection without anyone noticing.
//!
//! The eight canonical category files ship embedded in this crate and
//! back [`Catalog::builtin`]; a configured directory replaces them
//! entirely.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use regex::{Regex, RegexBuilder};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// Errors raised while loading the pattern catalog. All variants are
/// fatal at initialization.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The configured pattern directory does not exist.
    #[error("pattern directory not found: {0}")]
    MissingDir(PathBuf),

    /// The configured pattern directory contains no pattern files.
    #[error("pattern directory contains no .json files: {0}")]
    EmptyDir(PathBuf),

    /// A pattern file could not be read.
    #[error("failed to read pattern file {path}")]
    Io {
        /// Offending file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A pattern file is not a valid category document.
    #[error("malformed pattern file {path}")]
    Parse {
        /// Offending file.
        path: PathBuf,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// A regex failed to compile. Patterns using constructs the engine
    /// does not support (backreferences, lookaround) land here.
    #[error("invalid regex {pattern:?} in category {category}")]
    Regex {
        /// Category the pattern belongs to.
        category: String,
        /// The regex source that failed.
        pattern: String,
        /// Underlying compile error.
        #[source]
        source: regex::Error,
    },

    /// A category declared a risk outside [0, 1].
    #[error("category {category} declares risk {risk} outside [0, 1]")]
    RiskRange {
        /// Offending category.
        category: String,
        /// Declared risk value.
        risk: f64,
    },
}

/// On-disk shape of one category file.
#[derive(Debug, Clone, Deserialize)]
pub struct PatternFile {
    /// Category name; the vocabulary of the heuristic flag set.
    pub name: String,
    /// Human description of the category.
    pub description: String,
    /// Risk shared by every pattern in the category.
    pub risk: f64,
    /// Suggested action. Informational only.
    pub action: String,
    /// The patterns themselves.
    pub patterns: Vec<PatternSpec>,
}

/// On-disk shape of one pattern within a category file.
#[derive(Debug, Clone, Deserialize)]
pub struct PatternSpec {
    /// ECMAScript-compatible regex source.
    pub regex: String,
    /// Human description of what the pattern detects.
    pub description: String,
    /// Optional hint naming the decoder this pattern pairs with.
    #[serde(default)]
    pub decoder: Option<String>,
    /// Example strings the pattern is expected to hit. Informational.
    #[serde(default)]
    pub examples: Vec<String>,
}

/// A compiled detection rule.
#[derive(Debug)]
pub struct Rule {
    /// Owning category name.
    pub category: String,
    /// Risk inherited from the owning category.
    pub risk: f64,
    /// Human description, carried into match traces.
    pub description: String,
    /// Compiled case-insensitive regex.
    pub regex: Regex,
    /// Optional decoder hint from the pattern file.
    pub decoder_hint: Option<String>,
}

/// Category metadata retained for reporting.
#[derive(Debug, Clone)]
pub struct Category {
    /// Category name.
    pub name: String,
    /// Human description.
    pub description: String,
    /// Shared risk of the category's patterns.
    pub risk: f64,
    /// Suggested action from the file. Informational.
    pub suggested_action: String,
}

/// The compiled, immutable pattern catalog.
#[derive(Debug)]
pub struct Catalog {
    categories: Vec<Category>,
    rules: Vec<Rule>,
}

/// Embedded copies of the canonical category files.
const BUILTIN_FILES: &[(&str, &str)] = &[
    (
        "command_injection.json",
        include_str!("../patterns/command_injection.json"),
    ),
    (
        "credential_theft.json",
        include_str!("../patterns/credential_theft.json"),
    ),
    (
        "data_exfiltration.json",
        include_str!("../patterns/data_exfiltration.json"),
    ),
    ("discovery.json", include_str!("../patterns/discovery.json")),
    ("encoding.json", include_str!("../patterns/encoding.json")),
    (
        "impersonation.json",
        include_str!("../patterns/impersonation.json"),
    ),
    (
        "instruction_override.json",
        include_str!("../patterns/instruction_override.json"),
    ),
    (
        "prompt_leak.json",
        include_str!("../patterns/prompt_leak.json"),
    ),
];

impl Catalog {
    /// Compile the catalog shipped with this crate.
    pub fn builtin() -> Self {
        let mut files = Vec::with_capacity(BUILTIN_FILES.len());
        for (name, body) in BUILTIN_FILES {
            let parsed: PatternFile =
                serde_json::from_str(body).expect("embedded pattern file is valid JSON");
            files.push((PathBuf::from(name), parsed));
        }
        Self::compile(files).expect("embedded pattern catalog compiles")
    }

    /// Load and compile every `.json` category file in `dir`.
    ///
    /// Files are processed in name order so rule order (and therefore
    /// match order in traces) is deterministic across platforms.
    pub fn load_dir(dir: &Path) -> Result<Self, CatalogError> {
        if !dir.is_dir() {
            return Err(CatalogError::MissingDir(dir.to_path_buf()));
        }

        let mut paths: Vec<PathBuf> = fs::read_dir(dir)
            .map_err(|source| CatalogError::Io {
                path: dir.to_path_buf(),
                source,
            })?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();

        if paths.is_empty() {
            return Err(CatalogError::EmptyDir(dir.to_path_buf()));
        }

        let mut files = Vec::with_capacity(paths.len());
        for path in paths {
            let body = fs::read_to_string(&path).map_err(|source| CatalogError::Io {
                path: path.clone(),
                source,
            })?;
            let parsed: PatternFile =
                serde_json::from_str(&body).map_err(|source| CatalogError::Parse {
                    path: path.clone(),
                    source,
                })?;
            files.push((path, parsed));
        }

        Self::compile(files)
    }

    fn compile(files: Vec<(PathBuf, PatternFile)>) -> Result<Self, CatalogError> {
        let mut categories = Vec::with_capacity(files.len());
        let mut rules = Vec::new();

        for (_, file) in files {
            if !(0.0..=1.0).contains(&file.risk) {
                return Err(CatalogError::RiskRange {
                    category: file.name,
                    risk: file.risk,
                });
            }

            for spec in &file.patterns {
                let regex = RegexBuilder::new(&spec.regex)
                    .case_insensitive(true)
                    .build()
                    .map_err(|source| CatalogError::Regex {
                        category: file.name.clone(),
                        pattern: spec.regex.clone(),
                        source,
                    })?;

                rules.push(Rule {
                    category: file.name.clone(),
                    risk: file.risk,
                    description: spec.description.clone(),
                    regex,
                    decoder_hint: spec.decoder.clone(),
                });
            }

            categories.push(Category {
                name: file.name,
                description: file.description,
                risk: file.risk,
                suggested_action: file.action,
            });
        }

        debug!(
            categories = categories.len(),
            rules = rules.len(),
            "pattern catalog compiled"
        );

        Ok(Self { categories, rules })
    }

    /// All compiled rules, in category file order.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Category metadata, in file order.
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// Number of compiled rules.
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Sorted, deduplicated category names.
    pub fn category_names(&self) -> BTreeSet<String> {
        self.categories.iter().map(|c| c.name.clone()).collect()
    }
}
