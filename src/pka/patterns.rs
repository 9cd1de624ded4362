use std::sync::OnceLock;

use serde::Deserialize;
use tracing::debug;

use super::error::Error;
use crate::model::types::Polarity;
use crate::smarts::SmartsPattern;

const DEFAULT_PATTERNS_TOML: &str = include_str!("../../resources/ionization.patterns.toml");

/// Highest table format understood by this build.
pub const PATTERN_TABLE_VERSION: u32 = 1;

static DEFAULT_PATTERNS: OnceLock<PatternTable> = OnceLock::new();

/// One compiled ionization rule.
#[derive(Debug, Clone)]
pub struct IonizationPattern {
    pub name: String,
    pub polarity: Polarity,
    pub smarts: SmartsPattern,
    /// Positions within the SMARTS whose matched atoms are ionizable.
    pub sites: Vec<usize>,
}

/// An ordered, versioned set of ionization rules.
///
/// Tables never change after construction. The embedded default is built
/// once per process and shared as `&'static`.
#[derive(Debug, Clone)]
pub struct PatternTable {
    version: u32,
    patterns: Vec<IonizationPattern>,
}

impl PatternTable {
    /// Parses and compiles a table from TOML text.
    pub fn from_toml(text: &str) -> Result<Self, Error> {
        let raw: RawTable = toml::from_str(text)?;
        if raw.version == 0 || raw.version > PATTERN_TABLE_VERSION {
            return Err(Error::PatternTable(format!(
                "unsupported table version {} (supported: 1..={PATTERN_TABLE_VERSION})",
                raw.version
            )));
        }

        let mut patterns = Vec::with_capacity(raw.pattern.len());
        for entry in raw.pattern {
            let smarts = SmartsPattern::parse(&entry.smarts).map_err(|e| {
                Error::PatternTable(format!("pattern '{}': invalid SMARTS: {e}", entry.name))
            })?;
            if entry.sites.is_empty() {
                return Err(Error::PatternTable(format!(
                    "pattern '{}' lists no sites",
                    entry.name
                )));
            }
            if let Some(&bad) = entry.sites.iter().find(|&&s| s >= smarts.atom_count()) {
                return Err(Error::PatternTable(format!(
                    "pattern '{}': site {bad} is out of range for a {}-atom query",
                    entry.name,
                    smarts.atom_count()
                )));
            }
            patterns.push(IonizationPattern {
                name: entry.name,
                polarity: entry.polarity,
                smarts,
                sites: entry.sites,
            });
        }

        debug!(
            version = raw.version,
            patterns = patterns.len(),
            "compiled ionization pattern table"
        );
        Ok(Self {
            version: raw.version,
            patterns,
        })
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn patterns(&self) -> &[IonizationPattern] {
        &self.patterns
    }

    /// Patterns for one polarity, in definition order.
    pub fn for_polarity(&self, polarity: Polarity) -> impl Iterator<Item = &IonizationPattern> {
        self.patterns.iter().filter(move |p| p.polarity == polarity)
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

#[derive(Debug, Deserialize)]
struct RawTable {
    #[serde(default = "default_version")]
    version: u32,
    #[serde(default)]
    pattern: Vec<RawPattern>,
}

fn default_version() -> u32 {
    PATTERN_TABLE_VERSION
}

#[derive(Debug, Deserialize)]
struct RawPattern {
    name: String,
    polarity: Polarity,
    smarts: String,
    sites: Vec<usize>,
}

/// Returns the embedded table, compiling it on first use.
pub fn default_patterns() -> Result<&'static PatternTable, Error> {
    if let Some(table) = DEFAULT_PATTERNS.get() {
        return Ok(table);
    }
    let table = PatternTable::from_toml(DEFAULT_PATTERNS_TOML)?;
    Ok(DEFAULT_PATTERNS.get_or_init(|| table))
}

/// Resolves the table for a run: the custom TOML when given, else the default.
pub fn load_patterns(custom: Option<&str>) -> Result<PatternSet, Error> {
    match custom {
        Some(text) => Ok(PatternSet::Custom(Box::new(PatternTable::from_toml(text)?))),
        None => default_patterns().map(PatternSet::Default),
    }
}

/// Either the shared default table or an owned custom one.
#[derive(Debug, Clone)]
pub enum PatternSet {
    Default(&'static PatternTable),
    Custom(Box<PatternTable>),
}

impl std::ops::Deref for PatternSet {
    type Target = PatternTable;

    fn deref(&self) -> &PatternTable {
        match self {
            PatternSet::Default(table) => table,
            PatternSet::Custom(table) => table,
        }
    }
}
