use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::CompareError;
use crate::key::KeyScheme;
use crate::model::REQUIRED_COLUMNS;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Quality written for a key with no accepted match. Far above any
/// chi-square/ndf seen in practice.
pub const NO_MATCH_QUALITY: f32 = 185_100_000.0;

/// Absolute tolerance when checking whether a row is its key's best candidate.
/// Smaller than the closest distinct chi-squares observed for one event.
pub const CHI_SQUARE_EPSILON: f32 = 1e-5;

/// Output value meaning "derive the name from the number of secondaries".
pub const OUTPUT_PLACEHOLDER: &str = "placeholder";

/// Table name of the augmented output.
pub const OUTPUT_TABLE: &str = "hypothesesMatched";

pub const DEFAULT_LOG_FILE: &str = "log_matches.txt";

const QUALITY_SUFFIX: &str = "_chisq_ndf";

/// Name of the quality column appended for a secondary table.
pub fn quality_column(table: &str) -> String {
    format!("{table}{QUALITY_SUFFIX}")
}

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct CompareConfig {
    pub primary: DatasetLocator,
    #[serde(default, rename = "secondary")]
    pub secondaries: Vec<DatasetLocator>,
    #[serde(default)]
    pub scheme: KeyScheme,
    #[serde(default)]
    pub preserve_combos: bool,
    #[serde(default)]
    pub logging: bool,
    #[serde(default = "default_log_file")]
    pub log_file: String,
    #[serde(default = "default_output")]
    pub output: String,
}

/// Where a dataset lives: a file path or glob, and its logical table name.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DatasetLocator {
    pub file: String,
    pub table: String,
}

fn default_log_file() -> String {
    DEFAULT_LOG_FILE.into()
}

fn default_output() -> String {
    OUTPUT_PLACEHOLDER.into()
}

impl DatasetLocator {
    pub fn new(file: impl Into<String>, table: impl Into<String>) -> Self {
        Self { file: file.into(), table: table.into() }
    }
}

impl CompareConfig {
    pub fn new(primary: DatasetLocator, secondaries: Vec<DatasetLocator>) -> Self {
        Self {
            primary,
            secondaries,
            scheme: KeyScheme::default(),
            preserve_combos: false,
            logging: false,
            log_file: default_log_file(),
            output: default_output(),
        }
    }

    /// Parse and validate a TOML config.
    pub fn from_toml(input: &str) -> Result<Self, CompareError> {
        let config: Self =
            toml::from_str(input).map_err(|e| CompareError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), CompareError> {
        check_locator("primary", &self.primary)?;

        if self.secondaries.is_empty() {
            return Err(CompareError::ConfigValidation(
                "at least one secondary dataset is required".into(),
            ));
        }

        let mut columns: HashSet<String> = REQUIRED_COLUMNS.iter().map(|c| c.to_string()).collect();
        let mut tables = HashSet::new();
        for (i, sec) in self.secondaries.iter().enumerate() {
            check_locator(&format!("secondary #{}", i + 1), sec)?;
            if !tables.insert(sec.table.as_str()) {
                return Err(CompareError::ConfigValidation(format!(
                    "secondary table '{}' listed more than once",
                    sec.table
                )));
            }
            let column = quality_column(&sec.table);
            if !columns.insert(column.clone()) {
                return Err(CompareError::ConfigValidation(format!(
                    "quality column '{column}' collides with an existing column"
                )));
            }
        }

        if self.logging && self.log_file.trim().is_empty() {
            return Err(CompareError::ConfigValidation("log_file must not be empty".into()));
        }

        Ok(())
    }

    /// Output path, applying the `<N>_hypothesesMatched.csv` default.
    pub fn output_path(&self) -> PathBuf {
        if self.output.is_empty() || self.output == OUTPUT_PLACEHOLDER {
            PathBuf::from(format!("{}_{OUTPUT_TABLE}.csv", self.secondaries.len()))
        } else {
            PathBuf::from(&self.output)
        }
    }

    /// Resolve relative file, log and output paths against `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        let join = |p: &str| -> String {
            if Path::new(p).is_absolute() {
                p.to_string()
            } else {
                base.join(p).to_string_lossy().into_owned()
            }
        };

        self.primary.file = join(&self.primary.file);
        for sec in &mut self.secondaries {
            sec.file = join(&sec.file);
        }
        self.log_file = join(&self.log_file);
        self.output = join(&self.output_path().to_string_lossy());
    }
}

fn check_locator(label: &str, locator: &DatasetLocator) -> Result<(), CompareError> {
    if locator.file.trim().is_empty() {
        return Err(CompareError::ConfigValidation(format!("{label}: file is required")));
    }
    if locator.table.trim().is_empty() {
        return Err(CompareError::ConfigValidation(format!("{label}: table is required")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASIC: &str = r#"
scheme = "by-event-and-beam"
logging = true

[primary]
file = "hyp1/*.csv"
table = "hypothesis1"

[[secondary]]
file = "hyp2.csv"
table = "hypothesis2"

[[secondary]]
file = "hyp3.csv"
table = "hypothesis3"
"#;

    #[test]
    fn parse_basic() {
        let config = CompareConfig::from_toml(BASIC).unwrap();
        assert_eq!(config.scheme, KeyScheme::ByEventAndBeam);
        assert_eq!(config.secondaries.len(), 2);
        assert!(config.logging);
        assert!(!config.preserve_combos);
        assert_eq!(config.log_file, DEFAULT_LOG_FILE);
        assert_eq!(config.output_path(), PathBuf::from("2_hypothesesMatched.csv"));
    }

    #[test]
    fn defaults() {
        let config = CompareConfig::new(
            DatasetLocator::new("a.csv", "a"),
            vec![DatasetLocator::new("b.csv", "b")],
        );
        assert_eq!(config.scheme, KeyScheme::ByEvent);
        assert_eq!(config.output, OUTPUT_PLACEHOLDER);
        assert_eq!(config.output_path(), PathBuf::from("1_hypothesesMatched.csv"));
        config.validate().unwrap();
    }

    #[test]
    fn missing_secondary_rejected() {
        let toml = r#"
[primary]
file = "a.csv"
table = "a"
"#;
        let err = CompareConfig::from_toml(toml).unwrap_err();
        assert!(err.to_string().contains("secondary"), "{err}");
    }

    #[test]
    fn empty_table_rejected() {
        let config = CompareConfig::new(
            DatasetLocator::new("a.csv", ""),
            vec![DatasetLocator::new("b.csv", "b")],
        );
        assert!(matches!(config.validate(), Err(CompareError::ConfigValidation(_))));
    }

    #[test]
    fn duplicate_secondary_rejected() {
        let config = CompareConfig::new(
            DatasetLocator::new("a.csv", "a"),
            vec![DatasetLocator::new("b.csv", "b"), DatasetLocator::new("c.csv", "b")],
        );
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("more than once"), "{err}");
    }

    #[test]
    fn unknown_scheme_is_parse_error() {
        let toml = r#"
scheme = "by-run"
[primary]
file = "a.csv"
table = "a"
[[secondary]]
file = "b.csv"
table = "b"
"#;
        assert!(matches!(CompareConfig::from_toml(toml), Err(CompareError::ConfigParse(_))));
    }

    #[test]
    fn resolve_relative_paths() {
        let mut config = CompareConfig::new(
            DatasetLocator::new("a.csv", "a"),
            vec![DatasetLocator::new("/data/b.csv", "b")],
        );
        config.resolve_paths(Path::new("/work"));
        assert_eq!(config.primary.file, "/work/a.csv");
        assert_eq!(config.secondaries[0].file, "/data/b.csv");
        assert_eq!(config.output_path(), PathBuf::from("/work/1_hypothesesMatched.csv"));
    }
}
