//! `hypomatch-compare` - best-candidate reduction and cross-hypothesis matching.
//!
//! Each hypothesis is a dataset of kinematic-fit candidates. The engine keeps
//! the minimal chi-square candidate per key, joins the primary's best
//! candidates against every secondary's, and rebuilds the primary rows with
//! one `chisq/ndf` quality column per secondary.
//!
//! Pure engine crate apart from the CSV source/sink and match log. No CLI
//! dependencies.

pub mod augment;
pub mod config;
pub mod engine;
pub mod error;
pub mod key;
pub mod matchlog;
pub mod matcher;
pub mod model;
pub mod reduce;
pub mod source;

pub use config::{CompareConfig, DatasetLocator};
pub use engine::{load_input, run, CompareInput, CompareOutcome};
pub use error::{CompareError, ErrorClass};
pub use key::{Key, KeyScheme};
pub use model::{CompareSummary, Dataset, Record};
