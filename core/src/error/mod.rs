#[allow(clippy::module_inception)]
pub mod error;
pub mod extract;

pub use error::{CliError, RunnerError};
pub use extract::{ExtractError, ExtractionResult};
