mod cohort;
mod error;
mod neoantigens;
mod parse;
mod validate;
mod variants;

pub use cohort::{Cohort, FileNamer, SampleRef};
pub use error::{LoadError, OnMissing};
pub use neoantigens::{EpitopePredictor, NeoantigenParams, PredictorConfig};
pub use variants::VariantReader;
