use std::fmt::Display;
use std::str::FromStr;

#[cfg(feature = "bitcode")]
use bitcode::{Decode, Encode};
use eyre::{ensure, Report, Result};
use serde::{Deserialize, Serialize};

/// MHC class I allele name, stored verbatim apart from trimmed surrounding whitespace
/// (e.g. `HLA-A*02:01` or `A*02:01`). Nomenclature beyond that is left to the binding
/// predictor, which is the component that actually interprets the name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "bitcode", derive(Encode, Decode))]
#[serde(transparent)]
pub struct Allele(String);

impl Allele {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into().trim().to_string();
        ensure!(!name.is_empty(), "HLA allele name must not be empty");
        ensure!(
            !name.contains(char::is_whitespace),
            "HLA allele name must not contain whitespace: {name:?}"
        );
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Allele {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Allele {
    type Err = Report;

    fn from_str(s: &str) -> Result<Self> {
        Allele::new(s)
    }
}
