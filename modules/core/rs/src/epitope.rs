use derive_getters::{Dissolve, Getters};
use derive_more::Constructor;
use serde::{Deserialize, Serialize};

use crate::hla::Allele;
use crate::variant::Variant;

/// One MHC-binding prediction produced by the predictor: a mutant peptide, the allele it
/// was scored against, and the predicted affinity in nM (lower is stronger).
#[derive(Clone, PartialEq, Debug, Constructor, Dissolve, Getters)]
pub struct Epitope {
    // Source alteration the peptide derives from
    variant: Variant,
    allele: Allele,
    peptide: String,
    ic50: f64,
}

/// Flat record of one prediction in a per-sample (or cohort-wide) neoantigen table.
/// Field order defines the column order of the tabular cache format.
#[derive(Clone, PartialEq, Debug, Constructor, Getters, Serialize, Deserialize)]
pub struct NeoantigenRow {
    sample_id: String,
    contig: String,
    position: u64,
    ref_allele: String,
    alt_allele: String,
    allele: Allele,
    peptide: String,
    length: u64,
    ic50: f64,
}

impl NeoantigenRow {
    /// Column names of the tabular format, in field order. Must stay in sync with the
    /// struct definition above.
    pub const COLUMNS: [&'static str; 9] = [
        "sample_id",
        "contig",
        "position",
        "ref_allele",
        "alt_allele",
        "allele",
        "peptide",
        "length",
        "ic50",
    ];
}

/// Row-oriented neoantigen table. Rows keep the order in which predictions were produced;
/// every row carries the identifier of the sample it belongs to, so tables from different
/// samples can be concatenated without losing provenance.
#[derive(Clone, PartialEq, Debug, Default, Serialize, Deserialize)]
pub struct NeoantigenTable {
    rows: Vec<NeoantigenRow>,
}

impl NeoantigenTable {
    /// Flatten predictions into rows. Sample identifiers are left empty; stamp them with
    /// [`NeoantigenTable::tag_sample`] once the owning sample is known.
    pub fn tabulate(epitopes: &[Epitope]) -> Self {
        let rows = epitopes
            .iter()
            .map(|e| NeoantigenRow {
                sample_id: String::new(),
                contig: e.variant().contig().to_string(),
                position: e.variant().position(),
                ref_allele: e.variant().ref_allele().to_string(),
                alt_allele: e.variant().alt_allele().to_string(),
                allele: e.allele().clone(),
                peptide: e.peptide().clone(),
                length: e.peptide().len() as u64,
                ic50: *e.ic50(),
            })
            .collect();
        Self { rows }
    }

    /// Set the sample identifier on every row.
    pub fn tag_sample(&mut self, sample: impl Into<String>) {
        let sample = sample.into();
        for row in &mut self.rows {
            row.sample_id = sample.clone();
        }
    }

    /// Concatenate tables, preserving row order. The result has exactly the sum of the
    /// input row counts.
    pub fn concat(tables: impl IntoIterator<Item = NeoantigenTable>) -> Self {
        let rows = tables.into_iter().flat_map(|t| t.rows).collect();
        Self { rows }
    }

    pub fn rows(&self) -> &[NeoantigenRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl From<Vec<NeoantigenRow>> for NeoantigenTable {
    fn from(rows: Vec<NeoantigenRow>) -> Self {
        Self { rows }
    }
}
