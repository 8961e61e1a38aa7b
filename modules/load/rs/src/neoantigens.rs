use std::num::NonZeroUsize;
use std::rc::Rc;
use std::sync::Arc;

use derive_getters::{Dissolve, Getters};
use eyre::{ensure, Result, WrapErr};
use impl_tools::autoimpl;
use log::warn;

use neocohort_cache_rs::Category;
use neocohort_core_rs::epitope::{Epitope, NeoantigenTable};
use neocohort_core_rs::hla::Allele;
use neocohort_core_rs::parallelism;
use neocohort_core_rs::variant::{MergeKind, VariantKind, VariantSet};

use crate::cohort::Cohort;
use crate::error::{is_missing_data, LoadError, OnMissing};
use crate::variants::{merge_label, VariantReader};

/// Per-invocation configuration handed to the binding predictor: the sample's HLA typing
/// plus the knobs of one prediction run. `processes` is already normalized against the
/// machine; `max_file_records` caps how many records the predictor feeds its backend per
/// invocation file (`None` = uncapped).
#[derive(Clone, PartialEq, Eq, Debug, Getters, Dissolve)]
pub struct PredictorConfig {
    alleles: Vec<Allele>,
    epitope_lengths: Vec<u8>,
    max_file_records: Option<NonZeroUsize>,
    processes: usize,
}

impl PredictorConfig {
    pub fn new(
        alleles: impl IntoIterator<Item = Allele>,
        epitope_lengths: impl IntoIterator<Item = u8>,
        max_file_records: Option<NonZeroUsize>,
        process_limit: isize,
    ) -> Result<Self> {
        let alleles: Vec<_> = alleles.into_iter().collect();
        ensure!(
            !alleles.is_empty(),
            "Binding prediction requires at least one HLA allele"
        );

        let epitope_lengths: Vec<_> = epitope_lengths.into_iter().collect();
        ensure!(
            !epitope_lengths.is_empty(),
            "Binding prediction requires at least one epitope length"
        );
        ensure!(
            epitope_lengths.iter().all(|&length| length > 0),
            "Epitope lengths must be positive"
        );

        Ok(Self {
            alleles,
            epitope_lengths,
            max_file_records,
            processes: parallelism::processes(process_limit)?,
        })
    }
}

/// Predicts MHC-binding epitopes for the mutant peptides arising from a variant set.
/// Implementations wrap an external predictor (NetMHCcons and the like) and are expected
/// to return only predictions at or below `ic50_cutoff`; with `only_novel` set, peptides
/// that also occur in the germline proteome must be dropped.
#[autoimpl(for <T: trait + ?Sized> &T, Box<T>, Rc<T>, Arc<T>)]
pub trait EpitopePredictor {
    fn predict(
        &self,
        config: &PredictorConfig,
        variants: &VariantSet,
        ic50_cutoff: f64,
        only_novel: bool,
    ) -> Result<Vec<Epitope>>;
}

/// One neoantigen request. The defaults mirror the historical pipeline: union-merged
/// SNVs, 8-11mer peptides, a 500 nM affinity cutoff, and up to ten predictor processes.
#[derive(Clone, PartialEq, Debug, Getters, Dissolve)]
pub struct NeoantigenParams {
    kind: VariantKind,
    merge: Option<MergeKind>,
    epitope_lengths: Vec<u8>,
    ic50_cutoff: f64,
    process_limit: isize,
    max_file_records: Option<NonZeroUsize>,
}

impl Default for NeoantigenParams {
    fn default() -> Self {
        Self {
            kind: VariantKind::Snv,
            merge: Some(MergeKind::Union),
            epitope_lengths: vec![8, 9, 10, 11],
            ic50_cutoff: 500.0,
            process_limit: 10,
            max_file_records: None,
        }
    }
}

impl NeoantigenParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_kind(&mut self, kind: VariantKind) -> &mut Self {
        self.kind = kind;
        self
    }

    pub fn set_merge(&mut self, merge: Option<MergeKind>) -> &mut Self {
        self.merge = merge;
        self
    }

    pub fn set_epitope_lengths(&mut self, lengths: impl IntoIterator<Item = u8>) -> &mut Self {
        self.epitope_lengths = lengths.into_iter().collect();
        self
    }

    pub fn set_ic50_cutoff(&mut self, cutoff: f64) -> &mut Self {
        self.ic50_cutoff = cutoff;
        self
    }

    /// Cap on predictor worker processes. Stored as requested; at prediction time the
    /// value is normalized against the machine (positive caps clamp to the available
    /// cores, zero means one worker, negative values leave that many cores free).
    pub fn set_process_limit(&mut self, limit: isize) -> &mut Self {
        self.process_limit = limit;
        self
    }

    pub fn set_max_file_records(&mut self, cap: Option<NonZeroUsize>) -> &mut Self {
        self.max_file_records = cap;
        self
    }
}

fn stem(kind: VariantKind, merge: Option<MergeKind>) -> String {
    format!("{kind}-{}-neoantigens", merge_label(merge))
}

impl Cohort {
    /// Derive the neoantigen table of one sample.
    ///
    /// Requires an HLA-typed cohort and fails before any cache or file I/O otherwise.
    /// The cache is consulted first; on a miss the sample's variants are resolved
    /// (transitively cached), handed to the predictor together with the sample's
    /// alleles, and the predictions are flattened into a table stamped with the sample
    /// id. The table is memoized before it is returned.
    pub fn resolve_neoantigens(
        &self,
        reader: &impl VariantReader,
        predictor: &impl EpitopePredictor,
        sample_index: usize,
        params: &NeoantigenParams,
    ) -> Result<NeoantigenTable> {
        let sample = self.sample(sample_index)?;
        let Some(alleles) = sample.alleles() else {
            return Err(LoadError::invalid_argument(format!(
                "Cannot derive neoantigens for sample '{}': the cohort has no HLA typing",
                sample.ind()
            ))
            .into());
        };

        let store = self.store();
        let stem = stem(*params.kind(), *params.merge());
        if let Some(cached) = store.load(Category::Neoantigens, sample.ind(), &stem)? {
            return Ok(cached);
        }

        let variants =
            self.resolve_variants(reader, sample_index, *params.kind(), *params.merge())?;

        let config = PredictorConfig::new(
            alleles.iter().cloned(),
            params.epitope_lengths().iter().copied(),
            *params.max_file_records(),
            *params.process_limit(),
        )?;
        let epitopes = predictor
            .predict(&config, &variants, *params.ic50_cutoff(), true)
            .wrap_err_with(|| {
                format!("Binding prediction failed for sample '{}'", sample.ind())
            })?;

        let mut table = NeoantigenTable::tabulate(&epitopes);
        table.tag_sample(sample.ind());

        store.save(&table, Category::Neoantigens, sample.ind(), &stem)?;
        Ok(table)
    }

    /// Derive neoantigens for every sample and concatenate the per-sample tables in
    /// cohort order.
    ///
    /// `on_missing` decides what happens when a sample's variant source is absent:
    /// [`OnMissing::Skip`] warns and omits the sample, [`OnMissing::Fail`] aborts (the
    /// historical behavior of bulk neoantigen derivation). Any other failure aborts
    /// either way.
    pub fn load_neoantigens(
        &self,
        reader: &impl VariantReader,
        predictor: &impl EpitopePredictor,
        params: &NeoantigenParams,
        on_missing: OnMissing,
    ) -> Result<NeoantigenTable> {
        if !self.hla_typed() {
            return Err(LoadError::invalid_argument(
                "Cannot derive neoantigens: the cohort has no HLA typing",
            )
            .into());
        }

        let mut tables = Vec::with_capacity(self.len());
        for (index, sample) in self.samples().enumerate() {
            match self.resolve_neoantigens(reader, predictor, index, params) {
                Ok(table) => tables.push(table),
                Err(report) if on_missing == OnMissing::Skip && is_missing_data(&report) => {
                    warn!(
                        "Variants did not exist for sample '{}', skipping its neoantigens",
                        sample.ind()
                    );
                }
                Err(report) => {
                    return Err(report).wrap_err_with(|| {
                        format!("Failed to derive neoantigens for sample '{}'", sample.ind())
                    });
                }
            }
        }
        Ok(NeoantigenTable::concat(tables))
    }
}
