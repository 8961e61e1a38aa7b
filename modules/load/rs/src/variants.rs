use std::collections::BTreeMap;
use std::mem;
use std::path::Path;
use std::rc::Rc;
use std::sync::Arc;

use eyre::{Result, WrapErr};
use impl_tools::autoimpl;
use log::warn;

use neocohort_cache_rs::Category;
use neocohort_core_rs::variant::{MergeKind, Variant, VariantKind, VariantSet};

use crate::cohort::Cohort;
use crate::error::{is_missing_data, LoadError, OnMissing};

/// Parses one variant call file into the records it contains. Implemented by the
/// embedding application for whatever formats its pipeline produces (VCF, MAF, ...).
#[autoimpl(for <T: trait + ?Sized> &T, Box<T>, Rc<T>, Arc<T>)]
pub trait VariantReader {
    fn read_variants(&self, path: &Path) -> Result<Vec<Variant>>;
}

/// Label of the merge slot in cache file stems; the absent merge is spelled out so
/// single-source and merged resolutions never share an entry.
pub(crate) fn merge_label(merge: Option<MergeKind>) -> &'static str {
    match merge {
        Some(kind) => kind.label(),
        None => "none",
    }
}

fn stem(kind: VariantKind, merge: Option<MergeKind>) -> String {
    format!("{kind}-{}-variants", merge_label(merge))
}

impl Cohort {
    /// Resolve the merged variant set of one sample.
    ///
    /// The cache is consulted first; on a hit no source file is touched. On a miss,
    /// every namer registered for `kind` contributes one source file: the files are read
    /// through `reader`, each becomes a set, and the sets are combined according to
    /// `merge`. A single source must come with `merge = None`; two or more sources
    /// require an explicit merge kind. The result is memoized before it is returned.
    pub fn resolve_variants(
        &self,
        reader: &impl VariantReader,
        sample_index: usize,
        kind: VariantKind,
        merge: Option<MergeKind>,
    ) -> Result<VariantSet> {
        let sample = self.sample(sample_index)?;
        let store = self.store();
        let stem = stem(kind, merge);

        if let Some(cached) = store.load(Category::Variants, sample.ind(), &stem)? {
            return Ok(cached);
        }

        let namers = self.namers(kind).ok_or_else(|| {
            LoadError::invalid_argument(format!(
                "No file namers are registered for {kind} variants"
            ))
        })?;

        let mut sets = Vec::with_capacity(namers.len());
        for namer in namers {
            let name = namer(sample.ind(), sample.normal_bam(), sample.tumor_bam());
            let path = self.data_dir().join(&name);
            if !path.try_exists()? {
                return Err(LoadError::missing_data(sample.ind(), path).into());
            }

            let records = reader
                .read_variants(&path)
                .wrap_err_with(|| format!("Failed to read variants from {}", path.display()))?;
            sets.push(VariantSet::new(records));
        }

        let resolved = match &mut sets[..] {
            [only] => {
                if let Some(merge) = merge {
                    return Err(LoadError::invalid_argument(format!(
                        "Merge kind '{merge}' was given, but sample '{}' has a single {kind} \
                         variant source and nothing to merge",
                        sample.ind()
                    ))
                    .into());
                }
                mem::take(only)
            }
            sources => {
                let Some(merge) = merge else {
                    return Err(LoadError::invalid_argument(format!(
                        "A merge kind is required to combine {} {kind} variant sources for \
                         sample '{}'",
                        sources.len(),
                        sample.ind()
                    ))
                    .into());
                };
                merge.apply(sources)
            }
        };

        store.save(&resolved, Category::Variants, sample.ind(), &stem)?;
        Ok(resolved)
    }

    /// Resolve variants for every sample in the cohort, keyed by sample id.
    ///
    /// `on_missing` decides what happens when a sample's source file is absent:
    /// [`OnMissing::Skip`] warns and omits the sample (the historical behavior of bulk
    /// variant loading), [`OnMissing::Fail`] aborts. Any other failure aborts either way.
    pub fn load_variants(
        &self,
        reader: &impl VariantReader,
        kind: VariantKind,
        merge: Option<MergeKind>,
        on_missing: OnMissing,
    ) -> Result<BTreeMap<String, VariantSet>> {
        let mut loaded = BTreeMap::new();
        for (index, sample) in self.samples().enumerate() {
            match self.resolve_variants(reader, index, kind, merge) {
                Ok(set) => {
                    loaded.insert(sample.ind().to_string(), set);
                }
                Err(report) if on_missing == OnMissing::Skip && is_missing_data(&report) => {
                    warn!("Variants did not exist for sample '{}', skipping it", sample.ind());
                }
                Err(report) => {
                    return Err(report).wrap_err_with(|| {
                        format!("Failed to load {kind} variants for sample '{}'", sample.ind())
                    });
                }
            }
        }
        Ok(loaded)
    }
}
