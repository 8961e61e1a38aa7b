use std::collections::BTreeMap;
use std::fmt::{self, Debug, Display, Formatter};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use derive_more::Constructor;
use eyre::{ensure, Result};
use itertools::Itertools;

use neocohort_cache_rs::{CacheStore, Category};
use neocohort_core_rs::hla::Allele;
use neocohort_core_rs::variant::VariantKind;

use crate::error::LoadError;
use crate::{parse, validate};

/// Derives the name of one variant source file from a sample's identifiers
/// `(sample_id, normal_bam_id, tumor_bam_id)`. Namers must be pure: the engine calls
/// them on every resolution and expects the same name each time.
pub type FileNamer = Arc<dyn Fn(&str, &str, &str) -> String + Send + Sync>;

/// Immutable description of a tumor/normal cohort and the conventions for locating its
/// variant source files.
///
/// A `Cohort` holds parallel, index-aligned lists: the i-th sample id, normal BAM id,
/// tumor BAM id, and (when the cohort is HLA-typed) HLA allele list all describe the
/// same patient sample. Per variant kind it carries an ordered registry of [`FileNamer`]
/// functions; each one names a source file that the merge engine loads and combines.
///
/// The struct is configuration only. Loading and derivation live in the engine methods
/// (`resolve_variants`, `load_variants`, `resolve_neoantigens`, `load_neoantigens`),
/// which take the I/O collaborators as arguments.
#[derive(Clone)]
pub struct Cohort {
    data_dir: PathBuf,
    cache_dir: PathBuf,
    cache_results: bool,
    sample_ids: Vec<String>,
    normal_bam_ids: Vec<String>,
    tumor_bam_ids: Vec<String>,
    hla_alleles: Option<Vec<Vec<Allele>>>,
    namers: BTreeMap<VariantKind, Vec<FileNamer>>,
}

impl Cohort {
    /// Constructs a new `Cohort`.
    ///
    /// Validates that:
    /// 1. `sample_ids` is non-empty, free of empty strings, and free of duplicates.
    /// 2. `normal_bam_ids` and `tumor_bam_ids` align with `sample_ids` index by index.
    /// 3. `hla_alleles`, when given, aligns with `sample_ids` and every per-sample list
    ///    is non-empty (a cohort is either fully HLA-typed or not typed at all).
    /// 4. Every registered namer list contains at least one function.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        data_dir: impl Into<PathBuf>,
        cache_dir: impl Into<PathBuf>,
        cache_results: bool,
        sample_ids: impl IntoIterator<Item = impl Into<String>>,
        normal_bam_ids: impl IntoIterator<Item = impl Into<String>>,
        tumor_bam_ids: impl IntoIterator<Item = impl Into<String>>,
        hla_alleles: Option<Vec<Vec<Allele>>>,
        namers: impl IntoIterator<Item = (VariantKind, Vec<FileNamer>)>,
    ) -> Result<Self> {
        let sample_ids = parse::ids("Cohort::sample_ids", sample_ids)?;
        let normal_bam_ids = parse::ids("Cohort::normal_bam_ids", normal_bam_ids)?;
        let tumor_bam_ids = parse::ids("Cohort::tumor_bam_ids", tumor_bam_ids)?;

        validate::unique_ids("Sample", sample_ids.iter().map(String::as_str))?;
        validate::aligned(
            "Cohort::sample_ids",
            sample_ids.len(),
            "Cohort::normal_bam_ids",
            normal_bam_ids.len(),
        )?;
        validate::aligned(
            "Cohort::sample_ids",
            sample_ids.len(),
            "Cohort::tumor_bam_ids",
            tumor_bam_ids.len(),
        )?;

        if let Some(hla) = &hla_alleles {
            validate::aligned(
                "Cohort::sample_ids",
                sample_ids.len(),
                "Cohort::hla_alleles",
                hla.len(),
            )?;
            for (ind, alleles) in sample_ids.iter().zip(hla) {
                ensure!(
                    !alleles.is_empty(),
                    "HLA alleles for sample '{ind}' must not be empty"
                );
            }
        }

        let namers: BTreeMap<_, _> = namers.into_iter().collect();
        for (kind, funcs) in &namers {
            ensure!(
                !funcs.is_empty(),
                "At least one file namer must be registered for {kind} variants"
            );
        }

        Ok(Self {
            data_dir: data_dir.into(),
            cache_dir: cache_dir.into(),
            cache_results,
            sample_ids,
            normal_bam_ids,
            tumor_bam_ids,
            hla_alleles,
            namers,
        })
    }

    /// Directory holding the variant source files that namers resolve against.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Root of the on-disk cache tree.
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Whether resolved results are memoized. When off, every resolution recomputes and
    /// nothing is read from or written to the cache tree.
    pub fn cache_results(&self) -> bool {
        self.cache_results
    }

    /// Number of samples in the cohort.
    pub fn len(&self) -> usize {
        self.sample_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sample_ids.is_empty()
    }

    /// Whether HLA typing was configured. Typing is cohort-wide: either every sample has
    /// alleles or none does.
    pub fn hla_typed(&self) -> bool {
        self.hla_alleles.is_some()
    }

    /// View of the sample at the given index.
    pub fn sample(&self, index: usize) -> Result<SampleRef<'_>> {
        if index >= self.len() {
            return Err(LoadError::invalid_argument(format!(
                "Sample index {index} is out of range for a cohort of {} samples",
                self.len()
            ))
            .into());
        }
        Ok(self.sample_at(index))
    }

    /// Iterate over samples in cohort order.
    pub fn samples(&self) -> impl Iterator<Item = SampleRef<'_>> + '_ {
        (0..self.len()).map(move |index| self.sample_at(index))
    }

    fn sample_at(&self, index: usize) -> SampleRef<'_> {
        SampleRef::new(
            &self.sample_ids[index],
            &self.normal_bam_ids[index],
            &self.tumor_bam_ids[index],
            self.hla_alleles.as_ref().map(|hla| hla[index].as_slice()),
        )
    }

    /// Registered file namers for the given variant kind, in registration order.
    pub fn namers(&self, kind: VariantKind) -> Option<&[FileNamer]> {
        self.namers.get(&kind).map(Vec::as_slice)
    }

    /// Store view over this cohort's cache directory and caching toggle.
    pub fn store(&self) -> CacheStore {
        CacheStore::new(&self.cache_dir, self.cache_results)
    }

    /// Drop all memoized results, variants and neoantigens alike.
    pub fn clear_caches(&self) -> Result<()> {
        self.store().clear_all()
    }

    /// Drop memoized variant sets only.
    pub fn clear_variant_cache(&self) -> Result<()> {
        self.store().clear(Category::Variants)
    }

    /// Drop memoized neoantigen tables only.
    pub fn clear_neoantigen_cache(&self) -> Result<()> {
        self.store().clear(Category::Neoantigens)
    }
}

impl Debug for Cohort {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Cohort({} samples)", self.len())
    }
}

impl Display for Cohort {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "Cohort of {} samples", self.len())?;
        writeln!(f, "Data dir: {}", self.data_dir.display())?;
        writeln!(
            f,
            "Cache dir: {} (caching {})",
            self.cache_dir.display(),
            if self.cache_results { "on" } else { "off" }
        )?;
        writeln!(
            f,
            "HLA typing: {}",
            if self.hla_typed() { "present" } else { "absent" }
        )?;
        if !self.namers.is_empty() {
            writeln!(
                f,
                "Namers: {}",
                self.namers
                    .iter()
                    .map(|(kind, funcs)| format!("{kind} ({})", funcs.len()))
                    .join(", ")
            )?;
        }
        Ok(())
    }
}

/// Borrowed view of one cohort entry: the sample id, its BAM ids, and its HLA alleles
/// when the cohort is typed.
#[derive(Debug, Clone, Copy, Constructor)]
pub struct SampleRef<'a> {
    ind: &'a str,
    normal_bam: &'a str,
    tumor_bam: &'a str,
    alleles: Option<&'a [Allele]>,
}

impl<'a> SampleRef<'a> {
    pub fn ind(&self) -> &'a str {
        self.ind
    }

    pub fn normal_bam(&self) -> &'a str {
        self.normal_bam
    }

    pub fn tumor_bam(&self) -> &'a str {
        self.tumor_bam
    }

    pub fn alleles(&self) -> Option<&'a [Allele]> {
        self.alleles
    }
}

#[cfg(test)]
impl Cohort {
    /// Two-sample HLA-typed cohort with one SNV namer and one indel namer.
    pub fn dummy() -> Self {
        let typing = vec![
            vec![Allele::new("HLA-A*02:01").unwrap()],
            vec![
                Allele::new("HLA-A*01:01").unwrap(),
                Allele::new("HLA-B*57:01").unwrap(),
            ],
        ];
        Cohort::new(
            "./data",
            "./cache",
            true,
            ["patient-1", "patient-2"],
            ["normal-1", "normal-2"],
            ["tumor-1", "tumor-2"],
            Some(typing),
            [
                (
                    VariantKind::Snv,
                    vec![Arc::new(|_: &str, _: &str, tumor: &str| format!("{tumor}.snv.vcf"))
                        as FileNamer],
                ),
                (
                    VariantKind::Indel,
                    vec![Arc::new(|_: &str, _: &str, tumor: &str| {
                        format!("{tumor}.indel.vcf")
                    }) as FileNamer],
                ),
            ],
        )
        .unwrap()
    }
}
