use std::collections::BTreeSet;
use std::fmt::Display;
use std::str::FromStr;

#[cfg(feature = "bitcode")]
use bitcode::{Decode, Encode};
use derive_getters::Dissolve;
use eyre::{bail, ensure, Report, Result};
use serde::{Deserialize, Serialize};

/// Class of a somatic alteration call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "bitcode", derive(Encode, Decode))]
#[serde(rename_all = "lowercase")]
pub enum VariantKind {
    /// Single-nucleotide variant: one reference base replaced by one alternate base.
    Snv,
    /// Short insertion or deletion.
    Indel,
}

impl VariantKind {
    /// Returns the label used in cache file names and configuration.
    pub fn label(&self) -> &'static str {
        match self {
            VariantKind::Snv => "snv",
            VariantKind::Indel => "indel",
        }
    }
}

impl Display for VariantKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for VariantKind {
    type Err = Report;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "snv" => Ok(VariantKind::Snv),
            "indel" => Ok(VariantKind::Indel),
            _ => bail!("Unknown variant kind: {s} (expected 'snv' or 'indel')"),
        }
    }
}

/// Policy for combining variant sets loaded from multiple source files of one sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeKind {
    /// Variants present in at least one source.
    Union,
    /// Variants present in every source.
    Intersection,
}

impl MergeKind {
    /// Returns the label used in cache file names and configuration.
    pub fn label(&self) -> &'static str {
        match self {
            MergeKind::Union => "union",
            MergeKind::Intersection => "intersection",
        }
    }

    /// Combine the given sets according to the policy.
    pub fn apply(&self, sets: &[VariantSet]) -> VariantSet {
        match self {
            MergeKind::Union => VariantSet::union(sets),
            MergeKind::Intersection => VariantSet::intersection(sets),
        }
    }
}

impl Display for MergeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for MergeKind {
    type Err = Report;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "union" => Ok(MergeKind::Union),
            "intersection" => Ok(MergeKind::Intersection),
            _ => bail!("Unknown merge kind: {s} (expected 'union' or 'intersection')"),
        }
    }
}

/// A single genomic alteration call. Alleles are stored uppercase; the position is 1-based.
/// Identity is structural, so the same call loaded from two files compares equal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Dissolve, Serialize, Deserialize)]
#[cfg_attr(feature = "bitcode", derive(Encode, Decode))]
pub struct Variant {
    contig: String,
    position: u64,
    ref_allele: String,
    alt_allele: String,
}

impl Variant {
    pub fn new(
        contig: impl Into<String>,
        position: u64,
        ref_allele: impl Into<String>,
        alt_allele: impl Into<String>,
    ) -> Result<Self> {
        let contig = contig.into();
        ensure!(
            !contig.is_empty() && !contig.contains(char::is_whitespace),
            "Contig must be a non-empty string without whitespace: {contig:?}"
        );
        ensure!(position >= 1, "Position must be 1-based, got {position}");
        Ok(Self {
            contig,
            position,
            ref_allele: parse_allele(ref_allele)?,
            alt_allele: parse_allele(alt_allele)?,
        })
    }

    pub fn contig(&self) -> &str {
        &self.contig
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn ref_allele(&self) -> &str {
        &self.ref_allele
    }

    pub fn alt_allele(&self) -> &str {
        &self.alt_allele
    }

    /// Kind of the call: single-base substitutions are SNVs, everything else is an indel.
    pub fn kind(&self) -> VariantKind {
        if self.ref_allele.len() == 1 && self.alt_allele.len() == 1 {
            VariantKind::Snv
        } else {
            VariantKind::Indel
        }
    }
}

impl Display for Variant {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "{}:{} {}>{}",
            self.contig, self.position, self.ref_allele, self.alt_allele
        )
    }
}

fn parse_allele(allele: impl Into<String>) -> Result<String> {
    let allele = allele.into().to_ascii_uppercase();
    ensure!(!allele.is_empty(), "Allele sequence must not be empty");
    ensure!(
        allele.bytes().all(|b| matches!(b, b'A' | b'C' | b'G' | b'T' | b'N')),
        "Allele sequence must contain only A/C/G/T/N: {allele:?}"
    );
    Ok(allele)
}

/// Set of variant calls for one sample, kept sorted and deduplicated. The canonical order
/// makes equality, iteration, and on-disk encoding deterministic regardless of load order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "bitcode", derive(Encode, Decode))]
pub struct VariantSet {
    variants: Vec<Variant>,
}

impl VariantSet {
    pub fn new(variants: impl IntoIterator<Item = Variant>) -> Self {
        let mut variants: Vec<_> = variants.into_iter().collect();
        variants.sort();
        variants.dedup();
        Self { variants }
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    pub fn contains(&self, variant: &Variant) -> bool {
        self.variants.binary_search(variant).is_ok()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Variant> {
        self.variants.iter()
    }

    /// Variants present in at least one of the given sets. Union of no sets is empty.
    pub fn union(sets: &[VariantSet]) -> VariantSet {
        let merged: BTreeSet<_> = sets.iter().flat_map(|s| s.variants.iter().cloned()).collect();
        VariantSet {
            variants: merged.into_iter().collect(),
        }
    }

    /// Variants present in every given set. Intersection of no sets is empty.
    pub fn intersection(sets: &[VariantSet]) -> VariantSet {
        let Some((first, rest)) = sets.split_first() else {
            return VariantSet::default();
        };
        let variants = first
            .variants
            .iter()
            .filter(|v| rest.iter().all(|s| s.contains(v)))
            .cloned()
            .collect();
        VariantSet { variants }
    }
}

impl FromIterator<Variant> for VariantSet {
    fn from_iter<I: IntoIterator<Item = Variant>>(iter: I) -> Self {
        VariantSet::new(iter)
    }
}

impl IntoIterator for VariantSet {
    type Item = Variant;
    type IntoIter = std::vec::IntoIter<Variant>;

    fn into_iter(self) -> Self::IntoIter {
        self.variants.into_iter()
    }
}

#[cfg(test)]
impl Variant {
    /// Shorthand SNV constructor for tests.
    pub fn dummy(contig: &str, position: u64) -> Self {
        Variant::new(contig, position, "A", "T").unwrap()
    }
}
