use std::fs;
use std::path::{Path, PathBuf};

use eyre::{ensure, Result, WrapErr};

use crate::payload::Payload;

/// Top-level cache partitions. Each owns an independent subtree under the cache root and
/// can be cleared without touching the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    Variants,
    Neoantigens,
}

impl Category {
    pub const ALL: [Category; 2] = [Category::Variants, Category::Neoantigens];

    /// Directory name of the partition under the cache root.
    pub fn dirname(&self) -> &'static str {
        match self {
            Category::Variants => "cached-variants",
            Category::Neoantigens => "cached-neoantigens",
        }
    }
}

/// Disk-backed store for memoized per-sample results, laid out as
/// `root/<category>/<sample>/<stem>.<extension>` with the extension taken from the
/// payload's format. A disabled store bypasses the filesystem entirely: loads miss and
/// saves are dropped, which callers use to force recomputation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStore {
    root: PathBuf,
    enabled: bool,
}

impl CacheStore {
    pub fn new(root: impl Into<PathBuf>, enabled: bool) -> Self {
        Self {
            root: root.into(),
            enabled,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    fn entry(&self, category: Category, sample: &str, stem: &str, extension: &str) -> Result<PathBuf> {
        for (name, value) in [("Sample id", sample), ("Entry stem", stem)] {
            ensure!(!value.is_empty(), "{name} must not be empty");
            ensure!(
                !value.contains(['/', '\\']) && value != "." && value != "..",
                "{name} must stay within the cache tree: {value:?}"
            );
        }
        Ok(self
            .root
            .join(category.dirname())
            .join(sample)
            .join(format!("{stem}.{extension}")))
    }

    /// Fetch a memoized value. `Ok(None)` means a miss (no entry, or the store is
    /// disabled); an entry that exists but cannot be decoded is an error.
    pub fn load<P: Payload>(&self, category: Category, sample: &str, stem: &str) -> Result<Option<P>> {
        if !self.enabled {
            return Ok(None);
        }

        let path = self.entry(category, sample, stem, P::FORMAT.extension())?;
        if !path.try_exists()? {
            return Ok(None);
        }

        let bytes = fs::read(&path)
            .wrap_err_with(|| format!("Failed to read the cache entry at {}", path.display()))?;
        let value = P::decode(&bytes)
            .wrap_err_with(|| format!("Failed to decode the cache entry at {}", path.display()))?;
        Ok(Some(value))
    }

    /// Memoize a value, overwriting any previous entry. Missing directories are created
    /// on demand; the entry is written to a temp file and renamed into place so readers
    /// never observe a torn write.
    pub fn save<P: Payload>(&self, value: &P, category: Category, sample: &str, stem: &str) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        let path = self.entry(category, sample, stem, P::FORMAT.extension())?;
        let bytes = value.encode()?;

        // Infallible given how entries are constructed
        let dir = path.parent().unwrap_or(&self.root);
        fs::create_dir_all(dir)
            .wrap_err_with(|| format!("Failed to create the cache directory {}", dir.display()))?;

        let tmp = dir.join(format!(".{stem}.{}.tmp", std::process::id()));
        fs::write(&tmp, &bytes)
            .wrap_err_with(|| format!("Failed to write the cache entry at {}", tmp.display()))?;
        fs::rename(&tmp, &path)
            .wrap_err_with(|| format!("Failed to publish the cache entry at {}", path.display()))?;
        Ok(())
    }

    /// Drop every entry in the given partition. Clearing a partition that was never
    /// written is a no-op.
    pub fn clear(&self, category: Category) -> Result<()> {
        let dir = self.root.join(category.dirname());
        if dir.try_exists()? {
            fs::remove_dir_all(&dir)
                .wrap_err_with(|| format!("Failed to clear the cache at {}", dir.display()))?;
        }
        Ok(())
    }

    /// Drop every entry in every partition.
    pub fn clear_all(&self) -> Result<()> {
        for category in Category::ALL {
            self.clear(category)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use neocohort_core_rs::epitope::NeoantigenTable;
    use neocohort_core_rs::variant::{Variant, VariantSet};

    use super::*;

    fn variants() -> VariantSet {
        VariantSet::new([Variant::new("chr1", 100, "A", "T").unwrap()])
    }

    #[test]
    fn test_save_load_round_trip() -> Result<()> {
        let root = tempfile::tempdir()?;
        let store = CacheStore::new(root.path(), true);

        let set = variants();
        store.save(&set, Category::Variants, "patient-1", "snv-union-variants")?;

        let expected = root
            .path()
            .join("cached-variants/patient-1/snv-union-variants.bin");
        assert!(expected.is_file());

        let loaded: Option<VariantSet> =
            store.load(Category::Variants, "patient-1", "snv-union-variants")?;
        assert_eq!(loaded, Some(set));
        Ok(())
    }

    #[test]
    fn test_missing_entry_is_a_miss() -> Result<()> {
        let root = tempfile::tempdir()?;
        let store = CacheStore::new(root.path(), true);

        let loaded: Option<VariantSet> = store.load(Category::Variants, "patient-1", "absent")?;
        assert_eq!(loaded, None);
        Ok(())
    }

    #[test]
    fn test_disabled_store_bypasses_the_disk() -> Result<()> {
        let root = tempfile::tempdir()?;

        // Populate an entry with an enabled store first
        CacheStore::new(root.path(), true).save(
            &variants(),
            Category::Variants,
            "patient-1",
            "snv-none-variants",
        )?;

        let disabled = CacheStore::new(root.path(), false);
        let loaded: Option<VariantSet> =
            disabled.load(Category::Variants, "patient-1", "snv-none-variants")?;
        assert_eq!(loaded, None);

        disabled.save(&variants(), Category::Variants, "patient-2", "snv-none-variants")?;
        assert!(!root.path().join("cached-variants/patient-2").exists());
        Ok(())
    }

    #[test]
    fn test_overwrite_replaces_the_entry() -> Result<()> {
        let root = tempfile::tempdir()?;
        let store = CacheStore::new(root.path(), true);

        store.save(&variants(), Category::Variants, "patient-1", "snv-none-variants")?;
        let replacement = VariantSet::new([Variant::new("chr9", 9, "G", "C").unwrap()]);
        store.save(&replacement, Category::Variants, "patient-1", "snv-none-variants")?;

        let loaded: Option<VariantSet> =
            store.load(Category::Variants, "patient-1", "snv-none-variants")?;
        assert_eq!(loaded, Some(replacement));
        Ok(())
    }

    #[test]
    fn test_corrupt_entry_propagates() -> Result<()> {
        let root = tempfile::tempdir()?;
        let store = CacheStore::new(root.path(), true);

        let dir = root.path().join("cached-variants/patient-1");
        fs::create_dir_all(&dir)?;
        fs::write(dir.join("snv-union-variants.bin"), b"garbage")?;

        let loaded: Result<Option<VariantSet>> =
            store.load(Category::Variants, "patient-1", "snv-union-variants");
        assert!(loaded.is_err());
        Ok(())
    }

    #[test]
    fn test_clear_is_isolated_per_category() -> Result<()> {
        let root = tempfile::tempdir()?;
        let store = CacheStore::new(root.path(), true);

        store.save(&variants(), Category::Variants, "patient-1", "snv-union-variants")?;
        store.save(
            &NeoantigenTable::default(),
            Category::Neoantigens,
            "patient-1",
            "snv-union-neoantigens",
        )?;

        store.clear(Category::Variants)?;
        assert!(!root.path().join("cached-variants").exists());
        assert!(root
            .path()
            .join("cached-neoantigens/patient-1/snv-union-neoantigens.csv")
            .is_file());

        // Clearing an already-absent partition is fine
        store.clear(Category::Variants)?;

        store.clear_all()?;
        assert!(!root.path().join("cached-neoantigens").exists());
        Ok(())
    }

    #[test]
    fn test_path_separators_are_rejected() {
        let store = CacheStore::new("/tmp/anywhere", true);
        assert!(store
            .load::<VariantSet>(Category::Variants, "../escape", "stem")
            .is_err());
        assert!(store.load::<VariantSet>(Category::Variants, "", "stem").is_err());
    }
}
