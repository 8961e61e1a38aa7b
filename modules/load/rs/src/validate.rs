use eyre::{ensure, Result};
use itertools::Itertools;

pub fn aligned(reference: &str, expected: usize, name: &str, actual: usize) -> Result<()> {
    ensure!(
        actual == expected,
        "'{name}' must align with '{reference}': {actual} entries vs {expected}"
    );
    Ok(())
}

pub fn unique_ids<'a>(id_type: &str, ids: impl IntoIterator<Item = &'a str>) -> Result<()> {
    let duplicates = ids.into_iter().duplicates().collect_vec();
    ensure!(
        duplicates.is_empty(),
        "{id_type} ids must be unique, found duplicates: {}",
        duplicates.join(", ")
    );
    Ok(())
}
