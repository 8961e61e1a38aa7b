use eyre::{ensure, Result};

pub fn ids(
    name: &str,
    values: impl IntoIterator<Item = impl Into<String>>,
) -> Result<Vec<String>> {
    let values: Vec<String> = values
        .into_iter()
        .map(|value| {
            let value = value.into();
            ensure!(!value.is_empty(), "{name} must not contain empty ids");
            // Sample ids become cache directory names, so path-like ids must be
            // rejected here rather than at the first resolution
            ensure!(
                !value.contains(['/', '\\']) && value != "." && value != "..",
                "{name} ids must be plain names, not paths: {value:?}"
            );
            Ok(value)
        })
        .collect::<Result<_>>()?;
    ensure!(!values.is_empty(), "{name} must not be an empty collection");
    Ok(values)
}
