use eyre::{Result, WrapErr};

use neocohort_core_rs::epitope::{NeoantigenRow, NeoantigenTable};
use neocohort_core_rs::variant::VariantSet;

/// On-disk representation of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    /// Headered CSV, readable outside this crate.
    Table,
    /// Opaque binary encoding, valid only for the type that wrote it.
    Binary,
}

impl Format {
    /// File extension marking the format on disk.
    pub fn extension(&self) -> &'static str {
        match self {
            Format::Table => "csv",
            Format::Binary => "bin",
        }
    }
}

/// A value the store can persist. The format is part of the type, so the store never
/// inspects values at runtime to decide how to encode them.
pub trait Payload: Sized {
    const FORMAT: Format;

    fn encode(&self) -> Result<Vec<u8>>;
    fn decode(bytes: &[u8]) -> Result<Self>;
}

impl Payload for VariantSet {
    const FORMAT: Format = Format::Binary;

    fn encode(&self) -> Result<Vec<u8>> {
        Ok(bitcode::encode(self))
    }

    fn decode(bytes: &[u8]) -> Result<Self> {
        bitcode::decode(bytes).wrap_err("Failed to decode a binary variant-set entry")
    }
}

impl Payload for NeoantigenTable {
    const FORMAT: Format = Format::Table;

    fn encode(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        {
            // Headers are written explicitly so that an empty table still produces a
            // well-formed, header-only file.
            let mut writer = csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(&mut bytes);
            writer
                .write_record(NeoantigenRow::COLUMNS)
                .wrap_err("Failed to write the CSV header")?;
            for row in self.rows() {
                writer.serialize(row).wrap_err("Failed to serialize a neoantigen row")?;
            }
            writer.flush()?;
        }
        Ok(bytes)
    }

    fn decode(bytes: &[u8]) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(bytes);
        let rows = reader
            .deserialize()
            .collect::<Result<Vec<NeoantigenRow>, _>>()
            .wrap_err("Failed to parse a tabular neoantigen entry")?;
        Ok(rows.into())
    }
}
