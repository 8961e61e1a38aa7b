pub mod epitope;
pub mod hla;
pub mod parallelism;
pub mod variant;
