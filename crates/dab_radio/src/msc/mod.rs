pub mod cif_deinterleaver;
pub mod eep_tables;
pub mod msc_decoder;
pub mod uep_tables;
