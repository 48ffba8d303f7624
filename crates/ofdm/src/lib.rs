pub mod circular_bucket;
pub mod linear_bucket;
pub mod ofdm_demodulator;
pub mod ofdm_parameters;
pub mod symbol_pipeline;
