pub mod barrier;
pub mod crc;
pub mod dab_parameters;
pub mod dab_transmission_modes;
pub mod error;
pub mod modified_julian_date;
pub mod puncture;
pub mod scrambler;
pub mod soft_bits;
pub mod viterbi;
