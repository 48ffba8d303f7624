//! Re-exported so existing call sites keep using `app_helpers::barrier::Barrier`;
//! the primitive itself lives in `dab_core` so `ofdm`'s `SymbolPipeline` can use
//! the same type without `ofdm` depending on this crate.
pub use dab_core::barrier::{Barrier, BarrierError};
