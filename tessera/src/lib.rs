#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![doc = include_str!("../README.md")]

pub use tessera_core::*;

pub use tessera_plan::{CodecPlan, DecodePlan, PlanCache, WriteStep};

/// JSON decoding and encoding.
#[cfg(feature = "json")]
pub mod json {
    pub use tessera_json::*;
}

#[cfg(feature = "json")]
pub use tessera_json::{CodecOptions, Decoder, Encoder, WriterOptions};
