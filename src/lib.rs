#![doc = include_str!("../README.md")]

pub mod api;
#[cfg(feature = "cli")]
pub mod cli;
pub mod discovery;
pub mod known;
pub mod pipeline;
pub mod run;

#[doc(inline)]
#[cfg(feature = "cli")]
pub use crate::cli::Cli;
#[doc(inline)]
pub use crate::known::{Catalogue, KnownVariant, VariantList};
#[doc(inline)]
pub use crate::pipeline::{KnownVariantPipeline, NewVariantPipeline, Selection};
#[doc(inline)]
pub use covcurate_variant::{Signature, Variant, VariantSelector};
