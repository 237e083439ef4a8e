#![doc = include_str!("../README.md")]

mod mutation;
mod selector;
mod variant;

#[doc(inline)]
pub use mutation::{sort_mutations, Gene, Mutation, Signature};
#[doc(inline)]
pub use selector::VariantSelector;
#[doc(inline)]
pub use variant::{Variant, WILDCARD};
