use crate::Variant;
use color_eyre::eyre::{eyre, Report, Result};
use color_eyre::Help;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

// ----------------------------------------------------------------------------
// Variant Selector
// ----------------------------------------------------------------------------

/// A query against a sample universe.
///
/// Samples carrying at least `match_percentage` of the [`Variant`] mutations, or
/// belonging to the named lineage, are selected.
///
/// ## Examples
///
/// ```rust
/// use covcurate_variant::{Variant, VariantSelector};
///
/// let selector = VariantSelector::new(Variant::from_mutations(["S:N501Y", "S:E484K"]), 0.8)?;
/// assert_eq!(selector.match_percentage(), 0.8);
///
/// assert!(VariantSelector::new(Variant::lineage("P.1"), 0.0).is_err());
/// assert!(VariantSelector::new(Variant::lineage("P.1"), 1.5).is_err());
/// # Ok::<(), color_eyre::eyre::Report>(())
/// ```
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", try_from = "RawSelector")]
pub struct VariantSelector {
    pub variant: Variant,
    match_percentage: f64,
}

impl VariantSelector {
    /// Returns a new [`VariantSelector`], checking that the match percentage is in `(0, 1]`.
    pub fn new(variant: Variant, match_percentage: f64) -> Result<Self, Report> {
        if !(match_percentage > 0.0 && match_percentage <= 1.0) {
            return Err(eyre!("Match percentage {match_percentage} of {variant} is out of range.")
                .suggestion("Use a fraction greater than 0 and at most 1."));
        }
        Ok(VariantSelector { variant, match_percentage })
    }

    /// Returns a selector for exactly the named lineage, with a match percentage of 1.
    ///
    /// ```rust
    /// use covcurate_variant::VariantSelector;
    /// let selector = VariantSelector::lineage("B.1.617.2");
    /// assert!(selector.variant.is_pure_lineage());
    /// assert_eq!(selector.match_percentage(), 1.0);
    /// ```
    pub fn lineage(name: &str) -> Self {
        VariantSelector { variant: Variant::lineage(name), match_percentage: 1.0 }
    }

    pub fn match_percentage(&self) -> f64 {
        self.match_percentage
    }

    /// Lineage name without wildcard markers, see [`Variant::base_name`].
    pub fn base_name(&self) -> Option<String> {
        self.variant.base_name()
    }
}

impl Display for VariantSelector {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{}", self.variant)
    }
}

/// Unchecked wire shape, validated on the way in.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSelector {
    variant: Variant,
    match_percentage: f64,
}

impl TryFrom<RawSelector> for VariantSelector {
    type Error = Report;

    fn try_from(raw: RawSelector) -> Result<Self, Report> {
        VariantSelector::new(raw.variant, raw.match_percentage)
    }
}
