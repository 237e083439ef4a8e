use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Suffix marking a lineage name as "this lineage and all of its sub-lineages".
pub const WILDCARD: char = '*';

// ----------------------------------------------------------------------------
// Variant
// ----------------------------------------------------------------------------

/// A [`Variant`] is identified by a pangolin lineage name, an explicit set of mutations, or both.
///
/// ## Examples
///
/// ```rust
/// use covcurate_variant::Variant;
///
/// let variant = Variant::lineage("B.1.1.7");
/// assert!(variant.is_pure_lineage());
/// assert_eq!(variant.to_string(), "B.1.1.7");
///
/// let variant = Variant { name: Some("B.1*".to_string()), mutations: vec!["S:E484K".to_string()] };
/// assert_eq!(variant.base_name(), Some("B.1".to_string()));
/// assert_eq!(variant.to_string(), "B.1* + S:E484K");
/// ```
#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Variant {
    /// Pangolin lineage, optionally with a trailing [`WILDCARD`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Defining mutations, in the order they were supplied.
    #[serde(default)]
    pub mutations: Vec<String>,
}

impl Variant {
    /// Returns a [`Variant`] defined only by a pangolin lineage name.
    pub fn lineage(name: &str) -> Self {
        Variant { name: Some(name.to_string()), mutations: Vec::new() }
    }

    /// Returns a [`Variant`] defined only by its mutations.
    pub fn from_mutations<I, S>(mutations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Variant { name: None, mutations: mutations.into_iter().map(Into::into).collect() }
    }

    /// Returns the lineage name with every wildcard marker removed.
    ///
    /// ```rust
    /// use covcurate_variant::Variant;
    /// assert_eq!(Variant::lineage("BA.2*").base_name(), Some("BA.2".to_string()));
    /// assert_eq!(Variant::from_mutations(["S:N501Y"]).base_name(), None);
    /// ```
    pub fn base_name(&self) -> Option<String> {
        self.name.as_ref().map(|name| name.replace(WILDCARD, ""))
    }

    /// True if the lineage name includes sub-lineages.
    pub fn is_wildcard(&self) -> bool {
        self.name.as_ref().is_some_and(|name| name.ends_with(WILDCARD))
    }

    /// True if the variant is a named lineage with no explicit mutations.
    pub fn is_pure_lineage(&self) -> bool {
        self.name.is_some() && self.mutations.is_empty()
    }

    /// True if both variants render to the same display name.
    ///
    /// The dashboard highlights the selected card with this comparison.
    pub fn is_same_display(&self, other: &Variant) -> bool {
        self.to_string() == other.to_string()
    }
}

impl Display for Variant {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        let mutations = self.mutations.join(", ");
        match (&self.name, mutations.is_empty()) {
            (Some(name), true) => write!(f, "{name}"),
            (Some(name), false) => write!(f, "{name} + {mutations}"),
            (None, _) => write!(f, "{mutations}"),
        }
    }
}
