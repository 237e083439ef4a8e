//! New-variant discovery: filter, score, and deduplicate candidate mutation sets.


use color_eyre::eyre::Report;
use covcurate_variant::{Signature, Variant};
use indoc::formatdoc;
use itertools::Itertools;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Mutations with a uniqueness score of at least this value are characteristic for a variant.
pub const UNIQUENESS_SCORE_IMPORTANCE_THRESHOLD: f64 = 0.5;

/// Maximum number of new variants shown.
pub const MAX_NEW_VARIANTS: usize = 200;

// ----------------------------------------------------------------------------
// Candidates
// ----------------------------------------------------------------------------

/// How characteristic a mutation is for a candidate variant.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationStat {
    pub mutation: String,
    /// Between 0 and 1.
    pub uniqueness_score: f64,
}

impl MutationStat {
    #[allow(clippy::neg_cmp_op_on_partial_ord)]
    pub fn is_characteristic(&self) -> bool {
        // unscored (NaN) mutations are kept
        !(self.uniqueness_score < UNIQUENESS_SCORE_IMPORTANCE_THRESHOLD)
    }
}

/// Estimated transmission advantage with its confidence interval.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Advantage {
    pub value: f64,
    pub ci_lower: f64,
    pub ci_upper: f64,
}

impl Display for Advantage {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{:.4} [{:.2}, {:.2}]", self.value, self.ci_lower, self.ci_upper)
    }
}

/// A candidate variant suggested by the interesting-variant service.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InterestingVariant {
    pub mutations: Vec<MutationStat>,
    pub f: Advantage,
    pub absolute_number_samples_in_past_three_months: u64,
    pub relative_number_samples_in_past_three_months: f64,
}

impl InterestingVariant {
    /// The variant handed on when this candidate is selected, with all of its mutations.
    pub fn variant(&self) -> Variant {
        Variant::from_mutations(self.mutations.iter().map(|m| m.mutation.clone()))
    }
}

/// Candidates of one country, sorted by descending advantage.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InterestingVariantResult {
    #[serde(default)]
    pub computed_at: Option<String>,
    pub variants: Vec<InterestingVariant>,
}

// ----------------------------------------------------------------------------
// Gene Filter
// ----------------------------------------------------------------------------

/// Restrict visible mutations to one gene.
///
/// ```rust
/// use covcurate::discovery::GeneFilter;
/// use std::str::FromStr;
///
/// assert_eq!(GeneFilter::from_str("-")?, GeneFilter::All);
/// assert_eq!(GeneFilter::from_str("S")?, GeneFilter::Gene("S".to_string()));
/// assert_eq!(GeneFilter::from_str("ORF1a")?.to_string(), "ORF1a");
/// # Ok::<(), color_eyre::eyre::Report>(())
/// ```
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub enum GeneFilter {
    #[default]
    All,
    Gene(String),
}

impl GeneFilter {
    /// Sentinel that disables the filter.
    pub const ALL: &'static str = "-";

    pub fn matches(&self, mutation: &str) -> bool {
        match self {
            GeneFilter::All => true,
            GeneFilter::Gene(prefix) => {
                mutation.strip_prefix(prefix.as_str()).is_some_and(|rest| rest.starts_with(':'))
            }
        }
    }
}

impl Display for GeneFilter {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            GeneFilter::All => write!(f, "{}", GeneFilter::ALL),
            GeneFilter::Gene(prefix) => write!(f, "{prefix}"),
        }
    }
}

impl FromStr for GeneFilter {
    type Err = Report;

    fn from_str(s: &str) -> Result<Self, Report> {
        match s {
            GeneFilter::ALL => Ok(GeneFilter::All),
            prefix => Ok(GeneFilter::Gene(prefix.to_string())),
        }
    }
}

/// The filters of the new-variant view.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DiscoveryFilter {
    pub gene: GeneFilter,
    /// Only show characteristic mutations.
    pub characteristic_only: bool,
}

// ----------------------------------------------------------------------------
// Mutation Filter
// ----------------------------------------------------------------------------

/// Keep the mutations visible under the filters, in their original order.
///
/// ```rust
/// use covcurate::discovery::{filter_mutations, GeneFilter, MutationStat};
///
/// let stat = |mutation: &str, uniqueness_score| MutationStat { mutation: mutation.into(), uniqueness_score };
/// let mutations = vec![stat("S:N501Y", 0.9), stat("N:P13L", 0.7), stat("S:D614G", 0.1)];
///
/// let visible = filter_mutations(&mutations, &GeneFilter::Gene("S".into()), true);
/// assert_eq!(visible, vec![stat("S:N501Y", 0.9)]);
/// ```
pub fn filter_mutations(
    mutations: &[MutationStat],
    gene: &GeneFilter,
    characteristic_only: bool,
) -> Vec<MutationStat> {
    mutations
        .iter()
        .filter(|m| gene.matches(&m.mutation))
        .filter(|m| !characteristic_only || m.is_characteristic())
        .cloned()
        .collect()
}

// ----------------------------------------------------------------------------
// Deduplication
// ----------------------------------------------------------------------------

/// A candidate with the mutations visible under the current filters.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NewVariant {
    pub candidate: InterestingVariant,
    pub visible_mutations: Vec<MutationStat>,
    #[serde(skip)]
    pub signature: Signature,
}

impl NewVariant {
    pub fn new(candidate: InterestingVariant, visible_mutations: Vec<MutationStat>) -> Self {
        let names = visible_mutations.iter().map(|m| m.mutation.as_str()).collect_vec();
        let signature = Signature::new(&names);
        NewVariant { candidate, visible_mutations, signature }
    }

    /// Visible mutations in canonical order, characteristic ones marked with `*`.
    pub fn pretty_mutations(&self) -> String {
        let characteristic = self
            .visible_mutations
            .iter()
            .filter(|m| m.is_characteristic())
            .map(|m| m.mutation.as_str())
            .collect::<HashSet<_>>();
        self.signature
            .as_str()
            .split(',')
            .filter(|m| !m.is_empty())
            .map(|m| match characteristic.contains(m) {
                true => format!("{m}*"),
                false => m.to_string(),
            })
            .join(", ")
    }

    pub fn pretty_print(&self) -> String {
        formatdoc!(
            "mutations: {}
            samples: {} ({:.2}%)
            advantage: {}",
            self.pretty_mutations(),
            self.candidate.absolute_number_samples_in_past_three_months,
            self.candidate.relative_number_samples_in_past_three_months * 100.0,
            self.candidate.f,
        )
    }
}

/// Keep the first candidate of every visible-mutation [`Signature`], at most
/// [`MAX_NEW_VARIANTS`] of them.
///
/// Input order is the tie-break: with candidates sorted by descending advantage, the
/// best estimate of each mutation set survives.
pub fn dedupe(candidates: Vec<NewVariant>) -> Vec<NewVariant> {
    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|v| seen.insert(v.signature.clone()))
        .take(MAX_NEW_VARIANTS)
        .collect()
}

/// True if candidates are sorted by descending advantage.
pub fn is_sorted_by_advantage(variants: &[InterestingVariant]) -> bool {
    variants.iter().tuple_windows().all(|(a, b)| a.f.value >= b.f.value)
}

/// The new-variant view: filter mutations, drop candidates with nothing visible, dedupe.
///
/// Candidates are taken in the order the service returned them. An ordering that is
/// not by descending advantage is reported, not corrected.
pub fn discover(result: &InterestingVariantResult, filter: &DiscoveryFilter) -> Vec<NewVariant> {
    if !is_sorted_by_advantage(&result.variants) {
        warn!("Interesting variants are not sorted by descending advantage, duplicates are resolved by input order.");
    }
    let candidates = result
        .variants
        .iter()
        .map(|v| {
            let visible = filter_mutations(&v.mutations, &filter.gene, filter.characteristic_only);
            NewVariant::new(v.clone(), visible)
        })
        .filter(|v| !v.visible_mutations.is_empty())
        .collect_vec();
    let total = candidates.len();
    let variants = dedupe(candidates);
    debug!(
        "Discovered {} new variants from {} candidates ({total} with visible mutations).",
        variants.len(),
        result.variants.len()
    );
    variants
}
