//! Mutation names, their canonical order, and the [`Signature`] built from them.

use color_eyre::eyre::{eyre, Report, Result};
use color_eyre::Help;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use strum::{EnumIter, IntoEnumIterator};

// ----------------------------------------------------------------------------
// Gene
// ----------------------------------------------------------------------------

/// SARS-CoV-2 genes, declared in genome order.
#[derive(Clone, Copy, Debug, EnumIter, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Gene {
    ORF1a,
    ORF1b,
    S,
    ORF3a,
    E,
    M,
    ORF6,
    ORF7a,
    ORF7b,
    ORF8,
    N,
    ORF9b,
}

impl Display for Gene {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

impl FromStr for Gene {
    type Err = Report;

    /// Returns a [`Gene`] converted from its name, case-insensitive.
    ///
    /// ```rust
    /// use covcurate_variant::Gene;
    /// use std::str::FromStr;
    /// assert_eq!(Gene::from_str("orf1a")?, Gene::ORF1a);
    /// assert!(Gene::from_str("ORF2").is_err());
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    fn from_str(name: &str) -> Result<Self, Report> {
        Gene::iter().find(|gene| gene.to_string().eq_ignore_ascii_case(name)).ok_or_else(|| {
            eyre!("Unknown gene: {name:?}")
                .suggestion(format!("Please choose from: {}", Gene::iter().join(", ")))
        })
    }
}

// ----------------------------------------------------------------------------
// Mutation
// ----------------------------------------------------------------------------

/// A parsed mutation name.
///
/// Amino acid mutations are written `GENE:REF<POS>ALT` (ex. `S:N501Y`, `ORF1a:S3675-`),
/// nucleotide mutations `REF<POS>ALT` (ex. `C241T`).
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Mutation {
    /// Gene prefix, [`None`] for nucleotide mutations.
    pub gene: Option<String>,
    /// Position within the gene or genome, if one could be read.
    pub position: Option<usize>,
    /// The mutation as written.
    pub name: String,
}

impl Mutation {
    /// Parse a mutation name, tolerating names that do not follow either pattern.
    ///
    /// ```rust
    /// use covcurate_variant::Mutation;
    ///
    /// let m = Mutation::parse("S:N501Y");
    /// assert_eq!(m.gene.as_deref(), Some("S"));
    /// assert_eq!(m.position, Some(501));
    ///
    /// let m = Mutation::parse("C241T");
    /// assert_eq!(m.gene, None);
    /// assert_eq!(m.position, Some(241));
    /// ```
    pub fn parse(name: &str) -> Self {
        let (gene, change) = match name.split_once(':') {
            Some((gene, change)) => (Some(gene.to_string()), change),
            None => (None, name),
        };
        let position = change
            .chars()
            .skip_while(|c| !c.is_ascii_digit())
            .take_while(|c| c.is_ascii_digit())
            .collect::<String>()
            .parse()
            .ok();
        Mutation { gene, position, name: name.to_string() }
    }

    /// Genome order of the gene, unknown genes after known ones and nucleotides last.
    fn gene_rank(&self) -> (usize, Option<&str>) {
        match &self.gene {
            Some(gene) => match Gene::from_str(gene) {
                Ok(known) => (known as usize, None),
                Err(_) => (Gene::iter().count(), Some(gene.as_str())),
            },
            None => (Gene::iter().count() + 1, None),
        }
    }
}

impl Ord for Mutation {
    fn cmp(&self, other: &Self) -> Ordering {
        self.gene_rank()
            .cmp(&other.gene_rank())
            .then_with(|| self.position.cmp(&other.position))
            .then_with(|| self.name.cmp(&other.name))
    }
}

impl PartialOrd for Mutation {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Display for Mutation {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Returns the mutation names sorted by gene (genome order), then position, then name.
///
/// ```rust
/// use covcurate_variant::sort_mutations;
/// let sorted = sort_mutations(&["N:P13L", "S:N501Y", "S:E484K", "ORF1a:T1001I"]);
/// assert_eq!(sorted, vec!["ORF1a:T1001I", "S:E484K", "S:N501Y", "N:P13L"]);
/// ```
pub fn sort_mutations<S: AsRef<str>>(mutations: &[S]) -> Vec<String> {
    mutations.iter().map(|m| Mutation::parse(m.as_ref())).sorted().map(|m| m.name).collect()
}

// ----------------------------------------------------------------------------
// Signature
// ----------------------------------------------------------------------------

/// The canonical key of a mutation set: sorted names joined by `,`.
///
/// Two sets with the same mutations produce the same [`Signature`] whatever order they
/// were listed in.
///
/// ```rust
/// use covcurate_variant::Signature;
/// let a = Signature::new(&["S:N501Y", "N:P13L"]);
/// let b = Signature::new(&["N:P13L", "S:N501Y"]);
/// assert_eq!(a, b);
/// assert_eq!(a.as_str(), "S:N501Y,N:P13L");
/// ```
#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Signature(String);

impl Signature {
    pub fn new<S: AsRef<str>>(mutations: &[S]) -> Self {
        Signature(sort_mutations(mutations).join(","))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Display for Signature {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
