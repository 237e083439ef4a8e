//! The [`Catalogue`] of curated variant lists.

use crate::known::VariantList;
use color_eyre::eyre::{eyre, Report, Result, WrapErr};
use color_eyre::Help;
use itertools::Itertools;
use log::debug;
use serde::Serialize;
use std::fmt::Debug;
use std::io::Write;
use std::path::Path;

/// Curated lists shipped with the binary.
pub const BUILTIN: &str = r#"[
  {
    "name": "Variants of concern",
    "source": "https://www.who.int/en/activities/tracking-SARS-CoV-2-variants/",
    "fillUpUntil": 12,
    "variants": [
      { "variant": { "name": "B.1.1.7*", "mutations": [] }, "matchPercentage": 1 },
      { "variant": { "name": "B.1.351*", "mutations": [] }, "matchPercentage": 1 },
      { "variant": { "name": "P.1*", "mutations": [] }, "matchPercentage": 1 },
      { "variant": { "name": "B.1.617.2*", "mutations": [] }, "matchPercentage": 1 }
    ]
  },
  {
    "name": "Spike escape mutations",
    "fillUpUntil": 8,
    "variants": [
      { "variant": { "mutations": ["S:E484K"] }, "matchPercentage": 1 },
      { "variant": { "mutations": ["S:L452R"] }, "matchPercentage": 1 },
      { "variant": { "mutations": ["S:K417N", "S:E484K", "S:N501Y"] }, "matchPercentage": 0.8 }
    ]
  },
  {
    "name": "Most frequent lineages",
    "fillUpUntil": 12,
    "variants": []
  }
]"#;

/// An immutable, ordered collection of curated [`VariantList`]s.
///
/// The first list is the one shown by default.
///
/// ## Examples
///
/// ```rust
/// use covcurate::known::Catalogue;
///
/// let catalogue = Catalogue::builtin()?;
/// let list = catalogue.get("Variants of concern")?;
/// assert_eq!(list.fill_up_until, 12);
/// assert_eq!(catalogue.default_list().name, list.name);
/// assert!(catalogue.get("Variants of interest").is_err());
/// # Ok::<(), color_eyre::eyre::Report>(())
/// ```
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Catalogue {
    lists: Vec<VariantList>,
}

impl Catalogue {
    /// Returns a [`Catalogue`] after checking the lists.
    ///
    /// A catalogue needs at least one list, list names must be unique, and no list may
    /// curate more variants than it fills up to.
    pub fn new(lists: Vec<VariantList>) -> Result<Self, Report> {
        if lists.is_empty() {
            return Err(eyre!("Variant list catalogue is empty."));
        }
        if let Some(name) = lists.iter().map(|l| &l.name).duplicates().next() {
            return Err(eyre!("Variant list {name:?} is defined more than once."));
        }
        if let Some(list) = lists.iter().find(|l| l.variants.len() > l.fill_up_until) {
            return Err(eyre!(
                "Variant list {:?} curates {} variants but fills up until {}.",
                list.name,
                list.variants.len(),
                list.fill_up_until
            )
            .suggestion("Raise fillUpUntil or remove curated variants."));
        }
        Ok(Catalogue { lists })
    }

    /// Returns the built-in [`Catalogue`].
    pub fn builtin() -> Result<Self, Report> {
        Catalogue::from_json(BUILTIN).wrap_err("Failed to load built-in variant lists.")
    }

    /// Parse a [`Catalogue`] from a JSON array of variant lists.
    pub fn from_json(json: &str) -> Result<Self, Report> {
        let lists: Vec<VariantList> =
            serde_json::from_str(json).wrap_err("Failed to deserialize variant lists.")?;
        Catalogue::new(lists)
    }

    /// Read a [`Catalogue`] from a JSON file.
    ///
    /// ```rust
    /// use covcurate::known::Catalogue;
    ///
    /// let catalogue = Catalogue::builtin()?;
    /// let file = tempfile::NamedTempFile::new()?;
    /// catalogue.write(file.path())?;
    /// assert_eq!(Catalogue::read(file.path())?, catalogue);
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn read<P>(path: P) -> Result<Self, Report>
    where
        P: AsRef<Path> + Debug,
    {
        debug!("Reading variant lists: {path:?}");
        let input = std::fs::read_to_string(&path)
            .wrap_err(format!("Failed to read variant lists: {path:?}."))?;
        Catalogue::from_json(&input).wrap_err(format!("Invalid variant lists: {path:?}"))
    }

    /// Write the [`Catalogue`] to a JSON file.
    pub fn write<P>(&self, path: P) -> Result<(), Report>
    where
        P: AsRef<Path> + Debug,
    {
        let mut file = std::fs::File::create(&path)
            .wrap_err(eyre!("Failed to create variant lists file: {path:?}"))?;
        let output =
            serde_json::to_string_pretty(self).wrap_err("Failed to serialize variant lists.")?;
        file.write_all(format!("{}\n", output).as_bytes())
            .wrap_err(eyre!("Failed to write variant lists file: {path:?}"))?;
        Ok(())
    }

    /// Returns the list with this name.
    pub fn get(&self, name: &str) -> Result<&VariantList, Report> {
        self.lists.iter().find(|l| l.name == name).ok_or_else(|| {
            eyre!("Unknown variant list: {name:?}")
                .suggestion(format!("Please choose from: {}", self.names().join(", ")))
        })
    }

    /// The list shown before the user picks one.
    pub fn default_list(&self) -> &VariantList {
        &self.lists[0]
    }

    pub fn lists(&self) -> &[VariantList] {
        &self.lists
    }

    pub fn names(&self) -> Vec<&str> {
        self.lists.iter().map(|l| l.name.as_str()).collect()
    }
}
