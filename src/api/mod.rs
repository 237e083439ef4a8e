//! Interfaces of the external services consumed by the pipelines.

#[cfg(feature = "api")]
mod client;

#[cfg(feature = "api")]
#[doc(inline)]
pub use client::ApiClient;

use crate::discovery::InterestingVariantResult;
use crate::known::{RawLineageCount, SampleSet};
use chrono::NaiveDate;
#[cfg(feature = "cli")]
use clap::ValueEnum;
use color_eyre::eyre::{eyre, Report, Result};
use color_eyre::Help;
use covcurate_variant::VariantSelector;
use log::warn;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::future::Future;
use std::str::FromStr;
use strum::EnumIter;

/// A country or region name, as understood by the services.
pub type Country = String;

/// Default host of the sample database.
pub const DEFAULT_HOST: &str = "https://cov-spectrum.ethz.ch/api";

/// The only country with a surveillance sampling programme.
pub const SURVEILLANCE_COUNTRY: &str = "Switzerland";

// ----------------------------------------------------------------------------
// Sampling Strategy
// ----------------------------------------------------------------------------

/// Which samples of a country are counted.
#[derive(Clone, Copy, Debug, Default, Deserialize, EnumIter, Eq, Hash, PartialEq, Serialize)]
#[cfg_attr(feature = "cli", derive(ValueEnum))]
pub enum SamplingStrategy {
    #[default]
    AllSamples,
    Surveillance,
}

impl SamplingStrategy {
    /// Value of the `dataType` query parameter, [`None`] for all samples.
    pub fn literal(&self) -> Option<&'static str> {
        match self {
            SamplingStrategy::AllSamples => None,
            SamplingStrategy::Surveillance => Some("SURVEILLANCE"),
        }
    }

    /// The strategy that applies to `country`.
    ///
    /// Surveillance samples only exist for Switzerland, elsewhere all samples are used.
    ///
    /// ```rust
    /// use covcurate::api::SamplingStrategy;
    ///
    /// assert_eq!(SamplingStrategy::Surveillance.effective_for("Switzerland"), SamplingStrategy::Surveillance);
    /// assert_eq!(SamplingStrategy::Surveillance.effective_for("Germany"), SamplingStrategy::AllSamples);
    /// ```
    pub fn effective_for(self, country: &str) -> SamplingStrategy {
        match self {
            SamplingStrategy::Surveillance if country != SURVEILLANCE_COUNTRY => {
                warn!("Surveillance sampling is only supported for {SURVEILLANCE_COUNTRY}, using all samples for {country}.");
                SamplingStrategy::AllSamples
            }
            strategy => strategy,
        }
    }
}

impl Display for SamplingStrategy {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        let strategy = match self {
            SamplingStrategy::AllSamples => "all-samples",
            SamplingStrategy::Surveillance => "surveillance",
        };
        write!(f, "{strategy}")
    }
}

impl FromStr for SamplingStrategy {
    type Err = Report;

    fn from_str(s: &str) -> Result<Self, Report> {
        match s {
            "all-samples" => Ok(SamplingStrategy::AllSamples),
            "surveillance" => Ok(SamplingStrategy::Surveillance),
            _ => Err(eyre!("Unknown sampling strategy: {s:?}"))
                .suggestion("Please choose from: all-samples, surveillance"),
        }
    }
}

// ----------------------------------------------------------------------------
// Queries
// ----------------------------------------------------------------------------

/// Lineage frequency query.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct LineageQuery {
    pub country: Country,
    pub sampling_strategy: SamplingStrategy,
    pub date_from: NaiveDate,
}

// ----------------------------------------------------------------------------
// Services
// ----------------------------------------------------------------------------

/// Returns sample counts per pangolin lineage.
pub trait LineageFrequencyService: Send + Sync + 'static {
    fn lineage_counts(
        &self,
        query: &LineageQuery,
    ) -> impl Future<Output = Result<Vec<RawLineageCount>, Report>> + Send;
}

/// Turns [`VariantSelector`]s into the [`SampleSet`]s they select.
pub trait SampleSetResolver: Send + Sync + 'static {
    /// One [`SampleSet`] per selector, in selector order.
    fn resolve(
        &self,
        selectors: &[VariantSelector],
        country: &str,
        sampling_strategy: SamplingStrategy,
    ) -> impl Future<Output = Result<Vec<SampleSet>, Report>> + Send;

    /// The whole sample population the variant proportions are relative to.
    fn baseline(
        &self,
        country: &str,
        sampling_strategy: SamplingStrategy,
    ) -> impl Future<Output = Result<SampleSet, Report>> + Send;
}

/// Returns candidate variants sorted by descending estimated advantage.
pub trait InterestingVariantService: Send + Sync + 'static {
    fn interesting_variants(
        &self,
        country: &str,
    ) -> impl Future<Output = Result<InterestingVariantResult, Report>> + Send;
}
