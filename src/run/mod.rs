//! Run the curation pipelines once and render their views as tables.


use crate::api::{
    InterestingVariantService, LineageFrequencyService, SampleSetResolver, SamplingStrategy,
};
use crate::discovery::{DiscoveryFilter, GeneFilter};
use crate::known::{Catalogue, WeeklyProportions};
use crate::pipeline::{KnownVariantPipeline, NewVariantPipeline, Outcome};
use chrono::NaiveDate;
#[cfg(feature = "cli")]
use clap::Parser;
use color_eyre::eyre::{eyre, Report, Result};
use color_eyre::Help;
use itertools::Itertools;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use tabled::builder::Builder;
use tabled::Table;

/// Read the catalogue at `path`, or the built-in one.
fn catalogue(path: Option<&Path>) -> Result<Catalogue, Report> {
    match path {
        Some(path) => Catalogue::read(path),
        None => Catalogue::builtin(),
    }
}

fn percent(proportion: Option<f64>) -> String {
    proportion.map(|p| format!("{:.2}%", p * 100.0)).unwrap_or_default()
}

// ----------------------------------------------------------------------------
// Lists
// ----------------------------------------------------------------------------

/// List the curated variant lists.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[cfg_attr(feature = "cli", derive(Parser))]
pub struct ListsArgs {
    /// Catalogue JSON of curated variant lists, the built-in catalogue by default.
    #[cfg_attr(feature = "cli", clap(short = 'c', long))]
    pub catalogue: Option<PathBuf>,

    /// Write the catalogue to this JSON file, ex. as a starting point for a custom one.
    #[cfg_attr(feature = "cli", clap(short = 'o', long))]
    pub output: Option<PathBuf>,
}

/// Returns a [`Table`] of the curated variant lists.
///
/// ## Examples
///
/// ```rust
/// use covcurate::run::{lists, ListsArgs};
///
/// let table = lists(&ListsArgs::default())?;
/// assert!(table.to_string().contains("Variants of concern"));
/// # Ok::<(), color_eyre::eyre::Report>(())
/// ```
pub fn lists(args: &ListsArgs) -> Result<Table, Report> {
    let catalogue = catalogue(args.catalogue.as_deref())?;
    if let Some(output) = &args.output {
        catalogue.write(output)?;
        info!("Wrote catalogue: {output:?}");
    }

    let mut builder = Builder::default();
    builder.push_record(vec!["Name", "Curated", "Fill Up Until", "Source"]);
    catalogue.lists().iter().for_each(|list| {
        let row = vec![
            list.name.clone(),
            list.variants.iter().join(", "),
            list.fill_up_until.to_string(),
            list.source.clone().unwrap_or_default(),
        ];
        builder.push_record(row);
    });
    Ok(builder.build())
}

// ----------------------------------------------------------------------------
// Known
// ----------------------------------------------------------------------------

/// Preview a variant list filled up with the most frequent lineages of a country.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[cfg_attr(feature = "cli", derive(Parser))]
pub struct KnownArgs {
    /// Country or region.
    #[cfg_attr(feature = "cli", clap(long, default_value_t = KnownArgs::default().country))]
    pub country: String,

    /// Sampling strategy, surveillance is only available for Switzerland.
    #[cfg_attr(feature = "cli", clap(short = 's', long, value_enum, default_value_t = KnownArgs::default().sampling_strategy))]
    pub sampling_strategy: SamplingStrategy,

    /// Name of the variant list, the first list of the catalogue by default.
    #[cfg_attr(feature = "cli", clap(short = 'l', long))]
    pub list: Option<String>,

    /// Catalogue JSON of curated variant lists, the built-in catalogue by default.
    #[cfg_attr(feature = "cli", clap(short = 'c', long))]
    pub catalogue: Option<PathBuf>,

    /// Count lineages back from this date (YYYY-MM-DD), today by default.
    #[cfg_attr(feature = "cli", clap(short = 'd', long))]
    pub date: Option<NaiveDate>,
}

impl Default for KnownArgs {
    fn default() -> Self {
        KnownArgs {
            country: "Switzerland".to_string(),
            sampling_strategy: SamplingStrategy::default(),
            list: None,
            catalogue: None,
            date: None,
        }
    }
}

/// Returns a [`Table`] of the known-variant preview.
pub async fn known_variants<L, R>(
    args: &KnownArgs,
    lineages: Arc<L>,
    resolver: Arc<R>,
) -> Result<Table, Report>
where
    L: LineageFrequencyService,
    R: SampleSetResolver,
{
    let catalogue = catalogue(args.catalogue.as_deref())?;
    let list = match &args.list {
        Some(list) => list.clone(),
        None => catalogue.default_list().name.clone(),
    };

    let projector = WeeklyProportions::default();
    let catalogue = Arc::new(catalogue);
    let mut pipeline = KnownVariantPipeline::new(catalogue, lineages, resolver, projector);
    if let Some(date) = args.date {
        pipeline = pipeline.with_today(date);
    }
    pipeline.set(&args.country, args.sampling_strategy, &list)?;
    if pipeline.settle().await == Some(Outcome::Failed) {
        return Err(eyre!("Failed to load the known variants of {}.", args.country))
            .suggestion("Rerun with --verbosity debug to see the failed request.");
    }

    let mut builder = Builder::default();
    builder.push_record(vec!["Variant", "Match", "Recent Proportion", "Weekly Proportions"]);
    let known = pipeline.known_variants();
    if known.iter().any(|v| v.chart_data.is_none()) {
        warn!("Sample data is missing for some variants.");
    }
    known.iter().for_each(|v| {
        let series = v
            .chart_data
            .as_ref()
            .map(|series| series.iter().map(|p| format!("{:.2}", p)).join(" "))
            .unwrap_or_default();
        let row = vec![
            v.selector.variant.to_string(),
            format!("{:.0}%", v.selector.match_percentage() * 100.0),
            percent(v.recent_proportion),
            series,
        ];
        builder.push_record(row);
    });
    Ok(builder.build())
}

// ----------------------------------------------------------------------------
// New
// ----------------------------------------------------------------------------

/// Discover new variants of a country.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[cfg_attr(feature = "cli", derive(Parser))]
pub struct NewArgs {
    /// Country or region.
    #[cfg_attr(feature = "cli", clap(long, default_value_t = NewArgs::default().country))]
    pub country: String,

    /// Only show mutations of this gene, '-' for all genes.
    #[cfg_attr(feature = "cli", clap(short = 'g', long, default_value_t = NewArgs::default().gene))]
    pub gene: String,

    /// Only show characteristic mutations.
    #[cfg_attr(feature = "cli", clap(long))]
    pub characteristic_only: bool,

    /// Maximum number of rows shown.
    #[cfg_attr(feature = "cli", clap(short = 'n', long))]
    pub limit: Option<usize>,
}

impl Default for NewArgs {
    fn default() -> Self {
        NewArgs {
            country: "Switzerland".to_string(),
            gene: GeneFilter::ALL.to_string(),
            characteristic_only: false,
            limit: None,
        }
    }
}

impl NewArgs {
    pub fn filter(&self) -> Result<DiscoveryFilter, Report> {
        let gene = GeneFilter::from_str(&self.gene)?;
        Ok(DiscoveryFilter { gene, characteristic_only: self.characteristic_only })
    }
}

/// Returns a [`Table`] of new variants, characteristic mutations marked with `*`.
pub async fn new_variants<S>(args: &NewArgs, service: Arc<S>) -> Result<Table, Report>
where
    S: InterestingVariantService,
{
    let filter = args.filter()?;
    let mut pipeline = NewVariantPipeline::new(service);
    pipeline.set_country(&args.country);
    pipeline.settle().await;
    let variants = pipeline
        .variants(&filter)
        .ok_or_else(|| eyre!("No data available for {}.", args.country))
        .suggestion("Rerun with --verbosity debug to see the failed request.")?;
    info!("Found {} new variants in {}.", variants.len(), args.country);

    let mut builder = Builder::default();
    builder.push_record(vec!["Mutations", "Samples", "Proportion", "Advantage"]);
    variants.iter().take(args.limit.unwrap_or(variants.len())).for_each(|v| {
        let row = vec![
            v.pretty_mutations(),
            v.candidate.absolute_number_samples_in_past_three_months.to_string(),
            percent(Some(v.candidate.relative_number_samples_in_past_three_months)),
            v.candidate.f.to_string(),
        ];
        builder.push_record(row);
    });
    Ok(builder.build())
}
