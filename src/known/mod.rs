//! Known-variant previews: curated [`VariantList`]s filled up with live lineage frequencies.

mod catalogue;
mod chart;

#[doc(inline)]
pub use catalogue::Catalogue;
#[doc(inline)]
pub use chart::{ChartData, ChartDataProjector, SampleCount, SampleSet, WeeklyProportions};

use chrono::{Datelike, Months, NaiveDate};
use covcurate_variant::VariantSelector;
use itertools::Itertools;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Months of lineage frequencies used to rank the fill-up candidates.
pub const LINEAGE_WINDOW_MONTHS: u32 = 3;

// ----------------------------------------------------------------------------
// Variant List
// ----------------------------------------------------------------------------

/// A curated, named list of variants shown as a preview.
///
/// Curated `variants` always come first, the remainder up to `fill_up_until` is
/// filled with the most frequent lineages.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantList {
    pub name: String,
    pub variants: Vec<VariantSelector>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub fill_up_until: usize,
}

impl Display for VariantList {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

// ----------------------------------------------------------------------------
// Lineage Counts
// ----------------------------------------------------------------------------

/// Lineage count as delivered by the frequency service, the lineage may be missing.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLineageCount {
    pub pangolin_lineage: Option<String>,
    pub count: u64,
}

/// Number of samples of a pangolin lineage.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineageCount {
    pub pangolin_lineage: String,
    pub count: u64,
}

/// Drop counts without a lineage and rank the rest by descending count.
///
/// The sort is stable, lineages with equal counts keep the provider's order.
///
/// ```rust
/// use covcurate::known::{rank_lineages, RawLineageCount};
///
/// let raw = vec![
///     RawLineageCount { pangolin_lineage: Some("P.1".into()), count: 5 },
///     RawLineageCount { pangolin_lineage: None, count: 50 },
///     RawLineageCount { pangolin_lineage: Some("B.1.1.7".into()), count: 20 },
/// ];
/// let ranked = rank_lineages(raw);
/// assert_eq!(ranked.len(), 2);
/// assert_eq!(ranked[0].pangolin_lineage, "B.1.1.7");
/// ```
pub fn rank_lineages(raw: Vec<RawLineageCount>) -> Vec<LineageCount> {
    let total = raw.len();
    let mut ranked = raw
        .into_iter()
        .filter_map(|c| {
            let count = c.count;
            c.pangolin_lineage.map(|pangolin_lineage| LineageCount { pangolin_lineage, count })
        })
        .collect_vec();
    if ranked.len() < total {
        debug!("Dropped {} lineage counts without a lineage.", total - ranked.len());
    }
    ranked.sort_by(|a, b| b.count.cmp(&a.count));
    ranked
}

// ----------------------------------------------------------------------------
// Fill Up
// ----------------------------------------------------------------------------

/// Pad the curated selectors up to `target` entries with the ranked lineages.
///
/// Curated selectors are kept as given. A ranked lineage is skipped when a selector
/// with the same base name (wildcard markers removed) is already present, so a curated
/// `B.1*` suppresses the exact lineage `B.1`. Added lineages are pure lineage
/// selectors with a match percentage of 1.
///
/// ```rust
/// use covcurate::known::{fill_up, LineageCount};
/// use covcurate_variant::VariantSelector;
///
/// let curated = vec![VariantSelector::lineage("B.1.1.7")];
/// let ranked = vec![
///     LineageCount { pangolin_lineage: "B.1.1.7".into(), count: 100 },
///     LineageCount { pangolin_lineage: "B.1.617.2".into(), count: 90 },
///     LineageCount { pangolin_lineage: "P.1".into(), count: 80 },
/// ];
/// let preview = fill_up(&curated, &ranked, 3);
/// let names: Vec<String> = preview.iter().map(|s| s.to_string()).collect();
/// assert_eq!(names, ["B.1.1.7", "B.1.617.2", "P.1"]);
/// ```
pub fn fill_up(
    curated: &[VariantSelector],
    ranked: &[LineageCount],
    target: usize,
) -> Vec<VariantSelector> {
    let mut selectors = curated.to_vec();
    for lineage in ranked {
        if selectors.len() >= target {
            break;
        }
        let name = lineage.pangolin_lineage.as_str();
        if selectors.iter().any(|s| s.base_name().as_deref() == Some(name)) {
            continue;
        }
        selectors.push(VariantSelector::lineage(name));
    }
    selectors
}

/// First day of the lineage frequency window: three months back, moved to the Sunday
/// that starts that week.
///
/// ```rust
/// use chrono::NaiveDate;
/// use covcurate::known::lineage_window_start;
///
/// // 2021-06-15 minus three months is Monday 2021-03-15.
/// let today = NaiveDate::from_ymd_opt(2021, 6, 15).unwrap();
/// assert_eq!(lineage_window_start(today), NaiveDate::from_ymd_opt(2021, 3, 14).unwrap());
/// ```
pub fn lineage_window_start(today: NaiveDate) -> NaiveDate {
    let start = today.checked_sub_months(Months::new(LINEAGE_WINDOW_MONTHS)).unwrap_or(today);
    start - chrono::Duration::days(start.weekday().num_days_from_sunday().into())
}

// ----------------------------------------------------------------------------
// Known Variant
// ----------------------------------------------------------------------------

/// A preview entry, with chart data once its samples have been resolved.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KnownVariant {
    pub selector: VariantSelector,
    pub chart_data: Option<Vec<f64>>,
    pub recent_proportion: Option<f64>,
}

impl KnownVariant {
    /// An entry whose data is still loading.
    pub fn without_data(selector: VariantSelector) -> Self {
        KnownVariant { selector, chart_data: None, recent_proportion: None }
    }

    /// True if this entry is the current selection, compared by display name.
    pub fn is_selected(&self, selection: Option<&VariantSelector>) -> bool {
        selection.is_some_and(|s| s.variant.is_same_display(&self.selector.variant))
    }
}
