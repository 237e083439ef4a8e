use chrono::{Datelike, NaiveDate};
use covcurate_variant::VariantSelector;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ----------------------------------------------------------------------------
// Sample Set
// ----------------------------------------------------------------------------

/// Number of samples collected on a date.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct SampleCount {
    /// Collection date, missing for samples without one.
    pub date: Option<NaiveDate>,
    pub count: u64,
}

/// The samples matching a [`VariantSelector`], or the whole population when there is none.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SampleSet {
    pub selector: Option<VariantSelector>,
    pub counts: Vec<SampleCount>,
}

impl SampleSet {
    pub fn new(selector: Option<VariantSelector>, counts: Vec<SampleCount>) -> Self {
        SampleSet { selector, counts }
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().map(|c| c.count).sum()
    }

    /// True if no sample matched.
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Sample counts summed per ISO week, keyed by the Monday starting the week.
    ///
    /// Samples without a date are left out.
    ///
    /// ```rust
    /// use chrono::NaiveDate;
    /// use covcurate::known::{SampleCount, SampleSet};
    ///
    /// let date = |d| NaiveDate::from_ymd_opt(2021, 6, d);
    /// let set = SampleSet::new(None, vec![
    ///     SampleCount { date: date(7), count: 2 },
    ///     SampleCount { date: date(13), count: 3 },
    ///     SampleCount { date: date(14), count: 4 },
    ///     SampleCount { date: None, count: 9 },
    /// ]);
    /// let weekly = set.weekly();
    /// assert_eq!(weekly.get(&date(7).unwrap()), Some(&5));
    /// assert_eq!(weekly.get(&date(14).unwrap()), Some(&4));
    /// ```
    pub fn weekly(&self) -> BTreeMap<NaiveDate, u64> {
        let mut weeks = BTreeMap::new();
        self.counts.iter().filter_map(|c| c.date.map(|date| (week_start(date), c.count))).for_each(
            |(week, count)| {
                *weeks.entry(week).or_insert(0) += count;
            },
        );
        weeks
    }
}

fn week_start(date: NaiveDate) -> NaiveDate {
    date - chrono::Duration::days(date.weekday().num_days_from_monday().into())
}

// ----------------------------------------------------------------------------
// Chart Data
// ----------------------------------------------------------------------------

/// Numeric series drawn on a known-variant card.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ChartData {
    pub series: Vec<f64>,
    pub recent_proportion: Option<f64>,
}

/// Turns a variant [`SampleSet`] and its baseline population into [`ChartData`].
pub trait ChartDataProjector {
    fn project(&self, variant: &SampleSet, baseline: &SampleSet) -> ChartData;
}

/// Weekly proportion of the baseline population that belongs to the variant.
#[derive(Clone, Debug, PartialEq)]
pub struct WeeklyProportions {
    /// Number of most recent baseline weeks in the series.
    pub weeks: usize,
}

impl Default for WeeklyProportions {
    fn default() -> Self {
        WeeklyProportions { weeks: 12 }
    }
}

impl ChartDataProjector for WeeklyProportions {
    /// ```rust
    /// use chrono::NaiveDate;
    /// use covcurate::known::{ChartDataProjector, SampleCount, SampleSet, WeeklyProportions};
    ///
    /// let date = |d| NaiveDate::from_ymd_opt(2021, 6, d);
    /// let baseline = SampleSet::new(None, vec![
    ///     SampleCount { date: date(7), count: 10 },
    ///     SampleCount { date: date(14), count: 20 },
    /// ]);
    /// let variant = SampleSet::new(None, vec![SampleCount { date: date(15), count: 5 }]);
    ///
    /// let data = WeeklyProportions::default().project(&variant, &baseline);
    /// assert_eq!(data.series, vec![0.0, 0.25]);
    /// assert_eq!(data.recent_proportion, Some(0.25));
    /// ```
    fn project(&self, variant: &SampleSet, baseline: &SampleSet) -> ChartData {
        let variant = variant.weekly();
        let baseline = baseline.weekly();
        let skip = baseline.len().saturating_sub(self.weeks);
        let series = baseline
            .iter()
            .skip(skip)
            .map(|(week, total)| match total {
                0 => 0.0,
                total => *variant.get(week).unwrap_or(&0) as f64 / *total as f64,
            })
            .collect_vec();
        let recent_proportion = series.last().copied();
        ChartData { series, recent_proportion }
    }
}
