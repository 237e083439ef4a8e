use crate::api::{
    Country, LineageFrequencyService, LineageQuery, SampleSetResolver, SamplingStrategy,
};
use crate::known::{
    fill_up, lineage_window_start, rank_lineages, Catalogue, ChartDataProjector, KnownVariant,
    SampleSet,
};
use crate::pipeline::{Outcome, Selection, Slot};
use chrono::NaiveDate;
use color_eyre::eyre::{eyre, Report, Result};
use color_eyre::Help;
use covcurate_variant::VariantSelector;
use log::{debug, info};
use std::sync::Arc;

// ----------------------------------------------------------------------------
// Keys
// ----------------------------------------------------------------------------

/// Dependencies of the preview: which list is filled up with which country's lineages.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct PreviewKey {
    pub country: Country,
    pub sampling_strategy: SamplingStrategy,
    pub list: String,
}

/// Dependencies of the variant sample sets.
#[derive(Clone, Debug, PartialEq)]
pub struct SampleSetKey {
    pub country: Country,
    pub sampling_strategy: SamplingStrategy,
    pub selectors: Vec<VariantSelector>,
}

impl SampleSetKey {
    /// True if these sample sets belong to `selectors` of the `preview` country and strategy.
    pub fn matches(&self, preview: &PreviewKey, selectors: &[VariantSelector]) -> bool {
        self.country == preview.country
            && self.sampling_strategy == preview.sampling_strategy
            && self.selectors == selectors
    }
}

/// Dependencies of the whole-population sample set.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct BaselineKey {
    pub country: Country,
    pub sampling_strategy: SamplingStrategy,
}

impl BaselineKey {
    pub fn matches(&self, preview: &PreviewKey) -> bool {
        self.country == preview.country && self.sampling_strategy == preview.sampling_strategy
    }
}

// ----------------------------------------------------------------------------
// Known Variant Pipeline
// ----------------------------------------------------------------------------

/// Known-variant previews of one dashboard view.
///
/// [`KnownVariantPipeline::set`] re-keys the preview. Once the preview settles, the
/// sample sets of its selectors are requested and projected against the baseline.
pub struct KnownVariantPipeline<L, R, P> {
    catalogue: Arc<Catalogue>,
    lineages: Arc<L>,
    resolver: Arc<R>,
    projector: P,
    today: NaiveDate,
    preview: Slot<PreviewKey, Vec<VariantSelector>>,
    sample_sets: Slot<SampleSetKey, Vec<SampleSet>>,
    baseline: Slot<BaselineKey, SampleSet>,
}

impl<L, R, P> KnownVariantPipeline<L, R, P>
where
    L: LineageFrequencyService,
    R: SampleSetResolver,
    P: ChartDataProjector,
{
    pub fn new(
        catalogue: Arc<Catalogue>,
        lineages: Arc<L>,
        resolver: Arc<R>,
        projector: P,
    ) -> Self {
        KnownVariantPipeline {
            catalogue,
            lineages,
            resolver,
            projector,
            today: chrono::Local::now().date_naive(),
            preview: Slot::new("preview"),
            sample_sets: Slot::new("sample sets"),
            baseline: Slot::new("baseline"),
        }
    }

    /// Date the lineage window is counted back from, today by default.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub fn catalogue(&self) -> &Catalogue {
        &self.catalogue
    }

    pub fn key(&self) -> Option<&PreviewKey> {
        self.preview.key()
    }

    /// Select the country, sampling strategy and variant list to preview.
    ///
    /// Unknown list names are rejected. Nothing is fetched again if nothing changed.
    pub fn set(
        &mut self,
        country: &str,
        sampling_strategy: SamplingStrategy,
        list: &str,
    ) -> Result<(), Report> {
        let list = self.catalogue.get(list)?.clone();
        let sampling_strategy = sampling_strategy.effective_for(country);

        let key = PreviewKey {
            country: country.to_string(),
            sampling_strategy,
            list: list.name.clone(),
        };
        let query = LineageQuery {
            country: country.to_string(),
            sampling_strategy,
            date_from: lineage_window_start(self.today),
        };
        let lineages = Arc::clone(&self.lineages);
        let requested = self.preview.request(key, async move {
            let ranked = rank_lineages(lineages.lineage_counts(&query).await?);
            debug!("Filling up {:?} from {} ranked lineages.", list.name, ranked.len());
            Ok(fill_up(&list.variants, &ranked, list.fill_up_until))
        });
        if requested {
            info!("Loading known variants of {country} ({sampling_strategy}).");
        }

        let key = BaselineKey { country: country.to_string(), sampling_strategy };
        if self.baseline.key() != Some(&key) {
            self.baseline.clear();
            let resolver = Arc::clone(&self.resolver);
            let country = country.to_string();
            self.baseline.request(key, async move {
                resolver.baseline(&country, sampling_strategy).await
            });
        }
        Ok(())
    }

    /// Request the sample sets of the current preview, if they are not loaded yet.
    fn request_sample_sets(&mut self) {
        let (Some(preview), Some(selectors)) = (self.preview.key(), self.preview.value()) else {
            return;
        };
        let key = SampleSetKey {
            country: preview.country.clone(),
            sampling_strategy: preview.sampling_strategy,
            selectors: selectors.clone(),
        };
        if self.sample_sets.key() == Some(&key) {
            return;
        }
        self.sample_sets.clear();
        let resolver = Arc::clone(&self.resolver);
        let fetch_key = key.clone();
        self.sample_sets.request(key, async move {
            resolver
                .resolve(&fetch_key.selectors, &fetch_key.country, fetch_key.sampling_strategy)
                .await
        });
    }

    /// Wait for everything in flight to settle, the preview first.
    ///
    /// Returns the outcome of the preview request, [`None`] if none was in flight.
    pub async fn settle(&mut self) -> Option<Outcome> {
        let outcome = self.preview.settle().await;
        if outcome == Some(Outcome::Applied) {
            self.request_sample_sets();
        }
        self.baseline.settle().await;
        self.sample_sets.settle().await;
        outcome
    }

    /// The selectors of the current preview, curated ones first.
    pub fn selectors(&self) -> &[VariantSelector] {
        self.preview.value().map(Vec::as_slice).unwrap_or_default()
    }

    /// Sample sets and baseline of the current preview key, if both are loaded.
    ///
    /// After a failed preview the selectors belong to an older key, so nothing matches.
    fn chart_inputs(&self) -> Option<(&Vec<SampleSet>, &SampleSet)> {
        let preview = self.preview.key()?;
        let sets_key = self.sample_sets.key()?;
        let baseline_key = self.baseline.key()?;
        if !sets_key.matches(preview, self.selectors()) || !baseline_key.matches(preview) {
            return None;
        }
        Some((self.sample_sets.value()?, self.baseline.value()?))
    }

    /// The preview, with chart data for every entry whose samples have been resolved.
    pub fn known_variants(&self) -> Vec<KnownVariant> {
        let selectors = self.selectors();
        let data = self.chart_inputs();
        selectors
            .iter()
            .enumerate()
            .map(|(i, selector)| {
                match data.and_then(|(sets, baseline)| sets.get(i).map(|set| (set, baseline))) {
                    Some((set, baseline)) => {
                        let chart = self.projector.project(set, baseline);
                        KnownVariant {
                            selector: selector.clone(),
                            chart_data: Some(chart.series),
                            recent_proportion: chart.recent_proportion,
                        }
                    }
                    None => KnownVariant::without_data(selector.clone()),
                }
            })
            .collect()
    }

    /// Hand the preview entry at `index` to `on_select`.
    pub fn select<F>(&self, index: usize, on_select: F) -> Result<(), Report>
    where
        F: FnOnce(Selection),
    {
        let selectors = self.selectors();
        let selector = selectors
            .get(index)
            .ok_or_else(|| eyre!("No known variant at position {index}."))
            .suggestion(format!("The preview has {} variants.", selectors.len()))?;
        on_select(Selection::Known(selector.clone()));
        Ok(())
    }
}
