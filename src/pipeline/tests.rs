use crate::api::{
    InterestingVariantService, LineageFrequencyService, LineageQuery, SampleSetResolver,
    SamplingStrategy,
};
use crate::discovery::*;
use crate::known::{
    Catalogue, RawLineageCount, SampleCount, SampleSet, VariantList, WeeklyProportions,
};
use crate::pipeline::*;
use chrono::NaiveDate;
use color_eyre::eyre::{eyre, Report, Result};
use covcurate_variant::{Variant, VariantSelector};
use itertools::Itertools;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;

// ----------------------------------------------------------------------------
// Fake Services
// ----------------------------------------------------------------------------

/// Holds a fetch of `country` until the returned sender fires (or is dropped).
#[derive(Default)]
struct Gates(Mutex<HashMap<String, oneshot::Receiver<()>>>);

impl Gates {
    fn close(&self, country: &str) -> oneshot::Sender<()> {
        let (sender, receiver) = oneshot::channel();
        self.0.lock().unwrap().insert(country.to_string(), receiver);
        sender
    }

    async fn pass(&self, country: &str) {
        let gate = self.0.lock().unwrap().remove(country);
        if let Some(gate) = gate {
            let _ = gate.await;
        }
    }
}

#[derive(Default)]
struct FakeLineages {
    counts: HashMap<String, Vec<RawLineageCount>>,
    gates: Gates,
    calls: AtomicUsize,
}

impl FakeLineages {
    fn with(mut self, country: &str, counts: &[(Option<&str>, u64)]) -> Self {
        let counts = counts
            .iter()
            .map(|(lineage, count)| RawLineageCount {
                pangolin_lineage: lineage.map(String::from),
                count: *count,
            })
            .collect();
        self.counts.insert(country.to_string(), counts);
        self
    }
}

impl LineageFrequencyService for FakeLineages {
    async fn lineage_counts(&self, query: &LineageQuery) -> Result<Vec<RawLineageCount>, Report> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.gates.pass(&query.country).await;
        self.counts
            .get(&query.country)
            .cloned()
            .ok_or_else(|| eyre!("Connection refused: {}", query.country))
    }
}

fn week() -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(2021, 6, 14)
}

/// Every variant has 5 samples in the same week, out of 20 in Switzerland and 1000 elsewhere.
#[derive(Default)]
struct FakeResolver {
    calls: AtomicUsize,
}

impl SampleSetResolver for FakeResolver {
    async fn resolve(
        &self,
        selectors: &[VariantSelector],
        _country: &str,
        _sampling_strategy: SamplingStrategy,
    ) -> Result<Vec<SampleSet>, Report> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let sets = selectors
            .iter()
            .map(|s| SampleSet::new(Some(s.clone()), vec![SampleCount { date: week(), count: 5 }]))
            .collect();
        Ok(sets)
    }

    async fn baseline(
        &self,
        country: &str,
        _sampling_strategy: SamplingStrategy,
    ) -> Result<SampleSet, Report> {
        let count = if country == "Switzerland" { 20 } else { 1000 };
        Ok(SampleSet::new(None, vec![SampleCount { date: week(), count }]))
    }
}

#[derive(Default)]
struct FakeInterestingVariants {
    results: HashMap<String, InterestingVariantResult>,
    gates: Gates,
}

impl InterestingVariantService for FakeInterestingVariants {
    async fn interesting_variants(
        &self,
        country: &str,
    ) -> Result<InterestingVariantResult, Report> {
        self.gates.pass(country).await;
        self.results.get(country).cloned().ok_or_else(|| eyre!("Connection refused: {country}"))
    }
}

fn candidate(mutations: &[&str], advantage: f64) -> InterestingVariant {
    InterestingVariant {
        mutations: mutations
            .iter()
            .map(|m| MutationStat { mutation: m.to_string(), uniqueness_score: 0.9 })
            .collect(),
        f: Advantage { value: advantage, ci_lower: advantage - 0.1, ci_upper: advantage + 0.1 },
        absolute_number_samples_in_past_three_months: 10,
        relative_number_samples_in_past_three_months: 0.01,
    }
}

fn catalogue() -> Result<Arc<Catalogue>, Report> {
    let list = VariantList {
        name: "VOC".to_string(),
        variants: vec![VariantSelector::lineage("B.1.1.7")],
        source: None,
        fill_up_until: 3,
    };
    Ok(Arc::new(Catalogue::new(vec![list])?))
}

fn lineages() -> FakeLineages {
    FakeLineages::default()
        .with(
            "Switzerland",
            &[(Some("B.1.1.7"), 100), (None, 50), (Some("B.1.617.2"), 90), (Some("P.1"), 80)],
        )
        .with("Germany", &[(Some("B.1.351"), 40), (Some("B.1.1.7"), 30), (Some("C.37"), 20)])
}

type Pipeline = KnownVariantPipeline<FakeLineages, FakeResolver, WeeklyProportions>;

fn known_pipeline(lineages: Arc<FakeLineages>) -> Result<Pipeline, Report> {
    let pipeline = KnownVariantPipeline::new(
        catalogue()?,
        lineages,
        Arc::new(FakeResolver::default()),
        WeeklyProportions::default(),
    );
    Ok(pipeline.with_today(NaiveDate::from_ymd_opt(2021, 6, 15).unwrap()))
}

fn names(selectors: &[VariantSelector]) -> Vec<String> {
    selectors.iter().map(|s| s.to_string()).collect_vec()
}

// ----------------------------------------------------------------------------
// Guard and Slot
// ----------------------------------------------------------------------------

#[test]
fn guard_issues_tickets_for_new_keys_only() {
    let mut guard = Guard::new();
    let first = guard.issue("Switzerland").unwrap();
    assert!(guard.issue("Switzerland").is_none());
    let second = guard.issue("Germany").unwrap();
    assert!(!guard.is_current(&first));
    assert!(guard.is_current(&second));
    assert!(second.generation() > first.generation());
}

#[test]
fn guard_cancel_forgets_key() {
    let mut guard = Guard::new();
    let ticket = guard.issue("Switzerland").unwrap();
    guard.cancel();
    assert!(!guard.is_current(&ticket));
    assert_eq!(guard.key(), None);
    assert!(guard.issue("Switzerland").is_some());
}

#[tokio::test]
async fn slot_discards_result_of_previous_key() -> Result<(), Report> {
    let mut slot = Slot::new("test");

    // The Switzerland result is already queued when the key changes.
    let (done, finished) = oneshot::channel();
    slot.request("Switzerland", async move {
        let _ = done.send(());
        Ok("switzerland")
    });
    finished.await?;

    let (open, gate) = oneshot::channel::<()>();
    slot.request("Germany", async move {
        let _ = gate.await;
        Ok("germany")
    });
    let _ = open.send(());

    assert_eq!(slot.settle().await, Some(Outcome::Applied));
    assert_eq!(slot.value(), Some(&"germany"));
    assert_eq!(slot.key(), Some(&"Germany"));
    Ok(())
}

#[tokio::test]
async fn slot_aborts_superseded_request() -> Result<(), Report> {
    let mut slot = Slot::new("test");
    let (dropped, aborted) = oneshot::channel::<()>();
    slot.request("Switzerland", async move {
        let _dropped = dropped;
        std::future::pending::<()>().await;
        Ok("switzerland")
    });
    slot.request("Germany", async { Ok("germany") });

    // The aborted fetch is dropped without ever sending.
    assert!(aborted.await.is_err());
    assert_eq!(slot.settle().await, Some(Outcome::Applied));
    assert_eq!(slot.value(), Some(&"germany"));
    Ok(())
}

#[tokio::test]
async fn slot_apply_rejects_stale_ticket() {
    let mut slot: Slot<&str, u32> = Slot::new("test");
    let mut guard = Guard::new();
    let stale = guard.issue("Switzerland").unwrap();
    slot.request("Switzerland", async { Ok(1) });
    slot.request("Germany", async { Ok(2) });
    assert_eq!(slot.apply(stale, Ok(99)), Outcome::Stale);
    assert_eq!(slot.value(), None);
    assert_eq!(slot.settle().await, Some(Outcome::Applied));
    assert_eq!(slot.value(), Some(&2));
}

#[tokio::test]
async fn slot_keeps_value_on_failure() {
    let mut slot = Slot::new("test");
    slot.request("Switzerland", async { Ok(1) });
    assert_eq!(slot.settle().await, Some(Outcome::Applied));

    slot.request("Germany", async { Err(eyre!("Connection refused")) });
    assert_eq!(slot.settle().await, Some(Outcome::Failed));
    assert_eq!(slot.value(), Some(&1));
    assert!(!slot.is_pending());
}

async fn lost_connection() -> Result<u32, Report> {
    panic!("lost connection")
}

#[tokio::test]
async fn slot_panicking_fetch_fails() -> Result<(), Report> {
    let mut slot = Slot::new("test");
    slot.request("Switzerland", async { Ok(1) });
    assert_eq!(slot.settle().await, Some(Outcome::Applied));

    slot.request("Germany", lost_connection());
    let outcome = tokio::time::timeout(Duration::from_secs(5), slot.settle()).await?;
    assert_eq!(outcome, Some(Outcome::Failed));
    assert_eq!(slot.value(), Some(&1));
    assert!(!slot.is_pending());
    Ok(())
}

#[tokio::test]
async fn slot_same_key_is_not_requested_again() {
    let mut slot = Slot::new("test");
    assert!(slot.request("Switzerland", async { Ok(1) }));
    assert!(!slot.request("Switzerland", async { Ok(2) }));
    assert_eq!(slot.settle().await, Some(Outcome::Applied));
    assert_eq!(slot.settle().await, None);
    assert_eq!(slot.value(), Some(&1));

    slot.cancel();
    assert!(slot.request("Switzerland", async { Ok(3) }));
    assert_eq!(slot.settle().await, Some(Outcome::Applied));
    assert_eq!(slot.value(), Some(&3));
}

// ----------------------------------------------------------------------------
// Known Variant Pipeline
// ----------------------------------------------------------------------------

#[tokio::test]
async fn known_pipeline_fills_up_preview() -> Result<(), Report> {
    let mut pipeline = known_pipeline(Arc::new(lineages()))?;
    assert!(pipeline.known_variants().is_empty());

    pipeline.set("Switzerland", SamplingStrategy::AllSamples, "VOC")?;
    assert_eq!(pipeline.settle().await, Some(Outcome::Applied));

    assert_eq!(names(pipeline.selectors()), ["B.1.1.7", "B.1.617.2", "P.1"]);
    let known = pipeline.known_variants();
    assert_eq!(known.len(), 3);
    assert!(known.iter().all(|v| v.chart_data == Some(vec![0.25])));
    assert!(known.iter().all(|v| v.recent_proportion == Some(0.25)));
    Ok(())
}

#[tokio::test]
async fn known_pipeline_ignores_superseded_country() -> Result<(), Report> {
    let lineages = Arc::new(lineages());
    let mut pipeline = known_pipeline(Arc::clone(&lineages))?;

    let switzerland = lineages.gates.close("Switzerland");
    pipeline.set("Switzerland", SamplingStrategy::AllSamples, "VOC")?;
    pipeline.set("Germany", SamplingStrategy::AllSamples, "VOC")?;
    assert_eq!(pipeline.settle().await, Some(Outcome::Applied));

    // The Switzerland fetch was aborted, releasing it changes nothing.
    let _ = switzerland.send(());
    assert_eq!(pipeline.settle().await, None);
    assert_eq!(pipeline.key().map(|k| k.country.as_str()), Some("Germany"));
    assert_eq!(names(pipeline.selectors()), ["B.1.1.7", "B.1.351", "C.37"]);
    Ok(())
}

#[tokio::test]
async fn known_pipeline_same_key_fetches_once() -> Result<(), Report> {
    let lineages = Arc::new(lineages());
    let mut pipeline = known_pipeline(Arc::clone(&lineages))?;
    pipeline.set("Switzerland", SamplingStrategy::AllSamples, "VOC")?;
    pipeline.settle().await;
    pipeline.set("Switzerland", SamplingStrategy::AllSamples, "VOC")?;
    assert_eq!(pipeline.settle().await, None);
    assert_eq!(lineages.calls.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn known_pipeline_surveillance_outside_switzerland() -> Result<(), Report> {
    let mut pipeline = known_pipeline(Arc::new(lineages()))?;
    pipeline.set("Germany", SamplingStrategy::Surveillance, "VOC")?;
    let key = pipeline.key().cloned();
    assert_eq!(key.map(|k| k.sampling_strategy), Some(SamplingStrategy::AllSamples));
    Ok(())
}

#[tokio::test]
async fn known_pipeline_failure_keeps_preview() -> Result<(), Report> {
    let mut pipeline = known_pipeline(Arc::new(lineages()))?;
    pipeline.set("Switzerland", SamplingStrategy::AllSamples, "VOC")?;
    pipeline.settle().await;

    pipeline.set("Atlantis", SamplingStrategy::AllSamples, "VOC")?;
    assert_eq!(pipeline.settle().await, Some(Outcome::Failed));
    assert_eq!(names(pipeline.selectors()), ["B.1.1.7", "B.1.617.2", "P.1"]);

    // The Switzerland samples are not projected against the Atlantis baseline.
    let known = pipeline.known_variants();
    assert_eq!(known.len(), 3);
    assert!(known.iter().all(|v| v.chart_data.is_none()));
    assert!(known.iter().all(|v| v.recent_proportion.is_none()));
    Ok(())
}

#[tokio::test]
async fn known_pipeline_clears_chart_data_on_rekey() -> Result<(), Report> {
    let lineages = Arc::new(lineages());
    let mut pipeline = known_pipeline(Arc::clone(&lineages))?;
    pipeline.set("Switzerland", SamplingStrategy::AllSamples, "VOC")?;
    pipeline.settle().await;
    assert!(pipeline.known_variants().iter().all(|v| v.chart_data.is_some()));

    let germany = lineages.gates.close("Germany");
    pipeline.set("Germany", SamplingStrategy::AllSamples, "VOC")?;
    assert!(pipeline.known_variants().iter().all(|v| v.chart_data.is_none()));

    let _ = germany.send(());
    pipeline.settle().await;
    let known = pipeline.known_variants();
    assert_eq!(known.len(), 3);
    assert!(known.iter().all(|v| v.chart_data == Some(vec![0.005])));
    Ok(())
}

#[tokio::test]
async fn known_pipeline_rejects_unknown_list() -> Result<(), Report> {
    let mut pipeline = known_pipeline(Arc::new(lineages()))?;
    assert!(pipeline.set("Switzerland", SamplingStrategy::AllSamples, "Nope").is_err());
    assert_eq!(pipeline.key(), None);
    Ok(())
}

#[tokio::test]
async fn known_pipeline_select() -> Result<(), Report> {
    let mut pipeline = known_pipeline(Arc::new(lineages()))?;
    pipeline.set("Switzerland", SamplingStrategy::AllSamples, "VOC")?;
    pipeline.settle().await;

    let mut selected = None;
    pipeline.select(1, |s| selected = Some(s))?;
    assert_eq!(selected, Some(Selection::Known(VariantSelector::lineage("B.1.617.2"))));
    assert!(pipeline.select(3, |_| ()).is_err());
    Ok(())
}

// ----------------------------------------------------------------------------
// New Variant Pipeline
// ----------------------------------------------------------------------------

fn interesting_variants() -> FakeInterestingVariants {
    let mut service = FakeInterestingVariants::default();
    let switzerland = InterestingVariantResult {
        computed_at: None,
        variants: vec![
            candidate(&["S:N501Y", "N:P13L"], 0.4),
            candidate(&["N:P13L", "S:N501Y"], 0.3),
        ],
    };
    let germany = InterestingVariantResult {
        computed_at: None,
        variants: vec![candidate(&["S:E484K"], 0.2)],
    };
    service.results.insert("Switzerland".to_string(), switzerland);
    service.results.insert("Germany".to_string(), germany);
    service
}

#[tokio::test]
async fn new_pipeline_dedupes_candidates() {
    let mut pipeline = NewVariantPipeline::new(Arc::new(interesting_variants()));
    assert_eq!(pipeline.variants(&DiscoveryFilter::default()), None);

    pipeline.set_country("Switzerland");
    assert_eq!(pipeline.settle().await, Some(Outcome::Applied));
    let variants = pipeline.variants(&DiscoveryFilter::default()).unwrap_or_default();
    assert_eq!(variants.len(), 1);
    assert_eq!(variants[0].candidate.f.value, 0.4);
}

#[tokio::test]
async fn new_pipeline_ignores_superseded_country() {
    let service = Arc::new(interesting_variants());
    let mut pipeline = NewVariantPipeline::new(Arc::clone(&service));

    let switzerland = service.gates.close("Switzerland");
    assert!(pipeline.set_country("Switzerland"));
    assert!(pipeline.set_country("Germany"));
    assert_eq!(pipeline.settle().await, Some(Outcome::Applied));
    let _ = switzerland.send(());

    assert_eq!(pipeline.settle().await, None);
    assert_eq!(pipeline.country().map(String::as_str), Some("Germany"));
    let signatures = pipeline
        .variants(&DiscoveryFilter::default())
        .unwrap_or_default()
        .iter()
        .map(|v| v.signature.to_string())
        .collect_vec();
    assert_eq!(signatures, ["S:E484K"]);
}

#[tokio::test]
async fn new_pipeline_select_hands_all_mutations() {
    let mut pipeline = NewVariantPipeline::new(Arc::new(interesting_variants()));
    pipeline.set_country("Switzerland");
    pipeline.settle().await;

    let filter = DiscoveryFilter { gene: GeneFilter::Gene("S".into()), characteristic_only: false };
    let variants = pipeline.variants(&filter).unwrap_or_default();
    assert_eq!(variants[0].visible_mutations.len(), 1);

    let mut selected = None;
    pipeline.select(&variants[0], |s| selected = Some(s));
    let expected = Variant::from_mutations(["S:N501Y".to_string(), "N:P13L".to_string()]);
    assert_eq!(selected, Some(Selection::New(expected)));
}
