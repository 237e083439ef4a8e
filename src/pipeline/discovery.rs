use crate::api::{Country, InterestingVariantService};
use crate::discovery::{discover, DiscoveryFilter, InterestingVariantResult, NewVariant};
use crate::pipeline::{Outcome, Selection, Slot};
use log::info;
use std::sync::Arc;

/// Candidate variants of one country, filtered and deduplicated on demand.
pub struct NewVariantPipeline<S> {
    service: Arc<S>,
    candidates: Slot<Country, InterestingVariantResult>,
}

impl<S: InterestingVariantService> NewVariantPipeline<S> {
    pub fn new(service: Arc<S>) -> Self {
        NewVariantPipeline { service, candidates: Slot::new("interesting variants") }
    }

    pub fn country(&self) -> Option<&Country> {
        self.candidates.key()
    }

    /// Request the candidates of `country`, returns true if a fetch was started.
    pub fn set_country(&mut self, country: &str) -> bool {
        let service = Arc::clone(&self.service);
        let owned = country.to_string();
        let requested = self.candidates.request(country.to_string(), async move {
            service.interesting_variants(&owned).await
        });
        if requested {
            info!("Loading interesting variants of {country}.");
        }
        requested
    }

    pub async fn settle(&mut self) -> Option<Outcome> {
        self.candidates.settle().await
    }

    /// The last candidates received.
    pub fn result(&self) -> Option<&InterestingVariantResult> {
        self.candidates.value()
    }

    /// The new variants visible under `filter`, [`None`] until candidates are available.
    pub fn variants(&self, filter: &DiscoveryFilter) -> Option<Vec<NewVariant>> {
        self.candidates.value().map(|result| discover(result, filter))
    }

    /// Hand `variant` to `on_select`, with all of its mutations.
    pub fn select<F>(&self, variant: &NewVariant, on_select: F)
    where
        F: FnOnce(Selection),
    {
        on_select(Selection::New(variant.candidate.variant()));
    }
}
