use crate::api::{
    InterestingVariantService, LineageFrequencyService, LineageQuery, SampleSetResolver,
    SamplingStrategy,
};
use crate::discovery::InterestingVariantResult;
use crate::known::{RawLineageCount, SampleCount, SampleSet};
use color_eyre::eyre::{eyre, Report, Result, WrapErr};
use color_eyre::Help;
use covcurate_variant::VariantSelector;
use log::debug;
use serde::de::DeserializeOwned;

/// JSON client for the sample database and its computed endpoints.
///
/// Dropping a request future (ex. when its task is aborted) cancels the HTTP request.
#[derive(Clone, Debug)]
pub struct ApiClient {
    host: String,
    client: reqwest::Client,
}

impl ApiClient {
    /// Returns a client for the services at `host`, ex. [`DEFAULT_HOST`](crate::api::DEFAULT_HOST).
    pub fn new(host: &str) -> Result<Self, Report> {
        let user_agent = format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .build()
            .wrap_err("Failed to build HTTP client.")?;
        Ok(ApiClient { host: host.trim_end_matches('/').to_string(), client })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    async fn get_json<T>(&self, path: &str, query: &[(&str, String)]) -> Result<T, Report>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}/{path}", self.host);
        debug!("Requesting: {url} {query:?}");
        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .wrap_err(format!("Failed to request: {url}"))?;
        if !response.status().is_success() {
            return Err(eyre!("Failed to request: {url}")
                .suggestion(format!("Status code: {}", response.status())));
        }
        let body = response.json().await.wrap_err(format!("Failed to parse response: {url}"))?;
        Ok(body)
    }

    fn sample_query(
        country: &str,
        sampling_strategy: SamplingStrategy,
    ) -> Vec<(&'static str, String)> {
        let mut query = vec![("country", country.to_string())];
        if let Some(data_type) = sampling_strategy.literal() {
            query.push(("dataType", data_type.to_string()));
        }
        query
    }

    async fn sample_set(
        &self,
        selector: Option<&VariantSelector>,
        country: &str,
        sampling_strategy: SamplingStrategy,
    ) -> Result<SampleSet, Report> {
        let mut query = ApiClient::sample_query(country, sampling_strategy);
        query.push(("fields", "date".to_string()));
        if let Some(selector) = selector {
            if let Some(name) = &selector.variant.name {
                query.push(("pangolinLineage", name.clone()));
            }
            if !selector.variant.mutations.is_empty() {
                query.push(("mutations", selector.variant.mutations.join(",")));
                query.push(("matchPercentage", selector.match_percentage().to_string()));
            }
        }
        let counts: Vec<SampleCount> = self.get_json("resource/sample", &query).await?;
        Ok(SampleSet::new(selector.cloned(), counts))
    }
}

impl LineageFrequencyService for ApiClient {
    async fn lineage_counts(&self, query: &LineageQuery) -> Result<Vec<RawLineageCount>, Report> {
        let mut params = ApiClient::sample_query(&query.country, query.sampling_strategy);
        params.push(("fields", "pangolinLineage".to_string()));
        params.push(("dateFrom", query.date_from.format("%Y-%m-%d").to_string()));
        self.get_json("resource/sample", &params).await
    }
}

impl SampleSetResolver for ApiClient {
    async fn resolve(
        &self,
        selectors: &[VariantSelector],
        country: &str,
        sampling_strategy: SamplingStrategy,
    ) -> Result<Vec<SampleSet>, Report> {
        let mut sample_sets = Vec::with_capacity(selectors.len());
        for selector in selectors {
            sample_sets.push(self.sample_set(Some(selector), country, sampling_strategy).await?);
        }
        Ok(sample_sets)
    }

    async fn baseline(
        &self,
        country: &str,
        sampling_strategy: SamplingStrategy,
    ) -> Result<SampleSet, Report> {
        self.sample_set(None, country, sampling_strategy).await
    }
}

impl InterestingVariantService for ApiClient {
    async fn interesting_variants(
        &self,
        country: &str,
    ) -> Result<InterestingVariantResult, Report> {
        let query = vec![("country", country.to_string())];
        self.get_json("computed/find-interesting-variants", &query).await
    }
}
