//! Located fetch: resolve a coordinate, then read from the weather endpoint.
//!
//! Each run moves through [`FetchStage`]s, published on a watch channel so a
//! front end can show progress:
//! `NotAttempted -> LocationResolved -> DataFetched | Failed`.
//! Runs on one fetcher are serialized, so a subscriber sees the stages of one
//! run before the next run starts.
//! Location problems never fail a run (the fallback coordinate is used);
//! endpoint problems always do.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{watch, Mutex};

use crate::advisory::{advise, DayAdvisory};
use crate::location::{resolve_location, LocateOptions, LocationProvider};
use crate::provider::WeatherProvider;
use crate::types::{CurrentReading, Located, LocatedQuery, WeatherError};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FetchStage {
    NotAttempted,
    LocationResolved(LocatedQuery),
    DataFetched(LocatedQuery),
    Failed(LocatedQuery),
}

pub struct LocatedFetcher {
    location: Arc<dyn LocationProvider>,
    provider: WeatherProvider,
    options: LocateOptions,
    stage: watch::Sender<FetchStage>,
    run_lock: Mutex<()>,
}

impl LocatedFetcher {
    pub fn new(
        location: Arc<dyn LocationProvider>,
        provider: WeatherProvider,
        options: LocateOptions,
    ) -> Self {
        let (stage, _) = watch::channel(FetchStage::NotAttempted);
        Self {
            location,
            provider,
            options,
            stage,
            run_lock: Mutex::new(()),
        }
    }

    pub fn options(&self) -> &LocateOptions {
        &self.options
    }

    /// Watch stage transitions of subsequent runs.
    pub fn subscribe(&self) -> watch::Receiver<FetchStage> {
        self.stage.subscribe()
    }

    /// Stage reached by the latest run.
    pub fn stage(&self) -> FetchStage {
        *self.stage.borrow()
    }

    /// Current conditions at the resolved coordinate.
    ///
    /// # Errors
    /// Returns the endpoint failure; location failures fall back instead.
    pub async fn current_conditions(&self) -> Result<Located<CurrentReading>, WeatherError> {
        self.run(|query| self.provider.current(query)).await
    }

    /// Five-day forecast with spraying advice at the resolved coordinate.
    ///
    /// # Errors
    /// Returns the endpoint failure; location failures fall back instead.
    pub async fn forecast(&self) -> Result<Located<Vec<DayAdvisory>>, WeatherError> {
        self.run(|query| async move { self.provider.forecast(query).await.map(advise) })
            .await
    }

    async fn run<T, F, Fut>(&self, fetch: F) -> Result<Located<T>, WeatherError>
    where
        F: FnOnce(LocatedQuery) -> Fut,
        Fut: Future<Output = Result<T, WeatherError>>,
    {
        let _run = self.run_lock.lock().await;
        self.stage.send_replace(FetchStage::NotAttempted);

        let query = resolve_location(self.location.as_ref(), &self.options).await;
        self.stage.send_replace(FetchStage::LocationResolved(query));

        match fetch(query).await {
            Ok(data) => {
                self.stage.send_replace(FetchStage::DataFetched(query));
                Ok(Located { query, data })
            }
            Err(e) => {
                tracing::error!("Weather fetch failed: {}", e);
                self.stage.send_replace(FetchStage::Failed(query));
                Err(e)
            }
        }
    }
}
