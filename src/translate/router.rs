use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{with_deadline, ParleyError, Result, TranslationLeg};
use crate::language::{normalize_code, LanguagePair, SupportedPairSet};
use super::cache::ModelCache;

/// How a request is served
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Source and target match; text is returned as-is
    Identity,
    /// A dedicated model exists for the pair
    Direct,
    /// Two hops through the pivot language
    Pivot { via: String },
}

impl Route {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Identity => "identity",
            Self::Direct => "direct",
            Self::Pivot { .. } => "pivot",
        }
    }
}

/// Translated text plus the route that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translation {
    pub text: String,
    pub route: Route,
}

/// Decides between identity, direct and pivot translation and runs the
/// chosen models through the shared [`ModelCache`].
pub struct TranslationRouter {
    cache: ModelCache,
    supported: SupportedPairSet,
    pivot: String,
    run_timeout: Duration,
}

impl TranslationRouter {
    pub fn new(
        cache: ModelCache,
        supported: SupportedPairSet,
        pivot_language: &str,
        run_timeout: Duration,
    ) -> Self {
        Self {
            cache,
            supported,
            pivot: normalize_code(pivot_language),
            run_timeout,
        }
    }

    /// Translate `text` from `source` to `target`
    pub async fn translate(&self, text: &str, source: &str, target: &str) -> Result<Translation> {
        if text.is_empty() {
            return Err(ParleyError::InvalidInput("Input text is empty".to_string()));
        }

        let pair = LanguagePair::new(source, target)?;
        let route = self.plan(&pair)?;
        info!("Translating {} via {} route", pair, route.label());

        let translated = match &route {
            Route::Identity => text.to_string(),
            Route::Direct => {
                self.run_leg(&pair, TranslationLeg::Direct, &pair, text)
                    .await?
            }
            Route::Pivot { via } => {
                let to_pivot = LanguagePair::new(pair.source(), via)?;
                let from_pivot = LanguagePair::new(via, pair.target())?;

                let intermediate = self
                    .run_leg(&pair, TranslationLeg::ToPivot, &to_pivot, text)
                    .await?;
                debug!("Pivot intermediate for {}: {}", pair, intermediate);

                self.run_leg(&pair, TranslationLeg::FromPivot, &from_pivot, &intermediate)
                    .await?
            }
        };

        Ok(Translation {
            text: translated,
            route,
        })
    }

    /// Work out the route for a pair without loading or running anything
    pub fn route(&self, source: &str, target: &str) -> Result<Route> {
        self.plan(&LanguagePair::new(source, target)?)
    }

    fn plan(&self, pair: &LanguagePair) -> Result<Route> {
        if pair.is_identity() {
            return Ok(Route::Identity);
        }

        if self.supported.contains(pair) {
            return Ok(Route::Direct);
        }

        let (source, target) = (pair.source(), pair.target());
        if source != self.pivot
            && target != self.pivot
            && self.supported.contains_codes(source, &self.pivot)
            && self.supported.contains_codes(&self.pivot, target)
        {
            return Ok(Route::Pivot {
                via: self.pivot.clone(),
            });
        }

        warn!("No route for {}", pair);
        Err(ParleyError::UnsupportedLanguagePair { pair: pair.clone() })
    }

    /// Load (or reuse) the model for `leg_pair` and run it once
    async fn run_leg(
        &self,
        requested: &LanguagePair,
        leg: TranslationLeg,
        leg_pair: &LanguagePair,
        text: &str,
    ) -> Result<String> {
        let result = async {
            let model = self.cache.get_or_load(leg_pair).await?;
            let operation = format!("Translating {}", leg_pair);
            with_deadline(&operation, self.run_timeout, model.translate(text)).await
        }
        .await;

        result.map_err(|cause| {
            warn!("Translation of {} failed on {}: {}", requested, leg, cause);
            ParleyError::TranslationFailed {
                pair: requested.clone(),
                leg,
                cause: Box::new(cause),
            }
        })
    }

    pub fn supported_pairs(&self) -> &SupportedPairSet {
        &self.supported
    }

    pub fn pivot_language(&self) -> &str {
        &self.pivot
    }

    pub fn cache(&self) -> &ModelCache {
        &self.cache
    }
}
