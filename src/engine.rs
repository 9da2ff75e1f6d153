//! Typing engine
//!
//! Ties the pipeline together for one request: resolve the active layout,
//! fetch its character map from the cache, translate the text and inject
//! the steps. Layout problems never stop typing; the engine degrades to the
//! last layout that worked, then to the configured default, then to the
//! built-in US table, and reports the problem as a warning.

use crate::cache::LayoutCache;
use crate::config::Config;
use crate::error::{DictypeError, InjectionError, LayoutQueryError};
use crate::fallback;
use crate::inject::{self, CancelFlag, InjectionReport, Injector, InjectorOptions};
use crate::keymap::{CharacterMap, LayoutIdentifier};
use crate::layout::{self, builtin, LayoutSource};
use crate::symbols;
use crate::translate::translate;
use std::sync::{Arc, Mutex, OnceLock};

/// Finds the character map to translate with
pub struct LayoutResolver {
    cache: LayoutCache,
    /// Used when the active layout cannot be detected
    default_id: LayoutIdentifier,
    last_good: Mutex<Option<LayoutIdentifier>>,
    builtin: OnceLock<Arc<CharacterMap>>,
}

impl LayoutResolver {
    pub fn new(source: Arc<dyn LayoutSource>, default_id: LayoutIdentifier) -> Self {
        Self {
            cache: LayoutCache::new(source),
            default_id,
            last_good: Mutex::new(None),
            builtin: OnceLock::new(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let source: Arc<dyn LayoutSource> = Arc::from(layout::create_source(&config.layout));
        Self::new(source, config.layout.default_identifier())
    }

    pub fn cache(&self) -> &LayoutCache {
        &self.cache
    }

    /// Last layout whose character map was obtained successfully
    pub fn last_good(&self) -> Option<LayoutIdentifier> {
        self.last_good
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn set_last_good(&self, id: &LayoutIdentifier) {
        *self.last_good.lock().unwrap_or_else(|e| e.into_inner()) = Some(id.clone());
    }

    fn builtin_map(&self) -> Arc<CharacterMap> {
        Arc::clone(self.builtin.get_or_init(|| {
            Arc::new(symbols::build(
                LayoutIdentifier::us(),
                &builtin::us_qwerty(),
            ))
        }))
    }

    /// Character map for the active layout, plus the first layout error met
    /// on the way if a substitute had to be used
    pub async fn resolve(&self) -> (Arc<CharacterMap>, Option<LayoutQueryError>) {
        let (id, mut warning) = match self.cache.source().current_identifier().await {
            Ok(id) => (id, None),
            Err(e) => {
                let id = self.last_good().unwrap_or_else(|| self.default_id.clone());
                tracing::warn!("Cannot determine active layout ({}), using '{}'", e, id);
                (id, Some(e))
            }
        };

        match self.cache.get_or_build(&id).await {
            Ok(map) => {
                self.set_last_good(&id);
                return (map, warning);
            }
            Err(e) => {
                tracing::warn!("Cannot load layout '{}': {}", id, e);
                if warning.is_none() {
                    warning = Some(e);
                }
            }
        }

        if let Some(previous) = self.last_good().filter(|prev| *prev != id) {
            match self.cache.get_or_build(&previous).await {
                Ok(map) => {
                    tracing::warn!("Using last working layout '{}'", previous);
                    return (map, warning);
                }
                Err(e) => tracing::debug!("Last working layout '{}' failed too: {}", previous, e),
            }
        }

        tracing::warn!("Using built-in US layout");
        (self.builtin_map(), warning)
    }
}

/// Types text into the focused application
pub struct TypingEngine {
    resolver: LayoutResolver,
    injector: Injector,
}

impl TypingEngine {
    pub fn new(resolver: LayoutResolver, injector: Injector) -> Self {
        Self { resolver, injector }
    }

    /// Build the engine with the configured layout source, key event
    /// backend and fallback channel
    pub async fn from_config(config: &Config) -> Result<Self, DictypeError> {
        let sink = inject::create_sink(&config.injection).await?;
        let fallback = fallback::create_fallback(&config.fallback);
        if !fallback.is_available().await {
            tracing::warn!(
                "Fallback '{}' is not available; unmappable characters will fail",
                fallback.name()
            );
        }
        let injector = Injector::new(
            sink,
            fallback,
            InjectorOptions::from(&config.injection),
        );
        Ok(Self::new(LayoutResolver::from_config(config), injector))
    }

    pub fn resolver(&self) -> &LayoutResolver {
        &self.resolver
    }

    /// Type `text` on the active layout.
    ///
    /// Fails only when another session is active; everything else that goes
    /// wrong is described by the returned report.
    pub async fn type_text(
        &self,
        text: &str,
        cancel: &CancelFlag,
    ) -> Result<InjectionReport, InjectionError> {
        let (map, warning) = self.resolver.resolve().await;
        let steps = translate(text, &map);
        tracing::debug!(
            "Typing {} characters on '{}' ({} via fallback)",
            steps.len(),
            map.identifier(),
            steps.iter().filter(|s| s.is_fallback()).count()
        );

        let mut report = self.injector.inject(&steps, Some(&map), cancel).await?;
        report.layout_warning = warning;
        if report.is_degraded() {
            tracing::warn!("Degraded output: {}", report.summary());
        }
        Ok(report)
    }
}
