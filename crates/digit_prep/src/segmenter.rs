//! Segmenter variants and the session registry shared across requests.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use image::{DynamicImage, RgbaImage};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr, VariantNames};
use tracing::{debug, info};

use crate::{
    error::{DigitPrepError, Result},
    traits::{BackgroundSegmenter, SegmenterFactory},
};

#[derive(
    Debug, Clone, Copy, Default,
    Serialize, Deserialize, JsonSchema,
    Display, EnumString, EnumIter, VariantNames, IntoStaticStr,
    PartialEq, Eq, Hash,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum SegmenterVariant {
    /// Small, fast model. Recommended for digits.
    #[default]
    Lightweight,
    /// Quality/speed trade-off.
    Balanced,
    /// Newest general-purpose model, slowest.
    HighQuality,
}

impl SegmenterVariant {
    /// Name of the underlying segmentation model.
    pub fn model_name(&self) -> &'static str {
        match self {
            Self::Lightweight => "u2netp",
            Self::Balanced => "u2net",
            Self::HighQuality => "isnet-general-use",
        }
    }

    pub fn variant_names() -> &'static [&'static str] {
        <Self as VariantNames>::VARIANTS
    }
}

/// Process-wide cache of segmenter sessions, one per variant.
///
/// Sessions are created lazily by the factory on first use and reused until
/// [`SegmenterRegistry::shutdown`].
pub struct SegmenterRegistry {
    factory: Box<dyn SegmenterFactory>,
    sessions: RwLock<HashMap<SegmenterVariant, Arc<dyn BackgroundSegmenter>>>,
}

impl SegmenterRegistry {
    pub fn new<F>(factory: F) -> Self
    where
        F: SegmenterFactory + 'static,
    {
        Self {
            factory: Box::new(factory),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Registry backed by [`PassthroughFactory`].
    pub fn passthrough() -> Self {
        Self::new(PassthroughFactory)
    }

    /// Return the cached session for `variant`, creating it on first use.
    pub fn get_or_create(&self, variant: SegmenterVariant) -> Result<Arc<dyn BackgroundSegmenter>> {
        {
            let sessions = self.sessions.read().unwrap_or_else(|e| e.into_inner());
            if let Some(session) = sessions.get(&variant) {
                return Ok(Arc::clone(session));
            }
        }

        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        // Another caller may have published while we waited for the write lock.
        if let Some(session) = sessions.get(&variant) {
            return Ok(Arc::clone(session));
        }

        info!(variant = %variant, model = variant.model_name(), "Creating segmenter session");
        let session = self.factory.create(variant)?;
        sessions.insert(variant, Arc::clone(&session));
        Ok(session)
    }

    pub fn contains(&self, variant: SegmenterVariant) -> bool {
        self.sessions
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(&variant)
    }

    pub fn len(&self) -> usize {
        self.sessions.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every cached session.
    pub fn shutdown(&self) {
        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        debug!(count = sessions.len(), "Dropping segmenter sessions");
        sessions.clear();
    }
}

/// Uses the input's own alpha channel as the foreground mask. RGB inputs come
/// back fully opaque.
#[derive(Debug, Clone, Default)]
pub struct AlphaPassthroughSegmenter;

impl BackgroundSegmenter for AlphaPassthroughSegmenter {
    fn segment(&self, image: &DynamicImage) -> Result<RgbaImage> {
        Ok(image.to_rgba8())
    }
}

/// Hands out [`AlphaPassthroughSegmenter`] for every variant.
#[derive(Debug, Clone, Default)]
pub struct PassthroughFactory;

impl SegmenterFactory for PassthroughFactory {
    fn create(&self, _variant: SegmenterVariant) -> Result<Arc<dyn BackgroundSegmenter>> {
        Ok(Arc::new(AlphaPassthroughSegmenter))
    }
}

/// Run a segmenter and check it kept the input's spatial size.
pub fn segment_checked(segmenter: &dyn BackgroundSegmenter, image: &DynamicImage) -> Result<RgbaImage> {
    let segmented = segmenter.segment(image)?;
    if segmented.dimensions() != (image.width(), image.height()) {
        return Err(DigitPrepError::SegmenterShapeMismatch {
            expected_width: image.width(),
            expected_height: image.height(),
            actual_width: segmented.width(),
            actual_height: segmented.height(),
        });
    }
    Ok(segmented)
}
