//! Model capabilities used by the analyzer.
//!
//! Both traits return the raw text the model produced; parsing is left to
//! [`crate::parse::parse_insight`] so every implementation gets the same
//! strict contract.

use async_trait::async_trait;

use crate::error::AnalyzeError;
use crate::image::ChartImage;

/// A model that can read a chart image.
#[async_trait]
pub trait VisionModel: Send + Sync {
    /// Send `instruction` together with `image` and return the response text.
    ///
    /// # Errors
    ///
    /// [`AnalyzeError::UpstreamUnavailable`] for transport failures and
    /// non-success statuses, [`AnalyzeError::UpstreamFormat`] when the
    /// response envelope carries no text.
    async fn extract(
        &self,
        instruction: &str,
        image: &ChartImage<'_>,
    ) -> Result<String, AnalyzeError>;
}

/// A text-only model used for the audit pass.
#[async_trait]
pub trait TextModel: Send + Sync {
    /// Send `instruction` and return the response text.
    ///
    /// # Errors
    ///
    /// Same classification as [`VisionModel::extract`].
    async fn complete(&self, instruction: &str) -> Result<String, AnalyzeError>;
}
