use std::sync::Arc;

use async_trait::async_trait;
use image::{DynamicImage, RgbImage};

use crate::domain::{detection::Detection, errors::DomainResult, model::ModelId};

/// A loaded, ready-to-run object detector. Implementations block the calling
/// thread while inferring.
pub trait DetectorPort: Send + Sync {
    fn detect(&self, image: &DynamicImage) -> DomainResult<Vec<Detection>>;
}

/// Builds a detector from a model on disk. Called at most once per successful load.
pub trait DetectorLoaderPort: Send + Sync {
    fn load(&self, model: &ModelId) -> DomainResult<Arc<dyn DetectorPort>>;
}

pub trait AnnotatorPort: Send + Sync {
    fn annotate(&self, image: &DynamicImage, detections: &[Detection]) -> RgbImage;
}

#[async_trait]
pub trait ModelCatalogPort: Send + Sync {
    async fn validate_model(&self, model: &ModelId) -> DomainResult<()>;
}
