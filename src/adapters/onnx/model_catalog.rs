use async_trait::async_trait;

use crate::application::ports::ModelCatalogPort;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::model::ModelId;

pub struct OnnxModelCatalog;

impl OnnxModelCatalog {
    pub fn new() -> Self { Self }
}

impl Default for OnnxModelCatalog {
    fn default() -> Self { Self::new() }
}

#[async_trait]
impl ModelCatalogPort for OnnxModelCatalog {
    async fn validate_model(&self, model: &ModelId) -> DomainResult<()> {
        if model.onnx_path.trim().is_empty() {
            return Err(DomainError::Detector("model path is empty".into()));
        }
        match tokio::fs::metadata(&model.onnx_path).await {
            Ok(meta) if meta.is_file() => Ok(()),
            Ok(_) => Err(DomainError::Detector(format!("model path is not a file: {}", model.onnx_path))),
            Err(_) => Err(DomainError::Detector(format!("model file not found: {}", model.onnx_path))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(path: &str) -> ModelId {
        ModelId { name: "yolov8n".into(), onnx_path: path.into() }
    }

    #[tokio::test]
    async fn rejects_empty_and_missing_paths() {
        let catalog = OnnxModelCatalog::new();
        assert!(catalog.validate_model(&model("  ")).await.is_err());
        let err = catalog.validate_model(&model("/definitely/not/here.onnx")).await.unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[tokio::test]
    async fn rejects_directories_accepts_files() {
        let catalog = OnnxModelCatalog::new();
        let dir = std::env::temp_dir();
        assert!(catalog.validate_model(&model(dir.to_str().unwrap())).await.is_err());

        let file = dir.join(format!("yolo-detect-api-catalog-{}.onnx", std::process::id()));
        std::fs::write(&file, b"onnx").unwrap();
        let res = catalog.validate_model(&model(file.to_str().unwrap())).await;
        std::fs::remove_file(&file).unwrap();
        assert!(res.is_ok());
    }
}
