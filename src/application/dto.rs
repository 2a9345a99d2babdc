use serde::{Deserialize, Serialize};

use crate::domain::{
    detection::Detection,
    errors::{DomainError, DomainResult},
};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectRequest {
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub target: Option<String>,
}

impl DetectRequest {
    pub fn validate(&self) -> DomainResult<&str> {
        require_image(self.image.as_deref())
    }

    /// Requested class name; blank strings count as no target.
    pub fn target(&self) -> Option<&str> {
        self.target.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }

    /// Validated image payload plus the normalized target, by value.
    pub fn into_parts(self) -> DomainResult<(String, Option<String>)> {
        self.validate()?;
        let target = self.target().map(str::to_string);
        Ok((self.image.unwrap_or_default(), target))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DebugDetectRequest {
    #[serde(default)]
    pub image: Option<String>,
}

impl DebugDetectRequest {
    pub fn validate(&self) -> DomainResult<&str> {
        require_image(self.image.as_deref())
    }

    pub fn into_image(self) -> DomainResult<String> {
        self.validate()?;
        Ok(self.image.unwrap_or_default())
    }
}

fn require_image(image: Option<&str>) -> DomainResult<&str> {
    match image {
        Some(img) if !img.trim().is_empty() => Ok(img),
        _ => Err(DomainError::Validation("missing required field 'image'".into())),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionDto {
    pub class: String,
    pub confidence: f32,
    pub bbox: [f32; 4],
}

impl From<&Detection> for DetectionDto {
    fn from(d: &Detection) -> Self {
        Self { class: d.label.clone(), confidence: d.score, bbox: d.bbox() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionResponse {
    pub success: bool,
    pub detections: Vec<DetectionDto>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_found: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_confidence: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebugDetectionResponse {
    pub success: bool,
    pub detections: Vec<DetectionDto>,
    pub annotated_image: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub kind: String,
}

impl From<&DomainError> for ErrorResponse {
    fn from(e: &DomainError) -> Self {
        Self { success: false, error: e.to_string(), kind: e.kind().to_string() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub model_loaded: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn blank_target_counts_as_absent() {
        let req: DetectRequest = serde_json::from_str(r#"{"image":"x","target":"   "}"#).unwrap();
        assert_eq!(req.target(), None);

        let req: DetectRequest = serde_json::from_str(r#"{"image":"x","target":" Dog "}"#).unwrap();
        assert_eq!(req.target(), Some("Dog"));
    }

    #[test]
    fn missing_image_is_a_validation_error() {
        let req: DetectRequest = serde_json::from_str(r#"{"target":"dog"}"#).unwrap();
        assert_eq!(req.validate().unwrap_err().kind(), "validation");

        let req = DebugDetectRequest { image: Some(String::new()) };
        assert!(req.validate().is_err());
    }

    #[test]
    fn into_parts_hands_over_image_and_trimmed_target() {
        let req = DetectRequest { image: Some("data:,abc".into()), target: Some(" cat ".into()) };
        assert_eq!(req.into_parts().unwrap(), ("data:,abc".to_string(), Some("cat".to_string())));

        let req = DetectRequest { image: None, target: Some("cat".into()) };
        assert_eq!(req.into_parts().unwrap_err().kind(), "validation");

        let req = DebugDetectRequest { image: Some("  ".into()) };
        assert!(req.into_image().is_err());
    }

    #[test]
    fn target_fields_are_omitted_when_absent() {
        let resp = DetectionResponse {
            success: true,
            detections: vec![],
            target_found: None,
            target_confidence: None,
        };
        assert_eq!(serde_json::to_value(&resp).unwrap(), json!({"success": true, "detections": []}));
    }

    #[test]
    fn detection_serializes_with_class_key() {
        let d = Detection {
            x1: 1.0,
            y1: 2.0,
            x2: 3.0,
            y2: 4.0,
            score: 0.5,
            class_id: 16,
            label: "dog".into(),
        };
        let v = serde_json::to_value(DetectionDto::from(&d)).unwrap();
        assert_eq!(v, json!({"class": "dog", "confidence": 0.5, "bbox": [1.0, 2.0, 3.0, 4.0]}));
    }

    #[test]
    fn error_envelope_shape() {
        let e = DomainError::Decode("bad".into());
        let v = serde_json::to_value(ErrorResponse::from(&e)).unwrap();
        assert_eq!(v["success"], json!(false));
        assert_eq!(v["error"], json!("invalid image: bad"));
        assert_eq!(v["kind"], json!("decode"));
    }
}
