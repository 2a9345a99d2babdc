use std::sync::Arc;
use std::time::Instant;

use image::DynamicImage;
use tracing::{debug, info};

use crate::{
    application::{
        detector_handle::DetectorHandle,
        dto::{
            DebugDetectRequest, DebugDetectionResponse, DetectRequest, DetectionDto,
            DetectionResponse, HealthResponse,
        },
        image_codec::{decode_data_uri, encode_png_data_uri},
        ports::AnnotatorPort,
    },
    domain::{
        detection::{find_target, summarize_detections, Detection},
        errors::{DomainError, DomainResult},
    },
};

/// Casos de uso detrás de la API HTTP: decodificar, detectar y dar forma a la respuesta.
#[derive(Clone)]
pub struct DetectionService {
    detector: Arc<DetectorHandle>,
    annotator: Arc<dyn AnnotatorPort>,
}

impl DetectionService {
    pub fn new(detector: Arc<DetectorHandle>, annotator: Arc<dyn AnnotatorPort>) -> Self {
        Self { detector, annotator }
    }

    pub async fn detect(&self, req: DetectRequest) -> DomainResult<DetectionResponse> {
        let (uri, target) = req.into_parts()?;
        let image = decode_off_runtime(uri).await?;
        let (_, detections) = self.run_detector(image).await?;

        let (target_found, target_confidence) = match target.as_deref() {
            Some(target) => {
                let m = find_target(&detections, target);
                debug!("Target '{}': found={} confidence={:.3}", target, m.found, m.confidence);
                (Some(m.found), Some(m.confidence))
            }
            None => (None, None),
        };

        Ok(DetectionResponse {
            success: true,
            detections: detections.iter().map(DetectionDto::from).collect(),
            target_found,
            target_confidence,
        })
    }

    pub async fn detect_debug(&self, req: DebugDetectRequest) -> DomainResult<DebugDetectionResponse> {
        let image = decode_off_runtime(req.into_image()?).await?;
        let (image, detections) = self.run_detector(image).await?;

        let annotator = self.annotator.clone();
        let dtos: Vec<DetectionDto> = detections.iter().map(DetectionDto::from).collect();
        let annotated_image = tokio::task::spawn_blocking(move || {
            let annotated = annotator.annotate(&image, &detections);
            encode_png_data_uri(&annotated)
        })
        .await
        .map_err(|e| DomainError::Detector(format!("annotation task failed: {}", e)))?
        .map_err(|e| DomainError::Detector(format!("PNG encoding failed: {}", e)))?;

        Ok(DebugDetectionResponse { success: true, detections: dtos, annotated_image })
    }

    pub fn health(&self) -> HealthResponse {
        HealthResponse { status: "ok".into(), model_loaded: self.detector.is_loaded() }
    }

    /// Ejecuta la inferencia fuera del runtime async y devuelve la imagen para reutilizarla.
    async fn run_detector(&self, image: DynamicImage) -> DomainResult<(DynamicImage, Vec<Detection>)> {
        let detector = self.detector.get().await?;
        let (w, h) = (image.width(), image.height());

        let t0 = Instant::now();
        let (image, detections) = tokio::task::spawn_blocking(move || {
            let detections = detector.detect(&image);
            (image, detections)
        })
        .await
        .map_err(|e| DomainError::Detector(format!("inference task failed: {}", e)))?;
        let detections = detections?;

        info!(
            "Detectados {} objetos en imagen {}x{} en {:.1} ms [{}]",
            detections.len(),
            w,
            h,
            t0.elapsed().as_secs_f32() * 1000.0,
            summarize_detections(&detections)
        );
        Ok((image, detections))
    }
}

/// Decodificación base64 + imagen (hasta 10 MiB) en un hilo bloqueante, antes de
/// pedir el detector: una entrada inválida nunca dispara la carga del modelo.
async fn decode_off_runtime(uri: String) -> DomainResult<DynamicImage> {
    tokio::task::spawn_blocking(move || decode_data_uri(&uri))
        .await
        .map_err(|e| DomainError::Detector(format!("decode task failed: {}", e)))?
        .map_err(DomainError::from)
}
