use std::fs;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Result};
use image::{imageops::FilterType, DynamicImage, Rgb, RgbImage};
use ndarray::{Array4, ArrayView2, Axis};
use ort::execution_providers::CUDAExecutionProvider;
use ort::session::Session;
use ort::value::Tensor;
use regex::Regex;
use tracing::{debug, info};

use crate::application::ports::{DetectorLoaderPort, DetectorPort};
use crate::domain::detection::{non_max_suppression, Detection};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::model::{ModelId, YoloParams, COCO_CLASSES};

/// Gris de relleno de Ultralytics para el letterbox.
const PAD_COLOR: Rgb<u8> = Rgb([114, 114, 114]);

/// Escala y relleno usados para encajar la imagen original en la entrada
/// cuadrada del modelo sin deformarla.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Letterbox {
    pub scale: f32,
    pub pad_x: u32,
    pub pad_y: u32,
    pub resized_w: u32,
    pub resized_h: u32,
}

impl Letterbox {
    pub(crate) fn new(img_w: u32, img_h: u32, size: u32) -> Self {
        let (w, h) = (img_w.max(1) as f32, img_h.max(1) as f32);
        let scale = (size as f32 / w).min(size as f32 / h);
        let resized_w = ((w * scale).round() as u32).clamp(1, size);
        let resized_h = ((h * scale).round() as u32).clamp(1, size);
        Self {
            scale,
            pad_x: (size - resized_w) / 2,
            pad_y: (size - resized_h) / 2,
            resized_w,
            resized_h,
        }
    }

    /// Punto en coordenadas de la entrada del modelo -> imagen original.
    fn unmap(&self, x: f32, y: f32) -> (f32, f32) {
        ((x - self.pad_x as f32) / self.scale, (y - self.pad_y as f32) / self.scale)
    }
}

pub struct OnnxYoloEngine {
    session: Mutex<Session>,
    classes: Vec<String>,
    params: YoloParams,
}

impl OnnxYoloEngine {
    pub fn load(path: &str, params: YoloParams, use_cuda: bool) -> Result<Self> {
        let mut builder = Session::builder()?.with_intra_threads(4)?;

        // CUDA es opcional: se registra si está disponible, si no CPU.
        if use_cuda {
            let cuda = CUDAExecutionProvider::default().build();
            if let Ok(builder_with_cuda) = builder.clone().with_execution_providers([cuda]) {
                builder = builder_with_cuda;
            }
        }

        let model_bytes = fs::read(path).with_context(|| format!("failed to read model {}", path))?;
        let session = builder
            .commit_from_memory(&model_bytes)
            .context("failed to build ONNX session")?;

        let classes = session
            .metadata()
            .ok()
            .and_then(|m| m.custom("names").ok().flatten())
            .map(|names| parse_class_names(&names))
            .filter(|names| !names.is_empty())
            .unwrap_or_else(|| COCO_CLASSES.iter().map(|s| s.to_string()).collect());
        info!("Modelo {} cargado con {} clases", path, classes.len());

        Ok(Self { session: Mutex::new(session), classes, params })
    }

    pub fn infer(&self, rgb: &RgbImage) -> Result<Vec<Detection>> {
        let imgsz = self.params.input_size as usize;
        let lb = Letterbox::new(rgb.width(), rgb.height(), imgsz as u32);

        // Redimensionar manteniendo el aspecto y centrar sobre fondo gris
        let resized = image::imageops::resize(rgb, lb.resized_w, lb.resized_h, FilterType::Triangle);
        let mut canvas = RgbImage::from_pixel(imgsz as u32, imgsz as u32, PAD_COLOR);
        image::imageops::overlay(&mut canvas, &resized, lb.pad_x as i64, lb.pad_y as i64);

        let mut input = Array4::<f32>::zeros((1, 3, imgsz, imgsz));
        for (x, y, pixel) in canvas.enumerate_pixels() {
            input[[0, 0, y as usize, x as usize]] = pixel[0] as f32 / 255.0;
            input[[0, 1, y as usize, x as usize]] = pixel[1] as f32 / 255.0;
            input[[0, 2, y as usize, x as usize]] = pixel[2] as f32 / 255.0;
        }
        let input_tensor = Tensor::from_array(input)?;

        let mut session = self.session.lock().map_err(|_| anyhow!("inference session lock poisoned"))?;
        let outputs = session
            .run(ort::inputs![input_tensor])
            .context("YOLO inference failed")?;
        let output = outputs[0]
            .try_extract_array::<f32>()
            .context("failed to extract YOLO output tensor")?;

        let dims = output.shape().to_vec();
        debug!("Forma de salida YOLO {:?}", dims);
        if dims.len() != 3 || dims[1] < 5 {
            return Err(anyhow!("unexpected YOLO output shape {:?}", dims));
        }
        let view: ArrayView2<f32> = output.index_axis(Axis(0), 0).into_dimensionality()?;

        Ok(decode_predictions(
            view,
            &self.classes,
            &self.params,
            &lb,
            (rgb.width() as f32, rgb.height() as f32),
        ))
    }
}

/// Convierte una cabeza YOLOv8 `[4 + clases, candidatos]` en detecciones en
/// coordenadas de la imagen original (sin el relleno del letterbox), recortadas
/// a la imagen.
pub(crate) fn decode_predictions(
    view: ArrayView2<f32>,
    classes: &[String],
    params: &YoloParams,
    lb: &Letterbox,
    (img_w, img_h): (f32, f32),
) -> Vec<Detection> {
    let num_candidates = view.shape()[1];
    let mut detections = Vec::new();

    for i in 0..num_candidates {
        let column = view.column(i);
        let Some((class_id, max_score)) = column
            .iter()
            .skip(4)
            .copied()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
        else {
            continue;
        };

        if max_score > params.conf_threshold {
            let cx = column[0];
            let cy = column[1];
            let w = column[2];
            let h = column[3];
            let (x1, y1) = lb.unmap(cx - w / 2.0, cy - h / 2.0);
            let (x2, y2) = lb.unmap(cx + w / 2.0, cy + h / 2.0);

            detections.push(Detection {
                x1: x1.clamp(0.0, img_w),
                y1: y1.clamp(0.0, img_h),
                x2: x2.clamp(0.0, img_w),
                y2: y2.clamp(0.0, img_h),
                score: max_score.clamp(0.0, 1.0),
                class_id,
                label: classes
                    .get(class_id)
                    .cloned()
                    .unwrap_or_else(|| format!("class_{}", class_id)),
            });
        }
    }

    let mut kept = non_max_suppression(detections, params.iou_threshold);
    kept.truncate(params.max_detections);
    kept
}

/// Lee los nombres de clase que Ultralytics incrusta en los metadatos
/// del modelo exportado, p. ej. `{0: 'person', 1: 'bicycle'}`.
pub(crate) fn parse_class_names(raw: &str) -> Vec<String> {
    let Ok(re) = Regex::new(r#"(\d+)\s*:\s*['"]([^'"]*)['"]"#) else {
        return Vec::new();
    };
    let mut indexed: Vec<(usize, String)> = re
        .captures_iter(raw)
        .filter_map(|c| Some((c[1].parse().ok()?, c[2].to_string())))
        .collect();
    indexed.sort_by_key(|(i, _)| *i);
    indexed.into_iter().map(|(_, name)| name).collect()
}

impl DetectorPort for OnnxYoloEngine {
    fn detect(&self, image: &DynamicImage) -> DomainResult<Vec<Detection>> {
        self.infer(&image.to_rgb8())
            .map_err(|e| DomainError::Detector(e.to_string()))
    }
}

/// Construye [`OnnxYoloEngine`]s con parámetros de post-proceso fijos.
pub struct OnnxDetectorLoader {
    params: YoloParams,
    use_cuda: bool,
}

impl OnnxDetectorLoader {
    pub fn new(params: YoloParams, use_cuda: bool) -> Self {
        Self { params, use_cuda }
    }
}

impl DetectorLoaderPort for OnnxDetectorLoader {
    fn load(&self, model: &ModelId) -> DomainResult<Arc<dyn DetectorPort>> {
        let engine = OnnxYoloEngine::load(&model.onnx_path, self.params.clone(), self.use_cuda)
            .map_err(|e| DomainError::Detector(format!("failed to load model {}: {}", model.onnx_path, e)))?;
        Ok(Arc::new(engine))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn classes() -> Vec<String> {
        vec!["person".into(), "dog".into()]
    }

    /// One column per candidate: cx, cy, w, h, score(person), score(dog).
    fn head(candidates: &[[f32; 6]]) -> Array2<f32> {
        let mut a = Array2::<f32>::zeros((6, candidates.len()));
        for (i, c) in candidates.iter().enumerate() {
            for (r, v) in c.iter().enumerate() {
                a[[r, i]] = *v;
            }
        }
        a
    }

    #[test]
    fn decodes_rescales_and_filters_by_confidence() {
        let out = head(&[
            [32.0, 32.0, 16.0, 16.0, 0.10, 0.80],
            [10.0, 10.0, 4.0, 4.0, 0.20, 0.10],
        ]);
        let params = YoloParams { input_size: 64, ..Default::default() };
        // original image is twice the input size
        let lb = Letterbox::new(128, 128, 64);
        let dets = decode_predictions(out.view(), &classes(), &params, &lb, (128.0, 128.0));

        assert_eq!(dets.len(), 1);
        assert_eq!(dets[0].label, "dog");
        assert_eq!(dets[0].class_id, 1);
        assert_eq!(dets[0].bbox(), [48.0, 48.0, 80.0, 80.0]);
        assert!((dets[0].score - 0.8).abs() < 1e-6);
    }

    #[test]
    fn boxes_are_clamped_and_ordered() {
        let out = head(&[
            [2.0, 2.0, 10.0, 10.0, 0.9, 0.0],
            [60.0, 60.0, 10.0, 10.0, 0.95, 0.0],
        ]);
        let params = YoloParams { input_size: 64, ..Default::default() };
        let dets = decode_predictions(out.view(), &classes(), &params, &Letterbox::new(64, 64, 64), (64.0, 64.0));

        assert_eq!(dets.len(), 2);
        assert!(dets[0].score >= dets[1].score);
        for d in &dets {
            assert!(d.x1 <= d.x2 && d.y1 <= d.y2);
            assert!(d.x1 >= 0.0 && d.y1 >= 0.0 && d.x2 <= 64.0 && d.y2 <= 64.0);
        }
    }

    #[test]
    fn overlapping_candidates_collapse_and_respect_max() {
        let out = head(&[
            [20.0, 20.0, 10.0, 10.0, 0.9, 0.0],
            [21.0, 21.0, 10.0, 10.0, 0.8, 0.0],
            [50.0, 50.0, 6.0, 6.0, 0.7, 0.0],
            [10.0, 50.0, 6.0, 6.0, 0.0, 0.6],
        ]);
        let params = YoloParams { input_size: 64, max_detections: 2, ..Default::default() };
        let dets = decode_predictions(out.view(), &classes(), &params, &Letterbox::new(64, 64, 64), (64.0, 64.0));

        let scores: Vec<f32> = dets.iter().map(|d| d.score).collect();
        assert_eq!(scores, vec![0.9, 0.7]);
    }

    #[test]
    fn unknown_class_ids_get_a_placeholder_label() {
        let out = head(&[[5.0, 5.0, 2.0, 2.0, 0.0, 0.9]]);
        let params = YoloParams::default();
        let lb = Letterbox::new(10, 10, 10);
        let dets = decode_predictions(out.view(), &["person".to_string()], &params, &lb, (10.0, 10.0));
        assert_eq!(dets[0].label, "class_1");
    }

    #[test]
    fn letterbox_keeps_aspect_and_centres_padding() {
        let lb = Letterbox::new(128, 64, 64);
        assert_eq!(lb.scale, 0.5);
        assert_eq!((lb.resized_w, lb.resized_h), (64, 32));
        assert_eq!((lb.pad_x, lb.pad_y), (0, 16));

        let lb = Letterbox::new(30, 90, 60);
        assert_eq!((lb.resized_w, lb.resized_h), (20, 60));
        assert_eq!((lb.pad_x, lb.pad_y), (20, 0));
    }

    #[test]
    fn boxes_on_wide_images_are_unpadded() {
        // 128x64 image in a 64 input: half scale, 16 rows of padding on top
        let out = head(&[[32.0, 32.0, 16.0, 16.0, 0.9, 0.0]]);
        let params = YoloParams { input_size: 64, ..Default::default() };
        let lb = Letterbox::new(128, 64, 64);
        let dets = decode_predictions(out.view(), &classes(), &params, &lb, (128.0, 64.0));

        assert_eq!(dets.len(), 1);
        assert_eq!(dets[0].bbox(), [48.0, 16.0, 80.0, 48.0]);
    }

    #[test]
    fn parses_ultralytics_names_metadata() {
        let names = parse_class_names("{0: 'person', 2: \"car\", 1: 'bicycle'}");
        assert_eq!(names, vec!["person", "bicycle", "car"]);
        assert!(parse_class_names("garbage").is_empty());
    }
}
