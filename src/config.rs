use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

use crate::domain::model::{InferenceConfig, ModelId, YoloParams};

pub const DEFAULT_CORS_ORIGINS: &str =
    "http://localhost:3000,http://localhost:5173,https://*.vercel.app";

/// Object detection HTTP service.
#[derive(Debug, Clone, Parser)]
#[command(name = "yolo-detect-api", version, about)]
pub struct ServiceConfig {
    /// Address to bind
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 5000)]
    pub port: u16,

    /// Path to the YOLO ONNX model, loaded on the first detection request
    #[arg(long, env = "MODEL_PATH", default_value = "yolov8n.onnx")]
    pub model_path: String,

    /// Logical model name, used in logs
    #[arg(long, env = "MODEL_NAME", default_value = "yolov8n")]
    pub model_name: String,

    /// Square input size the model expects
    #[arg(long, env = "YOLO_INPUT_SIZE", default_value_t = 640)]
    pub input_size: u32,

    /// Minimum class confidence to report a detection
    #[arg(long, env = "YOLO_CONF", default_value_t = 0.25)]
    pub conf_threshold: f32,

    /// IoU above which overlapping boxes of one class are merged
    #[arg(long, env = "YOLO_IOU", default_value_t = 0.45)]
    pub iou_threshold: f32,

    /// Maximum detections per image
    #[arg(long, env = "YOLO_MAX_DET", default_value_t = 300)]
    pub max_detections: usize,

    /// Try the CUDA execution provider before falling back to CPU
    #[arg(long, env = "YOLO_CUDA", default_value_t = false)]
    pub cuda: bool,

    /// Comma-separated allowed CORS origins; `*` matches one subdomain label
    #[arg(long, env = "CORS_ORIGINS", default_value = DEFAULT_CORS_ORIGINS, value_delimiter = ',')]
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes
    #[arg(long, env = "MAX_BODY_BYTES", default_value_t = 16 * 1024 * 1024)]
    pub max_body_bytes: usize,

    /// TTF font for annotation labels; a system font is looked up otherwise
    #[arg(long, env = "FONT_PATH")]
    pub font_path: Option<PathBuf>,

    /// Outline width in pixels of the boxes drawn by /detect-debug
    #[arg(long, env = "BOX_THICKNESS", default_value_t = 2)]
    pub box_thickness: u32,
}

impl ServiceConfig {
    pub fn bind_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }

    pub fn inference(&self) -> anyhow::Result<InferenceConfig> {
        for (name, v) in [("conf", self.conf_threshold), ("iou", self.iou_threshold)] {
            if !(0.0..=1.0).contains(&v) {
                anyhow::bail!("{} threshold must be within [0, 1], got {}", name, v);
            }
        }
        if self.input_size == 0 {
            anyhow::bail!("input size must be positive");
        }
        Ok(InferenceConfig {
            model: ModelId { name: self.model_name.clone(), onnx_path: self.model_path.clone() },
            params: YoloParams {
                input_size: self.input_size,
                conf_threshold: self.conf_threshold,
                iou_threshold: self.iou_threshold,
                max_detections: self.max_detections,
            },
            use_cuda: self.cuda,
        })
    }
}
