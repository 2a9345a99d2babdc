use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use yolo_detect_api::{
    adapters::{
        http::{cors::OriginPolicy, router, state::HttpState},
        onnx::{model_catalog::OnnxModelCatalog, yolo_engine::OnnxDetectorLoader},
        render::annotator::BoxAnnotator,
    },
    application::{detector_handle::DetectorHandle, services::DetectionService},
    config::ServiceConfig,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Entorno y logs (RUST_LOG=info por defecto)
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg = ServiceConfig::parse();
    let infer = cfg.inference()?;

    // 2. Adaptadores de infraestructura
    let loader = Arc::new(OnnxDetectorLoader::new(infer.params.clone(), infer.use_cuda));
    let catalog = Arc::new(OnnxModelCatalog::new());
    let annotator = match &cfg.font_path {
        Some(path) => BoxAnnotator::with_font_path(path)?,
        None => BoxAnnotator::with_system_font(),
    }
    .with_thickness(cfg.box_thickness);

    // 3. Casos de uso. El modelo no se carga aquí sino en la primera petición de detección.
    let detector = Arc::new(DetectorHandle::new(infer.model.clone(), loader, catalog));
    let detection = Arc::new(DetectionService::new(detector, Arc::new(annotator)));

    // 4. Superficie HTTP
    let origins = OriginPolicy::new(cfg.cors_origins.iter().cloned());
    let app = router(HttpState { detection }, &origins, cfg.max_body_bytes);

    // 5. Servir
    let addr = cfg.bind_addr()?;
    tracing::info!("Servidor de detección escuchando en http://{}", addr);
    tracing::info!("El modelo {} ({}) se cargará en el primer uso", infer.model.name, infer.model.onnx_path);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
