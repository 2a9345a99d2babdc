use std::sync::Arc;

use tokio::sync::{Mutex, OnceCell};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::application::ports::{DetectorLoaderPort, DetectorPort, ModelCatalogPort};
use crate::domain::{
    errors::{DomainError, DomainResult},
    model::ModelId,
};

type LoadTask = JoinHandle<DomainResult<Arc<dyn DetectorPort>>>;

/// Process-wide detector, loaded on first use and kept for the life of the process.
///
/// Concurrent first callers wait on the same load; a failed load leaves the
/// handle empty so the next caller tries again.
pub struct DetectorHandle {
    model: ModelId,
    loader: Arc<dyn DetectorLoaderPort>,
    catalog: Arc<dyn ModelCatalogPort>,
    cell: OnceCell<Arc<dyn DetectorPort>>,
    // La carga en curso vive aquí, no en el futuro del llamador: si este se
    // cancela, el siguiente retoma la misma tarea.
    in_flight: Mutex<Option<LoadTask>>,
}

impl DetectorHandle {
    pub fn new(
        model: ModelId,
        loader: Arc<dyn DetectorLoaderPort>,
        catalog: Arc<dyn ModelCatalogPort>,
    ) -> Self {
        Self { model, loader, catalog, cell: OnceCell::new(), in_flight: Mutex::new(None) }
    }

    pub async fn get(&self) -> DomainResult<Arc<dyn DetectorPort>> {
        let detector = self.cell.get_or_try_init(|| self.load()).await?;
        Ok(detector.clone())
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.initialized()
    }

    async fn load(&self) -> DomainResult<Arc<dyn DetectorPort>> {
        let mut in_flight = self.in_flight.lock().await;
        if in_flight.is_none() {
            self.catalog.validate_model(&self.model).await?;
        }
        let task = in_flight.get_or_insert_with(|| {
            info!("Cargando modelo '{}' desde {}", self.model.name, self.model.onnx_path);
            let loader = self.loader.clone();
            let model = self.model.clone();
            tokio::task::spawn_blocking(move || {
                let t0 = std::time::Instant::now();
                let detector = loader.load(&model)?;
                info!("Modelo listo en {:.0} ms", t0.elapsed().as_secs_f32() * 1000.0);
                Ok(detector)
            })
        });

        let joined = task.await;
        *in_flight = None;
        joined
            .map_err(|e| DomainError::Detector(format!("model load task failed: {}", e)))?
            .map_err(|e| {
                warn!("Fallo al cargar el modelo: {}", e);
                e
            })
    }
}
