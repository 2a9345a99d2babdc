use std::sync::Arc;
use crate::application::services::DetectionService;

/// Estado compartido para los manejadores HTTP de Axum: solo los servicios de casos de uso.
#[derive(Clone)]
pub struct HttpState {
    pub detection: Arc<DetectionService>,
}
