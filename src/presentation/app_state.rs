// Application state for HTTP handlers
use crate::application::surface_service::SurfaceService;

#[derive(Clone)]
pub struct AppState {
    pub surface_service: SurfaceService,
}
