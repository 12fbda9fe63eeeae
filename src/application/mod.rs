// Application layer - Use cases and ports
pub mod fetch_coordinator;
pub mod series_builder;
pub mod surface_service;
pub mod surface_sink;
pub mod telemetry_repository;
