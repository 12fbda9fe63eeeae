// Domain layer - Pure business logic and entities
pub mod axis;
pub mod electric;
pub mod selection;
pub mod surface;
pub mod telemetry;
pub mod window;
