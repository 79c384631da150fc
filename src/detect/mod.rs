mod backend;
mod backends;
mod registry;
mod result;

pub use backend::{DetectorBackend, DetectorConfig};
pub use backends::{ScriptedBackend, StubBackend};
pub use registry::BackendRegistry;
pub use result::Detection;

#[cfg(feature = "backend-cascade")]
pub use backends::CascadeBackend;
