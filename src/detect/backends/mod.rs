pub mod scripted;
pub mod stub;

#[cfg(feature = "backend-cascade")]
pub mod cascade;

pub use scripted::ScriptedBackend;
pub use stub::StubBackend;

#[cfg(feature = "backend-cascade")]
pub use cascade::CascadeBackend;
