//! In-memory collaborators for tests and the headless harness
//!
//! Provides a fake player handle, a scriptable session provider, a fake
//! frequency capture and an in-memory settings store.

mod player;
mod session;
mod settings;
mod visualizer;

pub use player::FakePlayer;
pub use session::FakeSession;
pub use settings::MemorySettings;
pub use visualizer::FakeVisualizerFactory;
