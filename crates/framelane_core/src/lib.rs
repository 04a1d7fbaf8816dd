pub mod config;
pub mod controller;
pub mod duration;
pub mod editor;
pub mod error;
pub mod guides;
pub mod history;
pub mod resolver;
pub mod snapping;
pub mod store;
pub mod surface;
pub mod template;
pub mod types;

pub use config::{CompositionSettings, DuplicatePlacement, EngineConfig, OverlapPolicy};
pub use controller::{InteractionController, PointerEvent, PointerPhase};
pub use editor::Editor;
pub use error::{CoreError, Result};
pub use store::OverlayStore;
pub use surface::{Preview, TimelineViewport};
pub use template::Template;
pub use types::*;
