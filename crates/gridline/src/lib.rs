pub mod api;
pub mod geometry;
pub mod path;
pub mod ribbon;
pub mod motion;
pub mod components;
pub mod core;
pub mod systems;
pub mod bridge;
pub mod input;
pub mod assets;

// Re-export key types at crate root for convenience
pub use api::board::{Board, BoardConfig};
pub use api::listener::{EventQueue, LineListener, ListenerHandle};
pub use api::types::{ColliderId, GridCoord, LayerMask, LineEvent, LineId};
pub use assets::config::LineConfig;
pub use assets::level::{GridDesc, LevelDesc, LineDesc};
pub use bridge::protocol::ProtocolLayout;
pub use components::line::{HeadPose, LinePiece, TapOutcome};
pub use core::arena::LineArena;
pub use core::time::FixedTimestep;
pub use geometry::aabb::Aabb;
pub use input::queue::{InputEvent, InputQueue};
pub use motion::controller::{MotionController, MotionEnv, MotionParams, MotionState};
pub use motion::probe::{BlockProbe, Hit, ObstructionQuery, ObstructionWorld};
pub use path::arc_length::ArcLengthTable;
pub use path::bake::{BakedPath, PathBaker};
pub use path::corners::CornerIndex;
pub use path::grid::{CellMapper, GridLayout};
pub use ribbon::hull::{CollisionHull, CollisionHullBuilder};
pub use ribbon::mesh::{CapParams, FadeParams, RibbonMesh, RibbonMeshBuilder, RibbonVertex};
pub use ribbon::wave::{WaveDisplacement, WaveParams};

#[cfg(feature = "physics")]
pub use core::physics::RapierObstructions;

#[cfg(feature = "vectors")]
pub use systems::overlay::{OverlayColor, OverlayState, OverlayVertex};
