//! Deterministic event-based simulation
//!
//! Balls move along closed-form trajectories between events, so the scheduler
//! never integrates: it predicts exact event times and jumps to them.
//! - Stable iteration order (by entity ID)
//! - Seeded RNG only (racks)
//! - No global state; configuration is passed in

pub mod ball;
pub mod cache;
pub mod continuize;
pub mod detect;
pub mod equations;
pub mod events;
pub mod motion;
pub mod rack;
pub mod resolve;
pub mod simulate;
pub mod system;
pub mod table;

pub use ball::{Ball, BallParams, BallState, MotionPhase};
pub use cache::EventCache;
pub use continuize::interpolate_ball_states;
pub use events::{Event, EventClass, EventKind};
pub use resolve::Resolver;
pub use simulate::{SimResult, Simulation, simulate};
pub use system::{Cue, HistoryEntry, System};
pub use table::{CircularCushion, CushionDirection, LinearCushion, Pocket, Table};
