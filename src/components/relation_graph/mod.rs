//! Force-directed canvas view of a relationship graph.

mod component;
mod floating;
mod forces;
mod frame_loop;
mod interaction;
mod render;
pub mod scale;
mod simulation;
mod state;

pub use component::RelationGraphCanvas;
pub use floating::{FloatParams, FloatingAnimator, displacement};
pub use interaction::{DragState, DragTarget, InteractionController};
pub use simulation::{LayoutNode, LayoutSimulator, TickOutcome};
pub use state::RelationGraphState;
