#[cfg(feature = "serialize")]
use serde::{Serialize, Deserialize};

/// Type of rigid body, determining how it behaves in the simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub enum BodyType {
    /// Dynamic bodies are fully simulated (affected by forces, collisions, etc.)
    #[default]
    Dynamic,

    /// Kinematic bodies move with their velocity but ignore forces and collisions
    Kinematic,

    /// Static bodies don't move and aren't affected by forces or collisions
    Static,
}
