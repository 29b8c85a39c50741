//! Keyframe animation clips and the players that drive them.
//!
//! Clips are loaded alongside a scene fragment and target its nodes by
//! fragment-local index; a [`ClipPlayer`] binds those indices to scene nodes
//! once the fragment is inserted. The [`ClipRegistry`] owns every player of
//! a session and only ever grows.

mod clip;
mod player;
mod registry;

pub use clip::{AnimationClip, Channel, ChannelValues, ClipError, Interpolation, SampledValue};
pub use player::{ClipPlayer, PlaybackState};
pub use registry::ClipRegistry;
