//! Session-wide collection of clip players.

use super::player::ClipPlayer;
use crate::scene::SceneGraph;

/// Every clip player of a session, advanced in registration order
#[derive(Debug, Default)]
pub struct ClipRegistry {
    players: Vec<ClipPlayer>,
}

impl ClipRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a player; returns its registration index
    pub fn register(&mut self, player: ClipPlayer) -> usize {
        self.players.push(player);
        self.players.len() - 1
    }

    /// Advance every player by `dt` seconds
    pub fn advance_all(&mut self, dt: f32, scene: &mut SceneGraph) {
        for player in &mut self.players {
            player.advance(dt, scene);
        }
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ClipPlayer> {
        self.players.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClipPlayer> {
        self.players.iter()
    }
}
