//! FIFO matchmaking.
//!
//! One queue per class; two waiting players pair up immediately, earliest
//! first. The queue knows nothing about transports or matches, it only
//! hands back pairs.

use crate::game::{MatchId, MatchState, PlayerId};
use crate::map::{GameMap, MAP_RADIUS};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use thiserror::Error;

/// Queue class. Both behave identically today; ranked exists so ratings
/// have somewhere to matter later.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueClass {
    Casual,
    Ranked,
}

impl Default for QueueClass {
    fn default() -> Self {
        QueueClass::Casual
    }
}

#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("player is already waiting in a queue")]
    AlreadyQueued,
}

/// Waiting players, in arrival order per class.
#[derive(Debug, Default)]
pub struct MatchmakingQueue {
    casual: VecDeque<PlayerId>,
    ranked: VecDeque<PlayerId>,
}

impl MatchmakingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn queue_mut(&mut self, class: QueueClass) -> &mut VecDeque<PlayerId> {
        match class {
            QueueClass::Casual => &mut self.casual,
            QueueClass::Ranked => &mut self.ranked,
        }
    }

    /// Add a player; if that makes two, pop the earliest pair. A player
    /// may wait in at most one queue at a time, whichever class.
    pub fn enqueue(
        &mut self,
        player: PlayerId,
        class: QueueClass,
    ) -> Result<Option<(PlayerId, PlayerId)>, QueueError> {
        if self.casual.contains(&player) || self.ranked.contains(&player) {
            return Err(QueueError::AlreadyQueued);
        }
        let queue = self.queue_mut(class);
        queue.push_back(player);
        if queue.len() >= 2 {
            let first = queue.pop_front();
            let second = queue.pop_front();
            if let (Some(first), Some(second)) = (first, second) {
                return Ok(Some((first, second)));
            }
        }
        Ok(None)
    }

    /// Remove a waiting player. Returns false if they were not queued.
    pub fn cancel(&mut self, player: &PlayerId) -> bool {
        for queue in [&mut self.casual, &mut self.ranked] {
            if let Some(index) = queue.iter().position(|p| p == player) {
                queue.remove(index);
                return true;
            }
        }
        false
    }

    pub fn waiting(&self) -> usize {
        self.casual.len() + self.ranked.len()
    }
}

/// Build a fresh match for a paired couple: a generated mirrored map and
/// standard armies, first-arrived player seated first.
pub fn create_match(id: MatchId, first: PlayerId, second: PlayerId, seed: u64) -> MatchState {
    let map = GameMap::generate(MAP_RADIUS, seed);
    MatchState::new(id, map, first, second)
}
