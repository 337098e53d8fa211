//! Audio cue outbox.
//!
//! The core never plays sound itself. It records which cues fired this tick and keeps a
//! short "still playing" window per cue so rules like "don't restart the jump sound while
//! it is still audible" can be evaluated without an audio backend.

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cue {
    /// Liftoff from ground or wall.
    Jump,
    /// Touched ground after being airborne.
    Land,
    Shoot,
    /// Projectile hit solid geometry.
    Impact,
    /// Fatal contact; the actor is being respawned.
    Death,
}

impl Cue {
    /// How long the cue counts as active after it fires.
    pub fn duration(self) -> Duration {
        match self {
            Cue::Jump => Duration::from_millis(350),
            Cue::Land => Duration::from_millis(150),
            Cue::Shoot => Duration::from_millis(250),
            Cue::Impact => Duration::from_millis(200),
            Cue::Death => Duration::from_millis(900),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct CueQueue {
    /// Fired but not yet drained by the host.
    pending: Vec<Cue>,
    /// Cues still audible, with their remaining time.
    active: Vec<(Cue, Duration)>,
}

impl CueQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn play(&mut self, cue: Cue) {
        self.pending.push(cue);
        self.active.push((cue, cue.duration()));
    }

    pub fn is_active(&self, cue: Cue) -> bool {
        self.active.iter().any(|(c, _)| *c == cue)
    }

    /// Age every active cue by `dt`, dropping the ones that finished.
    pub fn advance(&mut self, dt: Duration) {
        for (_, remaining) in self.active.iter_mut() {
            *remaining = remaining.saturating_sub(dt);
        }
        self.active.retain(|(_, remaining)| !remaining.is_zero());
    }

    pub fn pending(&self) -> &[Cue] {
        &self.pending
    }

    /// Hand every fired cue to the caller.
    pub fn drain(&mut self) -> Vec<Cue> {
        std::mem::take(&mut self.pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cue_stays_active_for_its_duration() {
        let mut cues = CueQueue::new();
        cues.play(Cue::Jump);
        assert!(cues.is_active(Cue::Jump));
        cues.advance(Duration::from_millis(100));
        assert!(cues.is_active(Cue::Jump));
        cues.advance(Cue::Jump.duration());
        assert!(!cues.is_active(Cue::Jump));
    }

    #[test]
    fn test_drain_empties_pending_but_not_active() {
        let mut cues = CueQueue::new();
        cues.play(Cue::Land);
        assert_eq!(cues.drain(), vec![Cue::Land]);
        assert!(cues.pending().is_empty());
        assert!(cues.is_active(Cue::Land));
    }
}
