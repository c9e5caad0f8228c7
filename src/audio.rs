//! Sound cue counters and the smoothed music mix.

use crate::game::GameEvent;

/// Cue triggers collected during one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AudioCues {
    pub turn: u32,
    pub fall: u32,
    pub row: u32,
    pub melt: u32,
    pub explode: u32,
}

impl AudioCues {
    pub fn from_events(events: &[GameEvent]) -> Self {
        let mut cues = Self::default();
        for event in events {
            match event {
                GameEvent::Turn => cues.turn += 1,
                GameEvent::Fall => cues.fall += 1,
                GameEvent::Row => cues.row += 1,
                GameEvent::Melt => cues.melt += 1,
                GameEvent::Explode => cues.explode += 1,
                GameEvent::GameOver { .. } => {}
            }
        }
        cues
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Round state the mix follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MixTarget {
    pub want_volume: bool,
    pub running: bool,
    pub over: bool,
    pub pink: bool,
}

/// Continuous levels, each easing toward its target every tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AudioMix {
    pub volume: f32,
    pub music: f32,
    pub melody: f32,
    /// 0 plays the pink melody, 1 the blue one.
    pub mix: f32,
}

fn ease(level: &mut f32, rate: f32, target: f32) {
    *level += rate * (target - *level);
}

impl AudioMix {
    pub fn step(&mut self, target: MixTarget) {
        ease(&mut self.volume, 0.05, if target.want_volume { 0.5 } else { 0.0 });
        if target.running {
            ease(&mut self.music, 0.05, 1.0);
            ease(&mut self.melody, 0.01, 1.0);
        } else {
            ease(&mut self.music, 0.008, if target.over { 0.0 } else { 0.5 });
            ease(&mut self.melody, 0.04, 0.0);
        }
        ease(&mut self.mix, 0.08, if target.pink { 0.0 } else { 1.0 });
    }

    pub fn silence(&mut self) {
        self.volume = 0.0;
    }

    /// Effective melody gains (pink, blue).
    pub fn melody_gains(&self) -> (f32, f32) {
        (self.melody * (1.0 - self.mix), self.melody * self.mix)
    }
}
