use serde::{Deserialize, Serialize};

use crate::models::{Candidate, Rect};

/// Smoothing and persistence parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StabilizerConfig {
    /// Weight of the newest detection; smaller is smoother and slower
    pub alpha: f32,
    /// Consecutive misses after which a slot forgets its rectangle
    pub max_missed_frames: u32,
    /// Misses tolerated at full opacity
    pub fade_start: u32,
    /// Misses over which opacity drops linearly to zero after `fade_start`
    pub fade_span: u32,
}

impl Default for StabilizerConfig {
    fn default() -> Self {
        Self {
            alpha: 0.2,
            max_missed_frames: 60,
            fade_start: 15,
            fade_span: 30,
        }
    }
}

/// Smoothed state for one guide region
#[derive(Debug, Clone, Default)]
pub struct DetectionSlot {
    smoothed: Option<Rect>,
    latest: Option<Candidate>,
    missed_frames: u32,
    hit_streak: u32,
}

impl DetectionSlot {
    /// Feed one frame's detection (or its absence) into the slot
    pub fn update(&mut self, candidate: Option<&Candidate>, config: &StabilizerConfig) {
        match candidate {
            Some(candidate) => {
                self.smoothed = Some(match self.smoothed {
                    Some(previous) => previous.lerp(&candidate.rect, config.alpha),
                    None => candidate.rect,
                });
                self.latest = Some(candidate.clone());
                self.missed_frames = 0;
                self.hit_streak = self.hit_streak.saturating_add(1);
            }
            None => {
                self.missed_frames = self.missed_frames.saturating_add(1);
                self.hit_streak = 0;
                if self.missed_frames >= config.max_missed_frames {
                    self.smoothed = None;
                    self.latest = None;
                }
            }
        }
    }

    pub fn smoothed(&self) -> Option<Rect> {
        self.smoothed
    }

    /// Most recent raw detection, kept while the slot still holds a rectangle
    pub fn latest(&self) -> Option<&Candidate> {
        self.latest.as_ref()
    }

    pub fn missed_frames(&self) -> u32 {
        self.missed_frames
    }

    /// Consecutive frames with a fresh detection
    pub fn hit_streak(&self) -> u32 {
        self.hit_streak
    }

    /// Advisory overlay opacity in [0, 1]
    pub fn opacity(&self, config: &StabilizerConfig) -> f32 {
        if self.smoothed.is_none() {
            return 0.0;
        }
        if self.missed_frames <= config.fade_start {
            return 1.0;
        }
        if config.fade_span == 0 {
            return 0.0;
        }
        let faded = (self.missed_frames - config.fade_start) as f32 / config.fade_span as f32;
        (1.0 - faded).clamp(0.0, 1.0)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Snapshot of one slot for overlay rendering
#[derive(Debug, Clone, PartialEq)]
pub struct SlotView {
    pub index: usize,
    pub rect: Option<Rect>,
    pub opacity: f32,
    pub missed_frames: u32,
}

/// Turns noisy per-frame detections into stable, persistent rectangles
#[derive(Debug, Clone)]
pub struct TemporalStabilizer {
    config: StabilizerConfig,
    slots: Vec<DetectionSlot>,
}

impl TemporalStabilizer {
    pub fn new(config: StabilizerConfig, slot_count: usize) -> Self {
        Self {
            config,
            slots: vec![DetectionSlot::default(); slot_count],
        }
    }

    /// Update every slot with this frame's detections.
    ///
    /// `detections[i]` feeds slot `i`; slots beyond the end of `detections` count as misses.
    pub fn update(&mut self, detections: &[Option<Candidate>]) -> Vec<SlotView> {
        for (index, slot) in self.slots.iter_mut().enumerate() {
            let candidate = detections.get(index).and_then(Option::as_ref);
            slot.update(candidate, &self.config);
        }
        self.views()
    }

    pub fn views(&self) -> Vec<SlotView> {
        self.slots
            .iter()
            .enumerate()
            .map(|(index, slot)| SlotView {
                index,
                rect: slot.smoothed(),
                opacity: slot.opacity(&self.config),
                missed_frames: slot.missed_frames(),
            })
            .collect()
    }

    pub fn slots(&self) -> &[DetectionSlot] {
        &self.slots
    }

    pub fn config(&self) -> &StabilizerConfig {
        &self.config
    }

    /// True when every slot has held a fresh detection for at least `frames` frames in a row
    pub fn all_stable(&self, frames: u32) -> bool {
        !self.slots.is_empty()
            && self
                .slots
                .iter()
                .all(|s| s.smoothed().is_some() && s.hit_streak() >= frames)
    }

    pub fn reset(&mut self) {
        self.slots.iter_mut().for_each(DetectionSlot::reset);
    }
}
