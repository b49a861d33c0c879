//! Three-slot ring buffer of time-tagged velocity frames.
//!
//! The slots are allocated once and overwritten in place as the tracer
//! walks through the series. `head` is the oldest slot in traversal
//! direction and is the next one to be evicted. Tags from `head` onward
//! are consecutive samples, increasing for forward and decreasing for
//! backward tracing.

use glam::DVec3;
use log::debug;

use super::{Aabb, ComputeError, FrameSource, Grid, GridError, GridShape, VelocityField};
use super::sample_vector;

/// Slack used when checking whether a time lies inside a bracket.
const BRACKET_TOLERANCE: f64 = 1e-9;

pub struct TemporalWindow {
    slots: [Grid; 3],
    times: [f64; 3],
    head: usize,
    bounds: Aabb,
    /// Single-sample series: every time maps to the head slot.
    steady: bool,
}

impl TemporalWindow {
    /// Allocate three zeroed slots of `shape`. Tags start out as infinity.
    pub fn new(shape: &GridShape) -> Result<Self, GridError> {
        Ok(Self {
            slots: [Grid::zeroed(shape)?, Grid::zeroed(shape)?, Grid::zeroed(shape)?],
            times: [f64::INFINITY; 3],
            head: 0,
            bounds: shape.bounds,
            steady: false,
        })
    }

    #[inline]
    pub fn head(&self) -> usize {
        self.head
    }

    /// Raw slot tags, indexed by slot.
    #[inline]
    pub fn times(&self) -> [f64; 3] {
        self.times
    }

    /// Tag of the slot `offset` positions after the head.
    #[inline]
    pub fn time_at(&self, offset: usize) -> f64 {
        self.times[(self.head + offset) % 3]
    }

    #[inline]
    pub fn slot(&self, index: usize) -> &Grid {
        &self.slots[index]
    }

    #[inline]
    pub fn bounds(&self) -> &Aabb {
        &self.bounds
    }

    #[inline]
    pub fn is_steady(&self) -> bool {
        self.steady
    }

    /// Fill all three slots with the samples at `times` and reset the head.
    pub fn load_initial<S: FrameSource + ?Sized>(
        &mut self,
        source: &S,
        times: [f64; 3],
    ) -> Result<(), ComputeError> {
        self.steady = false;
        for (slot, &time) in times.iter().enumerate() {
            self.load_slot(source, slot, time)?;
        }
        self.head = 0;
        Ok(())
    }

    /// Load the only sample of a steady series into the head slot.
    pub fn load_steady<S: FrameSource + ?Sized>(
        &mut self,
        source: &S,
        time: f64,
    ) -> Result<(), ComputeError> {
        self.head = 0;
        self.load_slot(source, 0, time)?;
        self.times = [time; 3];
        self.steady = true;
        Ok(())
    }

    /// Evict the head slot, refill it with the sample at `time` and advance the head.
    pub fn rotate<S: FrameSource + ?Sized>(
        &mut self,
        source: &S,
        time: f64,
    ) -> Result<(), ComputeError> {
        let evicted = self.head;
        self.load_slot(source, evicted, time)?;
        self.head = (self.head + 1) % 3;
        debug!(
            "Window rotated: slot {} now t={:.4}, head={}",
            evicted, time, self.head
        );
        Ok(())
    }

    fn load_slot<S: FrameSource + ?Sized>(
        &mut self,
        source: &S,
        slot: usize,
        time: f64,
    ) -> Result<(), ComputeError> {
        // Invalidate the tag first so a failed load never leaves a stale pairing.
        self.times[slot] = f64::INFINITY;
        source.load(time, &mut self.slots[slot])?;
        self.times[slot] = time;
        debug!("Loaded frame t={:.4} into slot {}", time, slot);
        Ok(())
    }

    fn straddles(&self, a: usize, b: usize, time: f64) -> bool {
        let (lo, hi) = (self.times[a].min(self.times[b]), self.times[a].max(self.times[b]));
        let slack = BRACKET_TOLERANCE * (hi - lo).abs().max(1.0);
        lo - slack <= time && time <= hi + slack
    }

    /// Slot pair whose tags enclose `time`, ordered in traversal direction.
    fn bracket(&self, time: f64) -> (usize, usize) {
        let a = self.head;
        let b = (self.head + 1) % 3;
        let c = (self.head + 2) % 3;
        if self.straddles(a, b, time) {
            (a, b)
        } else {
            debug_assert!(
                self.straddles(b, c, time),
                "t={} outside window {:?} (head {})",
                time,
                self.times,
                self.head
            );
            (b, c)
        }
    }
}

impl VelocityField for TemporalWindow {
    fn velocity(&self, position: DVec3, time: f64) -> Option<DVec3> {
        if !self.bounds.contains(position) {
            return None;
        }
        if self.steady {
            return Some(sample_vector(&self.slots[self.head], position));
        }

        let (i0, i1) = self.bracket(time);
        let v0 = sample_vector(&self.slots[i0], position);
        let v1 = sample_vector(&self.slots[i1], position);
        let span = self.times[i1] - self.times[i0];
        let interp = if span != 0.0 {
            (time - self.times[i0]) / span
        } else {
            0.0
        };
        Some(v0 + (v1 - v0) * interp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::AnalyticSeries;

    /// Velocity (t, 0, 0) on the unit cube.
    fn series() -> AnalyticSeries<impl Fn(DVec3, f64) -> DVec3 + Sync> {
        AnalyticSeries::new(
            Aabb::new(DVec3::ZERO, DVec3::ONE),
            [3, 3, 3],
            |_, t| DVec3::new(t, 0.0, 0.0),
        )
    }

    #[test]
    fn test_new_window_is_empty() {
        let source = series();
        let window = TemporalWindow::new(&source.shape()).unwrap();
        assert!(window.times().iter().all(|t| t.is_infinite()));
        assert_eq!(window.head(), 0);
    }

    #[test]
    fn test_rotation_reuses_slots() {
        let source = series();
        let mut window = TemporalWindow::new(&source.shape()).unwrap();
        window.load_initial(&source, [0.0, 0.1, 0.2]).unwrap();
        let ptrs: Vec<_> = (0..3).map(|i| window.slot(i).data().as_ptr()).collect();

        window.rotate(&source, 0.3).unwrap();
        assert_eq!(window.head(), 1);
        assert_eq!(window.times(), [0.3, 0.1, 0.2]);
        assert_eq!(window.time_at(0), 0.1);
        assert_eq!(window.time_at(2), 0.3);

        window.rotate(&source, 0.4).unwrap();
        assert_eq!(window.head(), 2);
        assert_eq!(window.times(), [0.3, 0.4, 0.2]);

        let after: Vec<_> = (0..3).map(|i| window.slot(i).data().as_ptr()).collect();
        assert_eq!(ptrs, after);
    }

    #[test]
    fn test_temporal_interpolation() {
        let source = series();
        let mut window = TemporalWindow::new(&source.shape()).unwrap();
        window.load_initial(&source, [1.0, 2.0, 3.0]).unwrap();
        let p = DVec3::splat(0.5);

        let v = window.velocity(p, 1.25).unwrap();
        assert!((v.x - 1.25).abs() < 1e-6);
        // Second bracket (head+1, head+2).
        let v = window.velocity(p, 2.75).unwrap();
        assert!((v.x - 2.75).abs() < 1e-6);
        // Exactly on the shared tag.
        let v = window.velocity(p, 2.0).unwrap();
        assert!((v.x - 2.0).abs() < 1e-6);

        assert_eq!(window.velocity(DVec3::new(1.5, 0.5, 0.5), 1.5), None);
    }

    #[test]
    fn test_backward_window() {
        let source = series();
        let mut window = TemporalWindow::new(&source.shape()).unwrap();
        window.load_initial(&source, [3.0, 2.0, 1.0]).unwrap();
        let v = window.velocity(DVec3::splat(0.5), 2.5).unwrap();
        assert!((v.x - 2.5).abs() < 1e-6);
        let v = window.velocity(DVec3::splat(0.5), 1.5).unwrap();
        assert!((v.x - 1.5).abs() < 1e-6);
    }

    #[test]
    fn test_steady_window_ignores_time() {
        let source = series();
        let mut window = TemporalWindow::new(&source.shape()).unwrap();
        window.load_steady(&source, 0.5).unwrap();
        assert!(window.is_steady());
        for t in [-10.0, 0.5, 99.0] {
            let v = window.velocity(DVec3::splat(0.5), t).unwrap();
            assert!((v.x - 0.5).abs() < 1e-6);
        }
    }
}
