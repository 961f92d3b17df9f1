// Revolution counting and windowed speed estimation
// The Hall-edge interrupt only increments an atomic edge count; the control
// tick drains it once per averaging window and converts it to RPM.

use core::sync::atomic::{AtomicU32, Ordering};

use crate::config::{ControlConfig, EDGES_PER_REVOLUTION};

/// Edge counter shared between the Hall-edge interrupt and the control tick
///
/// Six edges make one electrical revolution.
pub struct RevolutionCounter {
    edges: AtomicU32,
}

impl RevolutionCounter {
    pub const fn new() -> Self {
        Self {
            edges: AtomicU32::new(0),
        }
    }

    /// Record one Hall edge (interrupt context)
    #[inline(always)]
    pub fn on_position_edge(&self) {
        self.edges.fetch_add(1, Ordering::Relaxed);
    }

    /// Read and clear the accumulated edge count in one step
    pub fn take(&self) -> u32 {
        self.edges.swap(0, Ordering::Relaxed)
    }

    /// Edges accumulated since the last `take`
    pub fn pending(&self) -> u32 {
        self.edges.load(Ordering::Relaxed)
    }

    pub fn clear(&self) {
        self.edges.store(0, Ordering::Relaxed);
    }
}

impl Default for RevolutionCounter {
    fn default() -> Self {
        Self::new()
    }
}

/// Windowed RPM estimator
pub struct RevolutionEstimator<'a> {
    counter: &'a RevolutionCounter,
    ticks_since_window_start: u32,
    window_ticks: u32,
    ticks_per_minute: f32,
    last_rpm: f32,
    /// Revolutions counted in the last completed window
    last_revolutions: f32,
}

impl<'a> RevolutionEstimator<'a> {
    pub fn new(counter: &'a RevolutionCounter, config: &ControlConfig) -> Self {
        Self {
            counter,
            ticks_since_window_start: 0,
            window_ticks: config.window_ticks,
            ticks_per_minute: config.ticks_per_minute(),
            last_rpm: 0.0,
            last_revolutions: 0.0,
        }
    }

    /// Advance one control tick
    ///
    /// # Returns
    /// The new RPM when a window completes, otherwise `None`
    pub fn on_tick(&mut self) -> Option<f32> {
        self.ticks_since_window_start += 1;
        if self.ticks_since_window_start < self.window_ticks {
            return None;
        }

        let revolutions = self.counter.take() as f32 / EDGES_PER_REVOLUTION as f32;
        self.last_rpm =
            revolutions * (self.ticks_per_minute / self.ticks_since_window_start as f32);
        self.last_revolutions = revolutions;
        self.ticks_since_window_start = 0;

        trace!("window: {} rev -> {} rpm", revolutions, self.last_rpm);
        Some(self.last_rpm)
    }

    /// Speed from the last completed window [RPM]
    pub fn current_speed(&self) -> f32 {
        self.last_rpm
    }

    /// Revolutions counted in the last completed window
    pub fn revolutions(&self) -> f32 {
        self.last_revolutions
    }

    /// Ticks elapsed in the current window
    pub fn ticks_in_window(&self) -> u32 {
        self.ticks_since_window_start
    }

    /// Drop the accumulated edges and the last estimate
    pub fn reset(&mut self) {
        self.counter.clear();
        self.ticks_since_window_start = 0;
        self.last_rpm = 0.0;
        self.last_revolutions = 0.0;
    }
}
