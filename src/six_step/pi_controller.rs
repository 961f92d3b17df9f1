// PI (Proportional-Integral) speed controller producing duty-cycle increments

use crate::config::ControlConfig;

/// Incremental PI controller with integral clamping and duty saturation
///
/// The controller output is a per-update change of the duty cycle, so the
/// duty never steps abruptly even under a large speed error.
pub struct PiController {
    /// Proportional gain
    kp: f32,
    /// Integral gain
    ki: f32,
    /// Integral accumulator (sum of speed errors)
    error_sum: f32,
    /// Symmetric integral limit
    max_error_sum: f32,
    /// Minimum duty change per update
    increment_min: f32,
    /// Maximum duty change per update
    increment_max: f32,
    /// Current duty cycle
    duty: f32,
    /// Duty cycle upper limit
    max_duty: f32,
    /// Duty cycle applied on start
    starting_duty: f32,
}

impl PiController {
    /// Create a new PI controller from the control configuration
    ///
    /// The controller starts stopped (duty 0).
    pub fn new(config: &ControlConfig) -> Self {
        Self {
            kp: config.speed_kp,
            ki: config.speed_ki,
            error_sum: 0.0,
            max_error_sum: config.max_error_sum,
            increment_min: config.min_increment,
            increment_max: config.max_increment,
            duty: 0.0,
            max_duty: config.max_duty,
            starting_duty: config.starting_duty,
        }
    }

    /// Update the duty cycle from the speed error
    ///
    /// # Arguments
    /// * `desired_rpm` - Target speed
    /// * `measured_rpm` - Measured speed
    ///
    /// # Returns
    /// New duty cycle (limited to 0..max_duty)
    pub fn update(&mut self, desired_rpm: f32, measured_rpm: f32) -> f32 {
        let error = desired_rpm - measured_rpm;
        if error.is_nan() {
            return self.duty;
        }

        // Integral term with clamping (anti-windup)
        self.error_sum = (self.error_sum + error).clamp(-self.max_error_sum, self.max_error_sum);

        // Bound the per-update change
        let increment = (self.kp * error + self.ki * self.error_sum)
            .clamp(self.increment_min, self.increment_max);

        self.duty = (self.duty + increment).clamp(0.0, self.max_duty);
        self.duty
    }

    /// Prepare for a start: clear the integral and apply the starting duty
    pub fn reset(&mut self) {
        self.error_sum = 0.0;
        self.duty = self.starting_duty;
    }

    /// Clear the integral and the duty cycle
    pub fn stop(&mut self) {
        self.error_sum = 0.0;
        self.duty = 0.0;
    }

    /// Set the proportional and integral gains
    ///
    /// # Arguments
    /// * `kp` - Proportional gain
    /// * `ki` - Integral gain
    pub fn set_gains(&mut self, kp: f32, ki: f32) {
        self.kp = kp;
        self.ki = ki;
    }

    /// Get the current duty cycle
    pub fn get_duty(&self) -> f32 {
        self.duty
    }

    /// Get the current integral accumulator
    pub fn get_error_sum(&self) -> f32 {
        self.error_sum
    }

    /// Get the proportional gain
    pub fn get_kp(&self) -> f32 {
        self.kp
    }

    /// Get the integral gain
    pub fn get_ki(&self) -> f32 {
        self.ki
    }

    /// Check if the duty cycle is at one of its limits
    pub fn is_saturated(&self) -> bool {
        self.duty <= 0.0 || self.duty >= self.max_duty
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(kp: f32, ki: f32) -> ControlConfig {
        ControlConfig {
            speed_kp: kp,
            speed_ki: ki,
            max_error_sum: 100.0,
            min_increment: -0.01,
            max_increment: 0.01,
            max_duty: 0.9,
            starting_duty: 0.25,
            ..ControlConfig::default()
        }
    }

    #[test]
    fn test_reset_applies_starting_duty() {
        let mut pi = PiController::new(&config(0.0, 0.0));
        assert_eq!(pi.get_duty(), 0.0);
        pi.reset();
        assert_eq!(pi.get_duty(), 0.25);
        assert_eq!(pi.get_error_sum(), 0.0);
    }

    #[test]
    fn test_proportional_increment() {
        let mut pi = PiController::new(&config(1.0e-4, 0.0));
        pi.reset();
        // error = 50, increment = 0.005
        let duty = pi.update(100.0, 50.0);
        assert!((duty - 0.255).abs() < 1.0e-6);
    }

    #[test]
    fn test_increment_limiting() {
        let mut pi = PiController::new(&config(1.0, 0.0));
        pi.reset();
        let duty = pi.update(1000.0, 0.0);
        assert!((duty - 0.26).abs() < 1.0e-6); // Limited to max increment

        let duty = pi.update(0.0, 1000.0);
        assert!((duty - 0.25).abs() < 1.0e-6); // Limited to min increment
    }

    #[test]
    fn test_error_sum_clamping() {
        let mut pi = PiController::new(&config(0.0, 1.0e-6));
        pi.reset();
        for _ in 0..10 {
            pi.update(60.0, 0.0);
        }
        assert_eq!(pi.get_error_sum(), 100.0);

        for _ in 0..10 {
            pi.update(0.0, 60.0);
        }
        assert_eq!(pi.get_error_sum(), -100.0);
    }

    #[test]
    fn test_duty_stays_in_range_for_any_error_sequence() {
        let mut pi = PiController::new(&config(1.0, 1.0));
        pi.reset();

        // 擬似乱数列で大きな誤差を与え続ける
        let mut seed: u32 = 12345;
        for _ in 0..5000 {
            seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12345);
            let measured = (seed >> 8) as f32 % 20_000.0 - 10_000.0;
            let duty = pi.update(1000.0, measured);
            assert!((0.0..=0.9).contains(&duty));
            assert!(pi.get_error_sum().abs() <= 100.0);
        }
    }

    #[test]
    fn test_duty_saturates_at_limits() {
        let mut pi = PiController::new(&config(1.0, 0.0));
        pi.reset();
        for _ in 0..200 {
            pi.update(1000.0, 0.0);
        }
        assert_eq!(pi.get_duty(), 0.9);
        assert!(pi.is_saturated());

        for _ in 0..200 {
            pi.update(0.0, 1000.0);
        }
        assert_eq!(pi.get_duty(), 0.0);
    }

    #[test]
    fn test_stop_zeroes_state() {
        let mut pi = PiController::new(&config(1.0e-4, 1.0e-4));
        pi.reset();
        pi.update(500.0, 0.0);
        pi.stop();
        assert_eq!(pi.get_duty(), 0.0);
        assert_eq!(pi.get_error_sum(), 0.0);
    }

    #[test]
    fn test_set_gains() {
        let mut pi = PiController::new(&config(0.0, 0.0));
        pi.set_gains(2.0, 3.0);
        assert_eq!(pi.get_kp(), 2.0);
        assert_eq!(pi.get_ki(), 3.0);
    }
}
