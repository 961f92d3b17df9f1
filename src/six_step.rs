// Six-step commutation module
// Hall sensor based trapezoidal commutation with a PI speed loop

pub mod commutation;
pub mod hall_decoder;
pub mod pi_controller;
pub mod revolution;

// Re-export main types for easier access
pub use commutation::{phase_commands, CommutationDriver, PhaseCommand, PhaseDrive};
pub use hall_decoder::{decode_pattern, CommutationState, HallDecoder, HallReading};
pub use pi_controller::PiController;
pub use revolution::{RevolutionCounter, RevolutionEstimator};
