// Hall sensor decoding for six-step commutation
// Maps the three Hall lines to one of six commutation states or a fault

use crate::fault::{FaultKind, FaultLatch};

/// Valid Hall patterns, keyed as h1*100 + h2*10 + h3 (h1 most significant)
/// Index in this table is the commutation state.
/// Any pattern not listed here (000, 111) is a sensor fault.
const HALL_PATTERNS: [u16; CommutationState::COUNT] = [
    1,   // 0b001: State 0
    101, // 0b101: State 1
    100, // 0b100: State 2
    110, // 0b110: State 3
    10,  // 0b010: State 4
    11,  // 0b011: State 5
];

/// One of the six physically valid winding-energization phases (0-5)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CommutationState(u8);

impl CommutationState {
    /// Number of commutation states per electrical revolution
    pub const COUNT: usize = 6;

    /// Create a commutation state from its index
    ///
    /// # Returns
    /// `None` if `index` is not in 0-5
    pub const fn new(index: u8) -> Option<Self> {
        if (index as usize) < Self::COUNT {
            Some(Self(index))
        } else {
            None
        }
    }

    /// Get the state index (0-5)
    pub const fn index(self) -> u8 {
        self.0
    }

    /// The next state in the six-state cycle
    pub const fn next(self) -> Self {
        Self((self.0 + 1) % Self::COUNT as u8)
    }

    /// Iterate over all six states in order
    pub fn all() -> impl Iterator<Item = Self> {
        (0..Self::COUNT as u8).map(Self)
    }
}

/// Result of sampling the Hall sensors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HallReading {
    State(CommutationState),
    Fault,
}

impl HallReading {
    pub fn state(self) -> Option<CommutationState> {
        match self {
            HallReading::State(state) => Some(state),
            HallReading::Fault => None,
        }
    }

    pub fn is_fault(self) -> bool {
        matches!(self, HallReading::Fault)
    }
}

/// Build the composite lookup key from the three Hall lines
#[inline(always)]
fn pattern_key(h1: bool, h2: bool, h3: bool) -> u16 {
    (h1 as u16) * 100 + (h2 as u16) * 10 + (h3 as u16)
}

/// Decode the Hall lines without touching the fault latch
pub fn decode_pattern(h1: bool, h2: bool, h3: bool) -> HallReading {
    let key = pattern_key(h1, h2, h3);
    HALL_PATTERNS
        .iter()
        .position(|&pattern| pattern == key)
        .map(|index| HallReading::State(CommutationState(index as u8)))
        .unwrap_or(HallReading::Fault)
}

/// Hall decoder keeping the current and the previous (checkpoint) reading
pub struct HallDecoder {
    /// Previous reading
    checkpoint: Option<HallReading>,
    /// Most recent reading
    current: Option<HallReading>,
}

impl HallDecoder {
    pub const fn new() -> Self {
        Self {
            checkpoint: None,
            current: None,
        }
    }

    /// Decode the Hall lines
    ///
    /// An invalid pattern latches a sensor fault into `faults`.
    /// This is the only place invalid readings are detected.
    ///
    /// # Returns
    /// The decoded reading
    pub fn decode(&mut self, h1: bool, h2: bool, h3: bool, faults: &mut FaultLatch) -> HallReading {
        let reading = decode_pattern(h1, h2, h3);
        if reading.is_fault() {
            faults.latch(FaultKind::Sensor);
        }

        self.checkpoint = self.current;
        self.current = Some(reading);
        reading
    }

    /// Most recent reading
    pub fn current(&self) -> Option<HallReading> {
        self.current
    }

    /// Reading before the most recent one
    pub fn checkpoint(&self) -> Option<HallReading> {
        self.checkpoint
    }

    /// True if the last decode moved to a different state
    pub fn state_changed(&self) -> bool {
        match (self.checkpoint, self.current) {
            (Some(previous), Some(current)) => previous != current,
            _ => false,
        }
    }

    /// Forget both stored readings
    pub fn reset(&mut self) {
        self.checkpoint = None;
        self.current = None;
    }
}

impl Default for HallDecoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bits(pattern: u8) -> (bool, bool, bool) {
        (pattern & 0b100 != 0, pattern & 0b010 != 0, pattern & 0b001 != 0)
    }

    #[test]
    fn test_valid_patterns_map_to_distinct_states() {
        // (h1 h2 h3) -> state
        let expected = [
            (0b001, 0),
            (0b101, 1),
            (0b100, 2),
            (0b110, 3),
            (0b010, 4),
            (0b011, 5),
        ];

        for (pattern, state) in expected {
            let (h1, h2, h3) = bits(pattern);
            assert_eq!(
                decode_pattern(h1, h2, h3),
                HallReading::State(CommutationState::new(state).unwrap())
            );
        }
    }

    #[test]
    fn test_invalid_patterns_are_faults() {
        for pattern in [0b000, 0b111] {
            let (h1, h2, h3) = bits(pattern);
            assert_eq!(decode_pattern(h1, h2, h3), HallReading::Fault);
        }
    }

    #[test]
    fn test_all_patterns_cover_each_state_once() {
        let mut seen = [0u8; CommutationState::COUNT];
        for pattern in 0u8..8 {
            let (h1, h2, h3) = bits(pattern);
            if let Some(state) = decode_pattern(h1, h2, h3).state() {
                seen[state.index() as usize] += 1;
            }
        }
        assert_eq!(seen, [1; CommutationState::COUNT]);
    }

    #[test]
    fn test_decoder_latches_sensor_fault() {
        let mut decoder = HallDecoder::new();
        let mut faults = FaultLatch::new();

        assert!(!decoder.decode(false, false, true, &mut faults).is_fault());
        assert!(!faults.is_set());

        assert!(decoder.decode(true, true, true, &mut faults).is_fault());
        assert_eq!(faults.kind(), Some(FaultKind::Sensor));

        // A valid reading afterwards does not clear the latch
        decoder.decode(true, false, true, &mut faults);
        assert!(faults.is_set());
    }

    #[test]
    fn test_checkpoint_tracking() {
        let mut decoder = HallDecoder::new();
        let mut faults = FaultLatch::new();

        decoder.decode(false, false, true, &mut faults);
        assert!(!decoder.state_changed());

        decoder.decode(true, false, true, &mut faults);
        assert!(decoder.state_changed());
        assert_eq!(
            decoder.checkpoint(),
            Some(HallReading::State(CommutationState::new(0).unwrap()))
        );

        decoder.reset();
        assert_eq!(decoder.current(), None);
    }

    #[test]
    fn test_state_cycle() {
        let mut state = CommutationState::new(0).unwrap();
        for i in 1..=6 {
            state = state.next();
            assert_eq!(state.index(), i % 6);
        }
        assert_eq!(CommutationState::new(6), None);
        assert_eq!(CommutationState::all().count(), 6);
    }
}
