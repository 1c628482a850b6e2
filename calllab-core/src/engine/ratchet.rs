//! Trailing stop state with the ratchet invariant.
//!
//! **Core Rule:** the stop may tighten, never loosen.
//!
//! Positions are long-only, so "tighten" always means "rise". The
//! high-water mark is only tracked once the trailing activation condition
//! has been met; before that the stop is the hard-stop floor alone.

/// A level that can only move up.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RatchetState {
    current_level: Option<f64>,
}

impl RatchetState {
    pub fn new() -> Self {
        Self {
            current_level: None,
        }
    }

    /// Apply the ratchet to a proposed level and return the effective level.
    ///
    /// # Example
    /// ```
    /// use calllab_core::engine::RatchetState;
    ///
    /// let mut ratchet = RatchetState::new();
    /// assert_eq!(ratchet.apply(0.75), 0.75);
    /// assert_eq!(ratchet.apply(0.90), 0.90);
    /// assert_eq!(ratchet.apply(0.80), 0.90);
    /// ```
    pub fn apply(&mut self, proposed: f64) -> f64 {
        let level = match self.current_level {
            None => proposed,
            Some(current) => current.max(proposed),
        };
        self.current_level = Some(level);
        level
    }

    pub fn current_level(&self) -> Option<f64> {
        self.current_level
    }
}

/// High-water mark plus the ratcheted stop built from it.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TrailingState {
    high_water_mark: Option<f64>,
    stop: RatchetState,
}

impl TrailingState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking from `seed` (no-op if already active).
    pub fn activate(&mut self, seed: f64) {
        if self.high_water_mark.is_none() {
            self.high_water_mark = Some(seed);
        }
    }

    pub fn is_active(&self) -> bool {
        self.high_water_mark.is_some()
    }

    pub fn high_water_mark(&self) -> Option<f64> {
        self.high_water_mark
    }

    /// Fold a candle high into the mark. Ignored until activated.
    pub fn observe_high(&mut self, high: f64) {
        if let Some(mark) = self.high_water_mark.as_mut() {
            *mark = mark.max(high);
        }
    }

    /// Ratchet the stop to `candidate` and return the effective stop.
    pub fn ratchet_stop(&mut self, candidate: f64) -> f64 {
        self.stop.apply(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ratchet_tightening_allowed() {
        let mut ratchet = RatchetState::new();
        ratchet.apply(0.95);
        assert_eq!(ratchet.apply(1.0), 1.0);
        assert_eq!(ratchet.current_level(), Some(1.0));
    }

    #[test]
    fn test_ratchet_loosening_blocked() {
        let mut ratchet = RatchetState::new();
        ratchet.apply(1.0);
        assert_eq!(ratchet.apply(0.9), 1.0);
        assert_eq!(ratchet.current_level(), Some(1.0));
    }

    #[test]
    fn test_ratchet_initialization() {
        let mut ratchet = RatchetState::new();
        assert_eq!(ratchet.current_level(), None);
        assert_eq!(ratchet.apply(0.95), 0.95);
        assert_eq!(ratchet.current_level(), Some(0.95));
    }

    #[test]
    fn test_mark_ignored_until_active() {
        let mut trailing = TrailingState::new();
        trailing.observe_high(5.0);
        assert_eq!(trailing.high_water_mark(), None);

        trailing.activate(2.0);
        trailing.observe_high(1.5);
        assert_eq!(trailing.high_water_mark(), Some(2.0));
        trailing.observe_high(2.2);
        assert_eq!(trailing.high_water_mark(), Some(2.2));
    }

    #[test]
    fn test_activation_is_sticky() {
        let mut trailing = TrailingState::new();
        trailing.activate(2.0);
        trailing.activate(1.0);
        assert_eq!(trailing.high_water_mark(), Some(2.0));
    }

    #[test]
    fn test_stop_never_loosens() {
        let mut trailing = TrailingState::new();
        assert_eq!(trailing.ratchet_stop(1.87), 1.87);
        // a lower proposal (e.g. mark reset) keeps the earlier stop
        assert_eq!(trailing.ratchet_stop(0.75), 1.87);
    }
}
