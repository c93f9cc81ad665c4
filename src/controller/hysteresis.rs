//! # Hysteresis Module
//!
//! Turns a continuously varying absolute axis into discrete down/up
//! transitions for its two endpoints.
//!
//! ## Zones
//!
//! For an axis range `[min, max]` with `span = max - min`:
//!
//! | Zone | Range | Effect |
//! |------|-------|--------|
//! | Min endpoint | `v < min + 0.25 * span` | `min` latch goes down |
//! | Dead zone | between the thresholds | releases both latches |
//! | Max endpoint | `v > min + 0.75 * span` | `max` latch goes down |
//!
//! A latch only reports a transition when it actually changes, so jitter
//! inside one zone never produces repeated actions.
//!
//! ## Usage
//!
//! ```
//! use evmapd::action::Direction;
//! use evmapd::controller::hysteresis::Hysteresis;
//!
//! let hysteresis = Hysteresis::new(0, 255);
//! let mut latch = Direction::Up;
//!
//! assert_eq!(hysteresis.update_min(10, &mut latch), Some(Direction::Down));
//! assert_eq!(hysteresis.update_min(20, &mut latch), None);
//! assert_eq!(hysteresis.update_min(128, &mut latch), Some(Direction::Up));
//! ```

use crate::action::Direction;

/// Fraction of the span below which the min endpoint is activated.
pub const LOWER_ACTIVATION: f64 = 0.25;

/// Fraction of the span above which the max endpoint is activated.
pub const UPPER_ACTIVATION: f64 = 0.75;

/// Activation thresholds for one axis, fixed at load time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hysteresis {
    lower: f64,
    upper: f64,
}

impl Hysteresis {
    /// Computes thresholds for the raw axis range `[min, max]`.
    ///
    /// # Examples
    ///
    /// ```
    /// use evmapd::controller::hysteresis::Hysteresis;
    ///
    /// let hysteresis = Hysteresis::new(0, 255);
    /// assert_eq!(hysteresis.lower_threshold(), 63.75);
    /// assert_eq!(hysteresis.upper_threshold(), 191.25);
    /// ```
    #[must_use]
    pub fn new(min: i32, max: i32) -> Self {
        let min = f64::from(min);
        let span = f64::from(max) - min;
        Self {
            lower: min + LOWER_ACTIVATION * span,
            upper: min + UPPER_ACTIVATION * span,
        }
    }

    #[must_use]
    pub fn lower_threshold(&self) -> f64 {
        self.lower
    }

    #[must_use]
    pub fn upper_threshold(&self) -> f64 {
        self.upper
    }

    /// Feeds a raw value to the min endpoint latch.
    ///
    /// Activation is `value < lower`, release is `value >= lower`.
    /// Returns the new latch state if it changed.
    pub fn update_min(&self, value: i32, latch: &mut Direction) -> Option<Direction> {
        let activated = f64::from(value) < self.lower;
        Self::update(activated, latch)
    }

    /// Feeds a raw value to the max endpoint latch.
    ///
    /// Activation is `value > upper`, release is `value <= upper`.
    /// Returns the new latch state if it changed.
    pub fn update_max(&self, value: i32, latch: &mut Direction) -> Option<Direction> {
        let activated = f64::from(value) > self.upper;
        Self::update(activated, latch)
    }

    fn update(activated: bool, latch: &mut Direction) -> Option<Direction> {
        let next = if activated { Direction::Down } else { Direction::Up };
        if next == *latch {
            return None;
        }
        *latch = next;
        Some(next)
    }
}
