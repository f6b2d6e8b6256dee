//! # Gas Meter
//!
//! [`Metering`] adapter with one gas frame per call.
//!
//! A nested call pushes a fresh frame funded with the gas given to the child.
//! Popping it hands the child's frame back so the caller decides what the
//! parent is charged.

use crate::errors::VmError;
use crate::host::gas::{GasSchedule, Operation};
use crate::host::state_stack::StateStack;
use crate::ports::outbound::Metering;
use tracing::trace;

/// Gas accounting of one call frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GasFrame {
    /// Gas made available to the frame.
    pub provided: u64,
    /// Gas consumed so far.
    pub used: u64,
    /// Gas released by storage shrinking.
    pub freed: u64,
}

impl GasFrame {
    /// Creates a frame funded with `provided` gas.
    #[must_use]
    pub const fn new(provided: u64) -> Self {
        Self {
            provided,
            used: 0,
            freed: 0,
        }
    }

    /// Returns remaining gas.
    #[must_use]
    pub const fn remaining(&self) -> u64 {
        self.provided.saturating_sub(self.used)
    }
}

/// Frame-stacked gas meter.
#[derive(Clone, Debug)]
pub struct GasMeter {
    schedule: GasSchedule,
    frame: GasFrame,
    stack: StateStack<GasFrame>,
}

impl GasMeter {
    /// Creates a meter with a top-level frame of `gas_limit`.
    #[must_use]
    pub fn new(schedule: GasSchedule, gas_limit: u64) -> Self {
        Self {
            schedule,
            frame: GasFrame::new(gas_limit),
            stack: StateStack::new(),
        }
    }

    /// The gas schedule.
    #[must_use]
    pub fn schedule(&self) -> &GasSchedule {
        &self.schedule
    }

    /// The current frame.
    #[must_use]
    pub fn frame(&self) -> GasFrame {
        self.frame
    }

    /// Gas provided to the current frame.
    #[must_use]
    pub fn gas_provided(&self) -> u64 {
        self.frame.provided
    }

    /// Gas used by the current frame.
    #[must_use]
    pub fn gas_used(&self) -> u64 {
        self.frame.used
    }

    /// Gas freed by the current frame.
    #[must_use]
    pub fn gas_freed(&self) -> u64 {
        self.frame.freed
    }

    /// Number of parked parent frames.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Parks the current frame and starts a child frame funded with `gas_provided`.
    pub fn push_frame(&mut self, gas_provided: u64) {
        self.stack.push(self.frame);
        self.frame = GasFrame::new(gas_provided);
    }

    /// Ends the child frame, restores the parent and returns the child's frame.
    ///
    /// Returns `None` and leaves the meter untouched when no frame is parked.
    pub fn pop_frame(&mut self) -> Option<GasFrame> {
        let parent = self.stack.pop()?;
        Some(std::mem::replace(&mut self.frame, parent))
    }

    /// Consumes everything left in the current frame.
    pub fn use_all_gas(&mut self) {
        self.frame.used = self.frame.provided;
    }
}

impl Metering for GasMeter {
    fn cost_of(&self, op: Operation) -> u64 {
        self.schedule.cost(op)
    }

    fn use_gas(&mut self, amount: u64) -> Result<(), VmError> {
        if amount > self.frame.remaining() {
            trace!(amount, left = self.frame.remaining(), "out of gas");
            return Err(VmError::OutOfGas);
        }
        self.frame.used += amount;
        Ok(())
    }

    fn gas_left(&self) -> u64 {
        self.frame.remaining()
    }

    fn free_gas(&mut self, amount: u64) {
        self.frame.freed = self.frame.freed.saturating_add(amount);
    }
}

// =============================================================================
// TESTS
// =============================================================================
