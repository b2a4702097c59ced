use om_core::Config;

use crate::clock::{Clock, SystemClock};
use crate::error::ReplayError;
use crate::sampler::{Minibatch, Sampler};
use crate::window::{AdvanceReport, ReplayWindow};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No minibatches owed; waiting for `advance()`.
    Idle,
    /// Serving the minibatches of the current epoch.
    Loaded,
    /// Last minibatch served; the next poll returns `None` and goes idle.
    Exhausted,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Loaded => "loaded",
            Phase::Exhausted => "exhausted",
        }
    }
}

/// Training-loop face of the replay window.
///
/// Each `advance()` loads one generation and owes `n_update` minibatches,
/// which the iterator then yields before returning `None`.
pub struct ReplayLoader<C: Clock = SystemClock> {
    window: ReplayWindow<C>,
    sampler: Sampler,
    n_update: usize,
    remaining: usize,
    phase: Phase,
}

impl ReplayLoader<SystemClock> {
    pub fn from_config(cfg: &Config) -> Result<Self, ReplayError> {
        let window = ReplayWindow::from_config(cfg)?;
        let sampler = Sampler::new(cfg.training.batch_size as usize, cfg.training.seed);
        Ok(Self::new(window, sampler, cfg.training.n_update as usize))
    }
}

impl<C: Clock> ReplayLoader<C> {
    pub fn new(window: ReplayWindow<C>, sampler: Sampler, n_update: usize) -> Self {
        Self {
            window,
            sampler,
            n_update: n_update.max(1),
            remaining: 0,
            phase: Phase::Idle,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn remaining(&self) -> usize {
        self.remaining
    }

    pub fn window(&self) -> &ReplayWindow<C> {
        &self.window
    }

    pub fn window_mut(&mut self) -> &mut ReplayWindow<C> {
        &mut self.window
    }

    /// Load the next generation and start a new epoch.
    ///
    /// On error the phase and owed count are left as they were.
    pub fn advance(&mut self) -> Result<AdvanceReport, ReplayError> {
        let report = self.window.advance()?;
        self.remaining = self.n_update;
        self.phase = Phase::Loaded;
        log::debug!(
            "phase {} after generation {}, {} minibatches owed",
            self.phase.as_str(),
            report.generation,
            self.remaining
        );
        Ok(report)
    }

    pub fn next_batch(&mut self) -> Result<Option<Minibatch>, ReplayError> {
        match self.phase {
            Phase::Idle => Ok(None),
            Phase::Exhausted => {
                self.phase = Phase::Idle;
                Ok(None)
            }
            Phase::Loaded => {
                self.remaining = self.remaining.saturating_sub(1);
                if self.remaining == 0 {
                    self.phase = Phase::Exhausted;
                }
                self.sampler.sample(self.window.pool()).map(Some)
            }
        }
    }
}

impl<C: Clock> Iterator for ReplayLoader<C> {
    type Item = Result<Minibatch, ReplayError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_batch().transpose()
    }
}
