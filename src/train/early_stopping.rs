/// Outcome of feeding one epoch's validation cost to `EarlyStopping`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Verdict {
    /// Strictly below the best cost seen so far.
    Improved,
    /// Not an improvement; carries the number of consecutive stale epochs.
    NoImprovement { stale_epochs: usize },
    /// Patience exhausted. With a patience of 0 this also ends an epoch that
    /// improved, in which case `improved` is set and `stale_epochs` is 0.
    Stop { stale_epochs: usize, improved: bool },
}

impl Verdict {
    /// True when the observed cost became the new best.
    pub fn improved(&self) -> bool {
        matches!(self, Verdict::Improved | Verdict::Stop { improved: true, .. })
    }
}

/// Tracks the best validation cost and how long it has gone unbeaten.
#[derive(Debug, Clone)]
pub struct EarlyStopping {
    best_cost: f64,
    stale_epochs: usize,
    patience: usize,
}

impl EarlyStopping {
    pub fn new(patience: usize) -> EarlyStopping {
        EarlyStopping { best_cost: f64::INFINITY, stale_epochs: 0, patience }
    }

    /// Records one epoch's validation cost. Stops `patience` epochs after the
    /// last improvement.
    pub fn observe(&mut self, validation_cost: f64) -> Verdict {
        let improved = validation_cost < self.best_cost;
        if improved {
            self.best_cost = validation_cost;
            self.stale_epochs = 0;
        } else {
            self.stale_epochs += 1;
        }

        if self.stale_epochs >= self.patience {
            Verdict::Stop { stale_epochs: self.stale_epochs, improved }
        } else if improved {
            Verdict::Improved
        } else {
            Verdict::NoImprovement { stale_epochs: self.stale_epochs }
        }
    }

    /// `None` until the first validated epoch.
    pub fn best_cost(&self) -> Option<f64> {
        self.best_cost.is_finite().then_some(self.best_cost)
    }

    pub fn stale_epochs(&self) -> usize {
        self.stale_epochs
    }
}
