/// Outcome of one early-stopping evaluation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoppingState {
    /// The score beat the best seen so far.
    Improving,
    /// `k` consecutive epochs without improvement, still below patience.
    Stalled(usize),
    /// Patience exhausted. Terminal.
    Stopped,
}

/// Patience-based early stopping on the epoch mean discriminator loss.
///
/// A larger score counts as an improvement. The best score starts at negative
/// infinity, so the first finite score always improves; NaN never does.
#[derive(Clone, Debug)]
pub struct EarlyStopping {
    patience: usize,
    best_score: f64,
    epochs_without_improvement: usize,
    state: StoppingState,
}

impl EarlyStopping {
    pub fn new(patience: usize) -> Self {
        Self {
            patience,
            best_score: f64::NEG_INFINITY,
            epochs_without_improvement: 0,
            state: StoppingState::Improving,
        }
    }

    /// Feed one epoch score and return the new state.
    pub fn update(&mut self, score: f64) -> StoppingState {
        if self.state == StoppingState::Stopped {
            return self.state;
        }

        if score > self.best_score {
            self.best_score = score;
            self.epochs_without_improvement = 0;
            self.state = StoppingState::Improving;
        } else {
            self.epochs_without_improvement += 1;
            self.state = if self.epochs_without_improvement >= self.patience {
                StoppingState::Stopped
            } else {
                StoppingState::Stalled(self.epochs_without_improvement)
            };
        }
        self.state
    }

    pub fn state(&self) -> StoppingState {
        self.state
    }

    pub fn best_score(&self) -> f64 {
        self.best_score
    }

    pub fn patience(&self) -> usize {
        self.patience
    }

    pub fn epochs_without_improvement(&self) -> usize {
        self.epochs_without_improvement
    }
}
