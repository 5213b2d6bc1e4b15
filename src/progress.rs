//! Spinner shown while a remote step runs.

use indicatif::{ProgressBar, ProgressStyle};
use repokit::Step;
use repokit::executor::{ProgressCallback, StepOutcome};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

/// Handle on the spinner currently on screen, if any.
///
/// Clones share the same slot, so a prompt holding one can hide whatever
/// spinner [`StepSpinner`] has running.
#[derive(Clone, Default)]
pub struct ActiveSpinner(Rc<RefCell<Option<ProgressBar>>>);

impl ActiveSpinner {
    fn replace(&self, pb: Option<ProgressBar>) -> Option<ProgressBar> {
        self.0.replace(pb)
    }

    #[cfg(test)]
    fn is_active(&self) -> bool {
        self.0.borrow().is_some()
    }

    /// Run `f` with the active spinner cleared from the terminal.
    pub fn suspend<R>(&self, f: impl FnOnce() -> R) -> R {
        let pb = self.0.borrow().clone();
        match pb {
            Some(pb) => pb.suspend(f),
            None => f(),
        }
    }
}

pub struct StepSpinner {
    quiet: bool,
    current: ActiveSpinner,
}

impl StepSpinner {
    pub fn new(quiet: bool, current: ActiveSpinner) -> Self {
        Self { quiet, current }
    }

    fn spinner(&self) -> ProgressBar {
        if self.quiet {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.green} {prefix:.blue.bold} {msg}")
        {
            pb.set_style(style);
        }
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }
}

impl ProgressCallback for StepSpinner {
    fn on_step_start(&mut self, index: usize, total: usize, step: &Step) {
        let pb = self.spinner();
        pb.set_prefix(format!("[{}/{}]", index + 1, total));
        pb.set_message(step.describe());
        if let Some(stale) = self.current.replace(Some(pb)) {
            stale.finish_and_clear();
        }
    }

    fn on_step_complete(&mut self, _index: usize, _total: usize, _outcome: &StepOutcome) {
        if let Some(pb) = self.current.replace(None) {
            pb.finish_and_clear();
        }
    }
}
