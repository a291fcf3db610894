use super::explorer::{Alternative, Task};
use log::{debug, info, trace};

/**
 * Receives progress reports from an exploration. The progress counter counts
 * individual alternatives, so it advances once per task in every combination.
 */
pub trait ExplorationObserver {
    fn notify_space_size(&mut self, total: u64);

    fn on_begin_flow(&mut self, alternatives: &[&Alternative], progress: u64);

    fn on_begin_task(
        &mut self,
        task: &Task,
        alternative: &Alternative,
        progress: u64,
    );

    fn on_end_of_exploration(&mut self);
}

/// Reports the exploration through the 'log' facade.
#[derive(Debug, Clone, Default)]
pub struct LogObserver {
    total: u64,
    flows: u64,
}

impl LogObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn flows(&self) -> u64 {
        self.flows
    }
}

impl ExplorationObserver for LogObserver {
    fn notify_space_size(&mut self, total: u64) {
        self.total = total;
        info!("design space: {} combination(s)", total);
    }

    fn on_begin_flow(&mut self, alternatives: &[&Alternative], progress: u64) {
        self.flows += 1;
        let names: Vec<&str> = alternatives.iter().map(|a| a.name()).collect();
        debug!(
            "combination {}/{} (progress: {}): {:?}",
            self.flows, self.total, progress, names
        );
    }

    fn on_begin_task(
        &mut self,
        task: &Task,
        alternative: &Alternative,
        progress: u64,
    ) {
        trace!("[{}] {} := {}", progress, task.name(), alternative.name());
    }

    fn on_end_of_exploration(&mut self) {
        info!("exploration complete after {} combination(s)", self.flows);
    }
}
