use crate::signal::{SignalSink, SignalSource};
use crate::site::SiteId;
use std::fmt;

/**
 * A Locked step occupies the functional unit for that cycle, so no other
 * issue may overlap it. Unlocked steps (e.g. trailing pipeline stages) leave
 * the unit free to accept the next issue.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimingMode {
    Locked,
    Unlocked,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Drive {
    pub port: &'static str,
    pub source: SignalSource,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collect {
    pub port: &'static str,
    pub sink: SignalSink,
}

/// The port connections performed during a single step. Empty means idle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Action {
    pub drives: Vec<Drive>,
    pub collects: Vec<Collect>,
}

impl Action {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn drive(mut self, port: &'static str, source: SignalSource) -> Self {
        self.drives.push(Drive { port, source });
        self
    }

    pub fn collect(mut self, port: &'static str, sink: SignalSink) -> Self {
        self.collects.push(Collect { port, sink });
        self
    }

    pub fn is_idle(&self) -> bool {
        self.drives.is_empty() && self.collects.is_empty()
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_idle() {
            return write!(f, "idle");
        }
        let mut parts = Vec::new();
        for d in self.drives.iter() {
            parts.push(format!("{} <= {}", d.port, d.source));
        }
        // Discarded outputs are not worth showing
        for c in self.collects.iter().filter(|c| !c.sink.is_nil()) {
            parts.push(format!("{} => {}", c.port, c.sink));
        }
        if parts.is_empty() {
            return write!(f, "idle");
        }
        write!(f, "{}", parts.join(", "))
    }
}

/// One cycle of a hardware realization, on one site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimedAction {
    pub site: SiteId,
    pub mode: TimingMode,
    pub action: Action,
}

impl TimedAction {
    pub fn is_locked(&self) -> bool {
        self.mode == TimingMode::Locked
    }
}

impl fmt::Display for TimedAction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let tag = match self.mode {
            TimingMode::Locked => 'L',
            TimingMode::Unlocked => 'U',
        };
        write!(f, "[{}] {}: {}", tag, self.site, self.action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discarded_results_are_left_out() {
        let action = Action::idle()
            .drive("a", SignalSource::signal("x"))
            .collect("q", SignalSink::Nil)
            .collect("r", SignalSink::signal("y"));
        assert_eq!(action.to_string(), "a <= x, r => y");

        let dropped = Action::idle().collect("q", SignalSink::Nil);
        assert!(!dropped.is_idle());
        assert_eq!(dropped.to_string(), "idle");
    }

    #[test]
    fn timed_actions_show_mode_and_site() {
        let step = TimedAction {
            site: SiteId(3),
            mode: TimingMode::Locked,
            action: Action::idle(),
        };
        assert!(step.is_locked());
        assert_eq!(step.to_string(), "[L] $3: idle");
    }
}
