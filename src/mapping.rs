use crate::error::BindError;
use crate::signal::{SignalSink, SignalSource};
use crate::site::{SiteRef, TransactionSite};
use crate::verb::TimedAction;
use log::trace;
use std::fmt;

/**
 * How a functional-unit instance may be shared across instructions:
 *  - Exclusive: the instance serves one instruction only;
 *  - Replicatable: the instance may be time-shared, or another one created;
 *  - Lightweight: so cheap that a fresh instance per use is preferable.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Exclusive,
    Replicatable,
    Lightweight,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            ResourceKind::Exclusive => "exclusive",
            ResourceKind::Replicatable => "replicatable",
            ResourceKind::Lightweight => "lightweight",
        };
        write!(f, "{}", s)
    }
}

/// Cycle-level timing contract of a mapping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timing {
    pub latency: usize,
    pub initiation_interval: usize,
}

impl Timing {
    /**
     *  The latency is the number of steps after the first one, and the
     *  initiation interval is the number of steps that lock the unit.
     */
    pub fn of(actions: &[TimedAction]) -> Self {
        Self {
            latency: actions.len().saturating_sub(1),
            initiation_interval: actions.iter().filter(|a| a.is_locked()).count(),
        }
    }
}

/**
 * The unit-specific part of a mapping: how an instruction is turned into
 * timed actions on a site, for some operand & result wiring.
 */
pub trait Realize {
    fn description(&self) -> String;

    /// Number of (operands, results) expected by 'realize'.
    fn arity(&self) -> (usize, usize);

    fn realize(
        &self,
        site: &TransactionSite,
        operands: &[SignalSource],
        results: &[SignalSink],
    ) -> Vec<TimedAction>;

    /// Realization with placeholder wiring, which fixes the timing.
    fn canonical(&self, site: &TransactionSite) -> Vec<TimedAction> {
        let (num_operands, num_results) = self.arity();
        let operands = vec![SignalSource::zero(); num_operands];
        let results = vec![SignalSink::Nil; num_results];
        self.realize(site, &operands, &results)
    }
}

/**
 * A candidate binding of one instruction to one site. The timing is derived
 * from the canonical realization when the mapping is constructed, so it can be
 * compared against other candidates before any wiring is known.
 */
pub struct Mapping {
    site: SiteRef,
    kind: ResourceKind,
    timing: Timing,
    realizer: Box<dyn Realize>,
}

impl Mapping {
    pub fn new<R: Realize + 'static>(
        site: SiteRef,
        kind: ResourceKind,
        realizer: R,
    ) -> Self {
        let timing = Timing::of(&realizer.canonical(&site));
        trace!(
            "mapping '{}' on {}: latency = {}, ii = {}",
            realizer.description(),
            site.name(),
            timing.latency,
            timing.initiation_interval
        );
        Self {
            site,
            kind,
            timing,
            realizer: Box::new(realizer),
        }
    }

    // -- PUBLIC QUERY FUNCTIONS -- //

    pub fn description(&self) -> String {
        self.realizer.description()
    }

    pub fn resource_kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn site(&self) -> &SiteRef {
        &self.site
    }

    pub fn timing(&self) -> Timing {
        self.timing
    }

    pub fn latency(&self) -> usize {
        self.timing.latency
    }

    pub fn initiation_interval(&self) -> usize {
        self.timing.initiation_interval
    }

    // -- REALIZATION -- //

    pub fn realize(
        &self,
        operands: &[SignalSource],
        results: &[SignalSink],
    ) -> Result<Vec<TimedAction>, BindError> {
        let (num_operands, num_results) = self.realizer.arity();
        if operands.len() != num_operands {
            return Err(self.arity_error("operand", num_operands, operands.len()));
        }
        if results.len() != num_results {
            return Err(self.arity_error("result", num_results, results.len()));
        }

        let actions = self.realizer.realize(&self.site, operands, results);
        debug_assert_eq!(Timing::of(&actions), self.timing);
        for a in actions.iter() {
            trace!("{}", a);
        }
        Ok(actions)
    }

    fn arity_error(
        &self,
        what: &'static str,
        expected: usize,
        found: usize,
    ) -> BindError {
        BindError::Arity {
            mapping: self.description(),
            what,
            expected,
            found,
        }
    }
}

impl fmt::Debug for Mapping {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Mapping")
            .field("description", &self.description())
            .field("site", &self.site.name())
            .field("kind", &self.kind)
            .field("timing", &self.timing)
            .finish()
    }
}

impl fmt::Display for Mapping {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} on '{}' ({}, latency: {}, ii: {})",
            self.description(),
            self.site.name(),
            self.kind,
            self.timing.latency,
            self.timing.initiation_interval
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::site::{Host, Project, SiteSpec};
    use crate::verb::{Action, TimingMode};
    use std::cell::Cell;
    use std::rc::Rc;

    use TimingMode::{Locked, Unlocked};

    /// Realizes a fixed list of modes, and counts canonical realizations.
    struct Scripted {
        modes: Vec<TimingMode>,
        canonicals: Rc<Cell<usize>>,
    }

    impl Realize for Scripted {
        fn description(&self) -> String {
            "scripted".to_string()
        }

        fn arity(&self) -> (usize, usize) {
            (1, 1)
        }

        fn realize(
            &self,
            site: &TransactionSite,
            operands: &[SignalSource],
            results: &[SignalSink],
        ) -> Vec<TimedAction> {
            let mut actions: Vec<TimedAction> = self
                .modes
                .iter()
                .map(|m| site.verb(*m, Action::idle()))
                .collect();
            if let Some(first) = actions.first_mut() {
                first.action = Action::idle()
                    .drive("a", operands[0].clone())
                    .collect("r", results[0].clone());
            }
            actions
        }

        fn canonical(&self, site: &TransactionSite) -> Vec<TimedAction> {
            self.canonicals.set(self.canonicals.get() + 1);
            self.realize(site, &[SignalSource::zero()], &[SignalSink::Nil])
        }
    }

    fn mk_site() -> SiteRef {
        let mut project = Project::new("test");
        let mut host = Host::new("top");
        host.instantiate(
            &mut project,
            SiteSpec {
                class: "test",
                kind: ResourceKind::Replicatable,
                width: 8,
                tag: None,
            },
        )
    }

    fn mk_mapping(modes: Vec<TimingMode>) -> (Mapping, Rc<Cell<usize>>) {
        let canonicals = Rc::new(Cell::new(0));
        let realizer = Scripted {
            modes,
            canonicals: canonicals.clone(),
        };
        let mapping =
            Mapping::new(mk_site(), ResourceKind::Replicatable, realizer);
        (mapping, canonicals)
    }

    #[test]
    fn locked_unlocked_locked_has_latency_two_and_ii_two() {
        let (mapping, _) = mk_mapping(vec![Locked, Unlocked, Locked]);
        assert_eq!(mapping.latency(), 2);
        assert_eq!(mapping.initiation_interval(), 2);
    }

    #[test]
    fn empty_realization_has_zero_timing() {
        let (mapping, _) = mk_mapping(vec![]);
        assert_eq!(mapping.timing(), Timing::default());
        assert_eq!(Timing::of(&[]), Timing { latency: 0, initiation_interval: 0 });
    }

    #[test]
    fn timing_is_derived_exactly_once() {
        let (mapping, canonicals) = mk_mapping(vec![Locked, Unlocked]);
        for _ in 0..10 {
            assert_eq!(mapping.latency(), 1);
            assert_eq!(mapping.initiation_interval(), 1);
        }
        mapping
            .realize(&[SignalSource::signal("x")], &[SignalSink::signal("y")])
            .unwrap();
        assert_eq!(canonicals.get(), 1);
    }

    #[test]
    fn realization_uses_the_given_wiring() {
        let (mapping, _) = mk_mapping(vec![Locked, Unlocked, Unlocked]);
        let actions = mapping
            .realize(&[SignalSource::signal("x")], &[SignalSink::signal("y")])
            .unwrap();
        assert_eq!(actions.len(), 3);
        assert_eq!(Timing::of(&actions), mapping.timing());
        assert_eq!(actions[0].action.drives[0].source, SignalSource::signal("x"));
        assert_eq!(actions[0].action.collects[0].sink, SignalSink::signal("y"));
        assert_eq!(actions[0].site, mapping.site().id());
    }

    #[test]
    fn realization_rejects_wrong_arity() {
        let (mapping, _) = mk_mapping(vec![Locked]);
        let err = mapping.realize(&[], &[SignalSink::Nil]).unwrap_err();
        assert!(matches!(
            err,
            BindError::Arity { what: "operand", expected: 1, found: 0, .. }
        ));
        let err = mapping
            .realize(&[SignalSource::zero()], &[])
            .unwrap_err();
        assert!(matches!(err, BindError::Arity { what: "result", .. }));
    }
}
