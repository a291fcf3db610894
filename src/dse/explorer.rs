use super::observer::ExplorationObserver;
use super::odometer::Odometer;
use std::fmt;

/**
 * One possible decision for a task. Committing applies the decision in place,
 * through whatever state the action has captured.
 */
pub struct Alternative {
    name: String,
    action: Box<dyn Fn()>,
}

impl Alternative {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn commit(&self) {
        (self.action)()
    }
}

impl fmt::Debug for Alternative {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Alternative").field("name", &self.name).finish()
    }
}

/// A named decision, together with its alternatives (in order).
#[derive(Debug)]
pub struct Task {
    name: String,
    alternatives: Vec<Alternative>,
}

impl Task {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            alternatives: Vec::new(),
        }
    }

    pub fn add_alternative<F>(&mut self, name: &str, action: F) -> &Alternative
    where
        F: Fn() + 'static,
    {
        self.alternatives.push(Alternative {
            name: name.to_string(),
            action: Box::new(action),
        });
        &self.alternatives[self.alternatives.len() - 1]
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn alternatives(&self) -> &[Alternative] {
        &self.alternatives
    }

    pub fn len(&self) -> usize {
        self.alternatives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alternatives.is_empty()
    }
}

/**
 * Enumerates the Cartesian product of the alternatives of all its tasks. The
 * first task added is the fastest-varying one. If any task has no
 * alternatives then there is nothing to explore at all.
 */
#[derive(Debug, Default)]
pub struct Explorer {
    tasks: Vec<Task>,
}

impl Explorer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_task(&mut self, name: &str) -> &mut Task {
        self.tasks.push(Task::new(name));
        let last = self.tasks.len() - 1;
        &mut self.tasks[last]
    }

    pub fn push_task(&mut self, task: Task) {
        self.tasks.push(task);
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    fn odometer(&self) -> Option<Odometer> {
        let lengths: Vec<usize> = self.tasks.iter().map(|t| t.len()).collect();
        Odometer::new(&lengths)
    }

    /// Size of the design space, computed arithmetically (saturating).
    pub fn space_size(&self) -> u64 {
        self.odometer().map_or(0, |odo| odo.size())
    }

    /// Every combination, as one alternative per task (in task order).
    pub fn combinations(&self) -> Combinations<'_> {
        Combinations {
            tasks: &self.tasks,
            odometer: self.odometer(),
            started: false,
        }
    }

    /**
     *  Yields the alternatives of each combination in turn, reporting to the
     *  observer (if any) at the start of each combination, and before each
     *  alternative is yielded.
     */
    pub fn enumerate<'o>(
        &self,
        observer: Option<&'o mut dyn ExplorationObserver>,
    ) -> Enumeration<'_, 'o> {
        Enumeration {
            tasks: &self.tasks,
            odometer: self.odometer(),
            observer,
            next: 0,
            progress: 0,
        }
    }

    /**
     *  Commits every alternative of every combination, in enumeration order.
     *
     *  Note: with an observer, a silent dry pass over the whole space is made
     *    first, so that the observer is told the size up front.
     */
    pub fn explore(&self, mut observer: Option<&mut dyn ExplorationObserver>) {
        if let Some(obs) = observer.as_deref_mut() {
            let total = self.combinations().count() as u64;
            obs.notify_space_size(total);
        }

        for (_, alternative) in self.enumerate(observer) {
            alternative.commit();
        }
    }
}

impl fmt::Display for Explorer {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Explorer {{")?;
        writeln!(f, "    space_size: {}", self.space_size())?;
        for (i, task) in self.tasks.iter().enumerate() {
            let names: Vec<&str> =
                task.alternatives.iter().map(|a| a.name()).collect();
            writeln!(f, "    task[{}] '{}': {:?}", i, task.name, names)?;
        }
        writeln!(f, "}}")
    }
}

/// Silent walk over the design space, one combination per item.
pub struct Combinations<'a> {
    tasks: &'a [Task],
    odometer: Option<Odometer>,
    started: bool,
}

impl<'a> Iterator for Combinations<'a> {
    type Item = Vec<&'a Alternative>;

    fn next(&mut self) -> Option<Self::Item> {
        let tasks: &'a [Task] = self.tasks;
        let odometer = self.odometer.as_mut()?;
        if self.started && !odometer.advance() {
            self.odometer = None;
            return None;
        }
        self.started = true;
        Some(
            tasks
                .iter()
                .zip(odometer.cursors())
                .map(|(t, c)| &t.alternatives[c])
                .collect(),
        )
    }
}

pub struct Enumeration<'a, 'o> {
    tasks: &'a [Task],
    odometer: Option<Odometer>,
    observer: Option<&'o mut dyn ExplorationObserver>,
    next: usize,
    progress: u64,
}

impl<'a, 'o> Iterator for Enumeration<'a, 'o> {
    type Item = (&'a Task, &'a Alternative);

    fn next(&mut self) -> Option<Self::Item> {
        let tasks: &'a [Task] = self.tasks;
        loop {
            let odometer = self.odometer.as_mut()?;

            if self.next == 0 {
                if let Some(obs) = self.observer.as_deref_mut() {
                    let current: Vec<&Alternative> = tasks
                        .iter()
                        .zip(odometer.cursors())
                        .map(|(t, c)| &t.alternatives[c])
                        .collect();
                    obs.on_begin_flow(&current, self.progress);
                }
            }

            if self.next < tasks.len() {
                let task = &tasks[self.next];
                let alternative = &task.alternatives[odometer.cursor(self.next)];
                if let Some(obs) = self.observer.as_deref_mut() {
                    obs.on_begin_task(task, alternative, self.progress);
                }
                self.progress += 1;
                self.next += 1;
                return Some((task, alternative));
            }

            // Current combination is done, so move on to the next one
            self.next = 0;
            if !odometer.advance() {
                self.odometer = None;
                if let Some(obs) = self.observer.as_deref_mut() {
                    obs.on_end_of_exploration();
                }
                return None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Log = Rc<RefCell<Vec<String>>>;

    fn mk_explorer(tasks: Vec<(&str, Vec<&str>)>, log: &Log) -> Explorer {
        let mut explorer = Explorer::new();
        for (name, alts) in tasks {
            let task = explorer.add_task(name);
            for alt in alts {
                let log = log.clone();
                let label = alt.to_string();
                task.add_alternative(alt, move || log.borrow_mut().push(label.clone()));
            }
        }
        explorer
    }

    #[derive(Default)]
    struct Recorder {
        sizes: Vec<u64>,
        flows: Vec<(Vec<String>, u64)>,
        steps: Vec<(String, String, u64)>,
        ends: usize,
    }

    impl ExplorationObserver for Recorder {
        fn notify_space_size(&mut self, total: u64) {
            self.sizes.push(total);
        }

        fn on_begin_flow(&mut self, alternatives: &[&Alternative], progress: u64) {
            let names = alternatives.iter().map(|a| a.name().to_string()).collect();
            self.flows.push((names, progress));
        }

        fn on_begin_task(&mut self, task: &Task, alternative: &Alternative, progress: u64) {
            self.steps.push((
                task.name().to_string(),
                alternative.name().to_string(),
                progress,
            ));
        }

        fn on_end_of_exploration(&mut self) {
            self.ends += 1;
        }
    }

    fn names(combo: Vec<&Alternative>) -> Vec<&str> {
        combo.into_iter().map(|a| a.name()).collect()
    }

    #[test]
    fn first_task_varies_fastest() {
        let log = Log::default();
        let explorer = mk_explorer(
            vec![("t0", vec!["a", "b"]), ("t1", vec!["x", "y", "z"])],
            &log,
        );
        let combos: Vec<Vec<&str>> = explorer.combinations().map(names).collect();
        assert_eq!(
            combos,
            vec![
                vec!["a", "x"],
                vec!["b", "x"],
                vec!["a", "y"],
                vec!["b", "y"],
                vec!["a", "z"],
                vec!["b", "z"],
            ]
        );

        let flat: Vec<&str> = explorer.enumerate(None).map(|(_, a)| a.name()).collect();
        assert_eq!(flat, vec!["a", "x", "b", "x", "a", "y", "b", "y", "a", "z", "b", "z"]);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn empty_task_empties_the_whole_space() {
        let log = Log::default();
        let explorer = mk_explorer(
            vec![("t0", vec!["a", "b"]), ("t1", vec![]), ("t2", vec!["x"])],
            &log,
        );
        assert_eq!(explorer.combinations().count(), 0);
        assert_eq!(explorer.space_size(), 0);

        let mut recorder = Recorder::default();
        assert_eq!(explorer.enumerate(Some(&mut recorder)).count(), 0);
        assert!(recorder.flows.is_empty());
        assert_eq!(recorder.ends, 0);

        explorer.explore(Some(&mut recorder));
        assert_eq!(recorder.sizes, vec![0]);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn reported_size_matches_an_independent_enumeration() {
        let log = Log::default();
        let explorer = mk_explorer(
            vec![
                ("t0", vec!["a", "b", "c"]),
                ("t1", vec!["x", "y"]),
                ("t2", vec!["p", "q"]),
            ],
            &log,
        );
        let mut recorder = Recorder::default();
        explorer.explore(Some(&mut recorder));
        assert_eq!(recorder.sizes, vec![explorer.combinations().count() as u64]);
        assert_eq!(recorder.sizes, vec![12]);
        assert_eq!(recorder.flows.len(), 12);
        assert_eq!(recorder.ends, 1);
    }

    #[test]
    fn progress_counts_every_yielded_alternative() {
        let log = Log::default();
        let explorer = mk_explorer(
            vec![("t0", vec!["a", "b"]), ("t1", vec!["x", "y", "z"])],
            &log,
        );
        let mut recorder = Recorder::default();
        explorer.explore(Some(&mut recorder));

        let progress: Vec<u64> = recorder.steps.iter().map(|s| s.2).collect();
        assert_eq!(progress, (0..12).collect::<Vec<u64>>());

        // Flows report the progress at which they begin
        let starts: Vec<u64> = recorder.flows.iter().map(|f| f.1).collect();
        assert_eq!(starts, vec![0, 2, 4, 6, 8, 10]);
        assert_eq!(recorder.flows[3].0, vec!["b", "y"]);
        assert_eq!(recorder.steps[3], ("t1".to_string(), "x".to_string(), 3));
    }

    #[test]
    fn actions_run_once_per_appearance() {
        let log = Log::default();
        let explorer = mk_explorer(
            vec![("t0", vec!["a", "b"]), ("t1", vec!["x", "y", "z"])],
            &log,
        );
        explorer.explore(None);

        let log = log.borrow();
        assert_eq!(log.len(), 12);
        assert_eq!(log.iter().filter(|s| *s == "a").count(), 3);
        assert_eq!(log.iter().filter(|s| *s == "x").count(), 2);
        assert_eq!(&log[..4], &["a", "x", "b", "x"]);
    }

    #[test]
    fn enumeration_can_be_restarted() {
        let log = Log::default();
        let explorer = mk_explorer(
            vec![("t0", vec!["a", "b"]), ("t1", vec!["x", "y"])],
            &log,
        );
        let first: Vec<&str> = explorer.enumerate(None).map(|(_, a)| a.name()).collect();
        let second: Vec<&str> = explorer.enumerate(None).map(|(_, a)| a.name()).collect();
        assert_eq!(first, second);

        // Dropping an enumeration part way through is fine too
        let partial: Vec<&str> = explorer.enumerate(None).take(3).map(|(_, a)| a.name()).collect();
        assert_eq!(partial, vec!["a", "x", "b"]);
    }

    #[test]
    fn oversized_spaces_still_display() {
        let mut explorer = Explorer::new();
        for i in 0..64 {
            let task = explorer.add_task(&format!("t{}", i));
            task.add_alternative("a", || {});
            task.add_alternative("b", || {});
        }
        assert_eq!(explorer.space_size(), u64::MAX);
        assert!(explorer.to_string().contains("space_size: 18446744073709551615"));
    }

    #[test]
    fn no_tasks_is_a_single_empty_combination() {
        let explorer = Explorer::new();
        let mut recorder = Recorder::default();
        explorer.explore(Some(&mut recorder));
        assert_eq!(recorder.sizes, vec![1]);
        assert_eq!(recorder.flows, vec![(Vec::<String>::new(), 0)]);
        assert!(recorder.steps.is_empty());
        assert_eq!(recorder.ends, 1);
    }
}
