use clap::Parser;
use hls_bind::{
    logger, Alternative, ExplorationObserver, Explorer, Host, InstrSpec,
    LogObserver, MapperCatalog, MapperRegistry, Mapping, Project, ResourceKind,
    SessionConfig, SignalSink, SignalSource, SiteId, Task, Timing,
};
use log::{debug, info, warn};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::error::Error;
use std::rc::Rc;

/// Binds the instructions of a session to functional units, and explores every
/// combination of the binding decisions that could not be made up front. For
/// example, to bind the instructions of a session file, and to show each of
/// the design points visited:
///  ./hls-bind --config=session.yaml -vv
///
/// Note: without a session file the built-in demonstration session is used.
///
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// YAML session file
    #[arg(short, long, value_name = "FILE")]
    config: Option<String>,

    /// Log filter, e.g. 'debug' or 'hls_bind::dse=trace' (default: info)
    #[arg(short, long, value_name = "LEVEL")]
    log_level: Option<String>,

    /// Directory for the session log, overriding the session file
    #[arg(long, value_name = "DIR")]
    log_dir: Option<String>,

    /// Take the first candidate of every decision, instead of exploring
    #[arg(short, long, default_value = "false")]
    no_explore: bool,

    /// Print the design space; given twice, also print the registered
    /// mappers and the realized steps of every bound instruction
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// A unit that an instruction may end up on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Unit {
    Site(SiteId),
    Fresh(usize),
}

#[derive(Debug, Clone, Copy)]
struct Choice {
    unit: Unit,
    timing: Timing,
}

/// A pending decision: either share an existing site, or replicate the unit.
enum Candidate {
    Share(Mapping),
    Fresh(Timing),
}

struct Pending {
    index: usize,
    spec: InstrSpec,
    candidates: Vec<Candidate>,
}

#[derive(Default)]
struct Plan {
    bound: Vec<(usize, Mapping)>,
    pending: Vec<Pending>,
}

/// Ordered so that the least-occupied, and then the smallest, design wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Score {
    occupancy: usize,
    area: usize,
    latency: usize,
}

/// The binding that the committed alternatives currently describe.
#[derive(Debug, Default)]
struct Design {
    fixed: Vec<Choice>,
    slots: Vec<Option<(usize, Choice)>>,
}

impl Design {
    fn selection(&self) -> Option<Vec<usize>> {
        self.slots.iter().map(|s| s.map(|(k, _)| k)).collect()
    }

    /**
     * Area is the number of distinct units. Occupancy is how many cycles the
     * busiest unit is locked for, which bounds the length of any schedule.
     */
    fn score(&self) -> Score {
        let choices = self
            .fixed
            .iter()
            .chain(self.slots.iter().flatten().map(|(_, c)| c));
        let mut locked: BTreeMap<Unit, usize> = BTreeMap::new();
        let mut latency = 0;
        for choice in choices {
            *locked.entry(choice.unit).or_insert(0) +=
                choice.timing.initiation_interval;
            latency += choice.timing.latency;
        }
        Score {
            occupancy: locked.values().copied().max().unwrap_or(0),
            area: locked.len(),
            latency,
        }
    }
}

/// Scores every combination once all of its alternatives have been committed.
struct Scorer {
    design: Rc<RefCell<Design>>,
    log: LogObserver,
    started: bool,
    results: Vec<(Vec<usize>, Score)>,
}

impl Scorer {
    fn new(design: Rc<RefCell<Design>>) -> Self {
        Self {
            design,
            log: LogObserver::new(),
            started: false,
            results: Vec::new(),
        }
    }

    fn evaluate(&mut self) {
        let design = self.design.borrow();
        if let Some(selection) = design.selection() {
            let score = design.score();
            debug!("design {:?}: {:?}", selection, score);
            self.results.push((selection, score));
        }
    }

    fn best(&self) -> Option<&(Vec<usize>, Score)> {
        self.results.iter().min_by_key(|(_, score)| *score)
    }
}

impl ExplorationObserver for Scorer {
    fn notify_space_size(&mut self, total: u64) {
        self.log.notify_space_size(total);
    }

    fn on_begin_flow(&mut self, alternatives: &[&Alternative], progress: u64) {
        if self.started {
            self.evaluate();
        }
        self.started = true;
        self.log.on_begin_flow(alternatives, progress);
    }

    fn on_begin_task(
        &mut self,
        task: &Task,
        alternative: &Alternative,
        progress: u64,
    ) {
        self.log.on_begin_task(task, alternative, progress);
    }

    fn on_end_of_exploration(&mut self) {
        self.evaluate();
        self.log.on_end_of_exploration();
    }
}

/// Binds what can be bound right away, and collects the open decisions.
fn plan(
    session: &SessionConfig,
    catalog: &MapperCatalog,
    host: &mut Host,
    project: &mut Project,
) -> Result<Plan, Box<dyn Error>> {
    let mut plan = Plan::default();

    for (index, spec) in session.instructions.iter().enumerate() {
        let instr = spec.instruction();
        let (ots, rts) = (spec.operands.as_slice(), spec.results.as_slice());
        let mut shared = catalog.candidates(host, &instr, ots, rts);
        let kind = shared.first().map(|m| m.resource_kind());

        match kind {
            None | Some(ResourceKind::Lightweight) => {
                let mapping = catalog
                    .try_allocate(host, &instr, ots, rts, project)
                    .ok_or_else(|| format!("no mapper can bind '{}'", spec))?;
                plan.bound.push((index, mapping));
            }
            Some(ResourceKind::Exclusive) if shared.len() == 1 => {
                let mapping = shared.remove(0);
                mapping.site().bind(&instr)?;
                plan.bound.push((index, mapping));
            }
            Some(kind) => {
                let mut candidates: Vec<Candidate> =
                    shared.into_iter().map(Candidate::Share).collect();
                if kind == ResourceKind::Replicatable {
                    // Timing of a replica, from a throw-away allocation
                    let mut scratch = Host::new("scratch");
                    let mut scratch_project = Project::new("scratch");
                    if let Some(m) = catalog.try_allocate(
                        &mut scratch,
                        &instr,
                        ots,
                        rts,
                        &mut scratch_project,
                    ) {
                        candidates.push(Candidate::Fresh(m.timing()));
                    }
                }
                plan.pending.push(Pending {
                    index,
                    spec: spec.clone(),
                    candidates,
                });
            }
        }
    }

    info!(
        "{} instruction(s) bound, {} decision(s) pending",
        plan.bound.len(),
        plan.pending.len()
    );
    Ok(plan)
}

/// One task per pending decision, whose alternatives update the shared design.
fn build_explorer(plan: &Plan, design: &Rc<RefCell<Design>>) -> Explorer {
    {
        let mut d = design.borrow_mut();
        d.fixed = plan
            .bound
            .iter()
            .map(|(_, m)| Choice {
                unit: Unit::Site(m.site().id()),
                timing: m.timing(),
            })
            .collect();
        d.slots = vec![None; plan.pending.len()];
    }

    let mut explorer = Explorer::new();
    for (slot, pending) in plan.pending.iter().enumerate() {
        let task = explorer.add_task(&format!("#{} {}", pending.index, pending.spec));
        for (k, candidate) in pending.candidates.iter().enumerate() {
            let (name, choice) = match candidate {
                Candidate::Share(m) => (
                    format!("share {}", m.site().name()),
                    Choice {
                        unit: Unit::Site(m.site().id()),
                        timing: m.timing(),
                    },
                ),
                Candidate::Fresh(timing) => (
                    "replicate".to_string(),
                    Choice {
                        unit: Unit::Fresh(slot),
                        timing: *timing,
                    },
                ),
            };
            let design = design.clone();
            task.add_alternative(&name, move || {
                design.borrow_mut().slots[slot] = Some((k, choice));
            });
        }
    }
    explorer
}

/// Applies the selected alternatives to the real host.
fn commit(
    plan: Plan,
    selection: &[usize],
    catalog: &MapperCatalog,
    host: &mut Host,
    project: &mut Project,
    session: &SessionConfig,
) -> Result<Vec<(usize, Mapping)>, Box<dyn Error>> {
    let mut bound = plan.bound;
    for (pending, &k) in plan.pending.into_iter().zip(selection) {
        let instr = pending.spec.instruction();
        let mapping = match pending.candidates.into_iter().nth(k) {
            Some(Candidate::Share(mapping)) => {
                mapping.site().bind(&instr)?;
                mapping
            }
            Some(Candidate::Fresh(_)) => catalog
                .try_allocate(
                    host,
                    &instr,
                    &pending.spec.operands,
                    &pending.spec.results,
                    project,
                )
                .ok_or_else(|| format!("cannot replicate for '{}'", pending.spec))?,
            None => return Err(format!("no alternative {} for '{}'", k, pending.spec).into()),
        };
        bound.push((pending.index, mapping));
    }
    bound.sort_by_key(|(index, _)| *index);
    debug_assert_eq!(bound.len(), session.instructions.len());
    Ok(bound)
}

/// Wires every bound instruction to named signals, and lists its steps.
fn report(
    bound: &[(usize, Mapping)],
    session: &SessionConfig,
    verbose: bool,
) -> Result<String, Box<dyn Error>> {
    let mut result = Vec::new();
    for (index, mapping) in bound {
        let spec = &session.instructions[*index];
        result.push(format!("#{} {}\n  => {}", index, spec, mapping));
        if !verbose {
            continue;
        }
        let operands: Vec<SignalSource> = (0..spec.operands.len())
            .map(|k| SignalSource::signal(&format!("i{}_op{}", index, k)))
            .collect();
        let results: Vec<SignalSink> = (0..spec.results.len())
            .map(|k| SignalSink::signal(&format!("i{}_res{}", index, k)))
            .collect();
        for (step, action) in mapping.realize(&operands, &results)?.iter().enumerate() {
            result.push(format!("    c{}: {}", step, action));
        }
    }
    Ok(result.join("\n"))
}

/**
 * Main entry-point into the binding & exploration procedure.
 */
fn main() -> Result<(), Box<dyn Error>> {
    println!("HLS Resource Binder\n");
    let args: Args = Args::parse();
    let level: String = args.log_level.unwrap_or("info".to_string());

    let mut session = match &args.config {
        Some(path) => SessionConfig::load(path)?,
        None => SessionConfig::demo()?,
    };
    if let Some(dir) = args.log_dir {
        session.log.directory = dir;
    }
    logger::configure(
        level.as_str(),
        args.verbose > 0,
        &session.project,
        &session.log,
    )?;
    let registry = MapperRegistry::with_units(&session.units);
    if args.verbose > 1 {
        println!("{}", registry);
    }
    let catalog = registry.instantiate();

    let mut host = Host::new(&session.host);
    let mut project = Project::new(&session.project);
    let plan = plan(&session, &catalog, &mut host, &mut project)?;

    let design = Rc::new(RefCell::new(Design::default()));
    let explorer = build_explorer(&plan, &design);
    if args.verbose > 0 {
        println!("{}", explorer);
    }

    let selection = if args.no_explore {
        vec![0; plan.pending.len()]
    } else {
        let mut scorer = Scorer::new(design.clone());
        explorer.explore(Some(&mut scorer));
        println!("Explored {} design(s):", scorer.log.flows());
        for (selection, score) in scorer.results.iter() {
            println!("  {:?}: {:?}", selection, score);
        }
        match scorer.best() {
            Some((selection, score)) => {
                println!("Selected {:?}: {:?}\n", selection, score);
                selection.clone()
            }
            None => {
                warn!("nothing to explore, taking the first candidates");
                vec![0; plan.pending.len()]
            }
        }
    };

    let bound = commit(plan, &selection, &catalog, &mut host, &mut project, &session)?;
    println!("{}", host);
    println!("{}", report(&bound, &session, args.verbose > 1)?);

    let unused: Vec<&str> = host
        .sites()
        .iter()
        .filter(|s| s.bindings() == 0)
        .map(|s| s.name())
        .collect();
    if !unused.is_empty() {
        warn!("unused sites: {:?}", unused);
    }
    Ok(())
}
