use crate::error::BindError;
use crate::instr::Instruction;
use crate::mapping::ResourceKind;
use crate::verb::{Action, TimedAction, TimingMode};
use log::debug;
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SiteId(pub usize);

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "${}", self.0)
    }
}

/// Everything a mapper has to decide when it instantiates a new unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteSpec {
    pub class: &'static str,
    pub kind: ResourceKind,
    pub width: u32,
    pub tag: Option<String>,
}

/**
 * A transaction site is one concrete functional-unit instance, hosted by a
 * component. Mappers recognise their own sites by the unit 'class', and use
 * the 'width' & 'tag' to decide whether a site can serve an instruction (e.g.
 * the value of a constant loader, or the name of the memory behind a port).
 *
 * Exclusive sites remember the first instruction that was bound to them, and
 * refuse to be shared with any other instruction.
 */
#[derive(Debug)]
pub struct TransactionSite {
    id: SiteId,
    name: String,
    host: String,
    class: &'static str,
    kind: ResourceKind,
    width: u32,
    tag: Option<String>,

    bound: RefCell<Option<Instruction>>,
    bindings: Cell<usize>,
}

pub type SiteRef = Rc<TransactionSite>;

impl TransactionSite {
    fn new(id: SiteId, name: String, host: String, spec: SiteSpec) -> Self {
        Self {
            id,
            name,
            host,
            class: spec.class,
            kind: spec.kind,
            width: spec.width,
            tag: spec.tag,
            bound: RefCell::new(None),
            bindings: Cell::new(0),
        }
    }

    // -- PUBLIC QUERY FUNCTIONS -- //

    pub fn id(&self) -> SiteId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn class(&self) -> &'static str {
        self.class
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    pub fn bound_instruction(&self) -> Option<Instruction> {
        self.bound.borrow().clone()
    }

    pub fn bindings(&self) -> usize {
        self.bindings.get()
    }

    /// True if this site is exclusive, and is owned by some other instruction.
    pub fn is_bound_elsewhere(&self, instr: &Instruction) -> bool {
        if self.kind != ResourceKind::Exclusive {
            return false;
        }
        match &*self.bound.borrow() {
            Some(owner) => owner != instr,
            None => false,
        }
    }

    // -- VERB CONSTRUCTION -- //

    pub fn verb(&self, mode: TimingMode, action: Action) -> TimedAction {
        TimedAction {
            site: self.id,
            mode,
            action,
        }
    }

    /// The step a site performs while nothing is issued to it.
    pub fn do_nothing(&self) -> Vec<TimedAction> {
        vec![self.verb(TimingMode::Locked, Action::idle())]
    }

    // -- PUBLIC MODIFIER FUNCTIONS -- //

    pub fn bind(&self, instr: &Instruction) -> Result<(), BindError> {
        if self.kind == ResourceKind::Exclusive {
            match self.bound_instruction() {
                Some(owner) if &owner != instr => {
                    return Err(BindError::AlreadyBound {
                        site: self.name.clone(),
                        bound: owner,
                        requested: instr.clone(),
                    });
                }
                Some(_) => {}
                None => *self.bound.borrow_mut() = Some(instr.clone()),
            }
        }
        self.bindings.set(self.bindings.get() + 1);
        debug!("bound '{}' to site '{}'", instr, self.name);
        Ok(())
    }
}

impl fmt::Display for TransactionSite {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} '{}' ({}, {:?}, {} bits",
            self.id, self.name, self.class, self.kind, self.width
        )?;
        if let Some(tag) = &self.tag {
            write!(f, ", {}", tag)?;
        }
        write!(f, ", bindings: {})", self.bindings.get())
    }
}

/**
 * Target context of a synthesis session. Hands out unique instance names, and
 * keeps a record of every unit that was allocated during the session.
 */
#[derive(Debug, Clone, Default)]
pub struct Project {
    name: String,
    counters: BTreeMap<&'static str, usize>,
    allocations: Vec<(SiteId, String)>,
}

impl Project {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn instance_name(&mut self, class: &'static str) -> String {
        let count = self.counters.entry(class).or_insert(0);
        let name = format!("{}_{}", class, count);
        *count += 1;
        name
    }

    pub fn record_allocation(&mut self, site: &TransactionSite) {
        self.allocations.push((site.id(), site.name().to_string()));
    }

    pub fn allocations(&self) -> &[(SiteId, String)] {
        &self.allocations
    }
}

/**
 * The component that hosts all functional units created during a session.
 */
#[derive(Debug, Clone, Default)]
pub struct Host {
    name: String,
    sites: Vec<SiteRef>,
}

impl Host {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            sites: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sites(&self) -> &[SiteRef] {
        &self.sites
    }

    pub fn sites_of<'a>(
        &'a self,
        class: &'a str,
    ) -> impl Iterator<Item = &'a SiteRef> + 'a {
        self.sites.iter().filter(move |s| s.class() == class)
    }

    pub fn instantiate(
        &mut self,
        project: &mut Project,
        spec: SiteSpec,
    ) -> SiteRef {
        let id = SiteId(self.sites.len());
        let name = project.instance_name(spec.class);
        let site = Rc::new(TransactionSite::new(
            id,
            name,
            self.name.clone(),
            spec,
        ));
        project.record_allocation(&site);
        debug!("{}: allocated {}", self.name, site);
        self.sites.push(site.clone());
        site
    }
}

impl fmt::Display for Host {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Host '{}' {{", self.name)?;
        for site in self.sites.iter() {
            writeln!(f, "    {}", site)?;
        }
        writeln!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instr::{Opcode, Operand};

    fn spec(kind: ResourceKind) -> SiteSpec {
        SiteSpec {
            class: "mem",
            kind,
            width: 16,
            tag: Some("ram".to_string()),
        }
    }

    #[test]
    fn instance_names_are_unique_per_class() {
        let mut project = Project::new("p");
        let mut host = Host::new("top");
        let a = host.instantiate(&mut project, spec(ResourceKind::Exclusive));
        let b = host.instantiate(&mut project, spec(ResourceKind::Exclusive));
        assert_eq!(a.name(), "mem_0");
        assert_eq!(b.name(), "mem_1");
        assert_eq!(a.id(), SiteId(0));
        assert_eq!(b.id(), SiteId(1));
        assert_eq!(project.allocations().len(), 2);
        assert_eq!(host.sites_of("mem").count(), 2);
        assert_eq!(host.sites_of("alu").count(), 0);
    }

    #[test]
    fn exclusive_site_refuses_a_second_instruction() {
        let mut project = Project::new("p");
        let mut host = Host::new("top");
        let site = host.instantiate(&mut project, spec(ResourceKind::Exclusive));

        let rd = Instruction::with_operand(
            Opcode::RdMem,
            Operand::Memory("ram".to_string()),
        );
        let wr = Instruction::with_operand(
            Opcode::WrMem,
            Operand::Memory("ram".to_string()),
        );

        assert!(!site.is_bound_elsewhere(&wr));
        site.bind(&rd).unwrap();
        site.bind(&rd).unwrap();
        assert_eq!(site.bindings(), 2);
        assert!(site.is_bound_elsewhere(&wr));
        assert!(!site.is_bound_elsewhere(&rd));
        assert!(matches!(
            site.bind(&wr),
            Err(BindError::AlreadyBound { .. })
        ));
        assert_eq!(site.bound_instruction(), Some(rd));
    }

    #[test]
    fn shared_sites_accept_anything() {
        let mut project = Project::new("p");
        let mut host = Host::new("top");
        let site =
            host.instantiate(&mut project, spec(ResourceKind::Replicatable));
        site.bind(&Instruction::new(Opcode::Add)).unwrap();
        site.bind(&Instruction::new(Opcode::Sub)).unwrap();
        assert!(!site.is_bound_elsewhere(&Instruction::new(Opcode::Mul)));
        assert_eq!(site.bound_instruction(), None);
        assert_eq!(site.do_nothing().len(), 1);
        assert!(site.do_nothing()[0].is_locked());
    }
}
