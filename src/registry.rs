use crate::config::UnitSettings;
use crate::instr::{DataType, Instruction, Opcode};
use crate::mapper::Mapper;
use crate::mapping::Mapping;
use crate::site::{Host, Project, SiteRef};
use crate::units::{AluMapper, ConstLoaderMapper, MemoryMapper, NopMapper};
use log::{debug, trace};
use std::collections::BTreeMap;
use std::fmt;

pub type MapperFactory = Box<dyn Fn() -> Box<dyn Mapper>>;

/**
 * Explicit registry of mapper factories, keyed by the opcodes that each
 * mapper declares. Registration order is preserved per opcode, and is the
 * order in which the mappers are later consulted.
 */
#[derive(Default)]
pub struct MapperRegistry {
    factories: Vec<(&'static str, MapperFactory)>,
    lookup: BTreeMap<Opcode, Vec<usize>>,
}

impl MapperRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry populated with the built-in units enabled in 'settings'.
    pub fn with_units(settings: &UnitSettings) -> Self {
        let mut registry = Self::new();
        if settings.nop {
            registry.register(|| Box::new(NopMapper));
        }
        if settings.constants {
            registry.register(|| Box::new(ConstLoaderMapper));
        }
        if settings.alu {
            let alu = AluMapper::new(settings.mul_stages, settings.div_cycles);
            registry.register(move || Box::new(alu));
        }
        if settings.memory {
            registry.register(|| Box::new(MemoryMapper));
        }
        registry
    }

    pub fn register<F>(&mut self, factory: F) -> &mut Self
    where
        F: Fn() -> Box<dyn Mapper> + 'static,
    {
        let probe = factory();
        let index = self.factories.len();
        for &opcode in probe.supported_instructions() {
            let entry = self.lookup.entry(opcode).or_default();
            if !entry.contains(&index) {
                entry.push(index);
            }
        }
        debug!(
            "registered mapper '{}' for {:?}",
            probe.name(),
            probe.supported_instructions()
        );
        self.factories.push((probe.name(), Box::new(factory)));
        self
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Names of the mappers registered for 'opcode', in consultation order.
    pub fn mappers_for(&self, opcode: Opcode) -> Vec<&'static str> {
        self.lookup
            .get(&opcode)
            .map(|ixs| ixs.iter().map(|&i| self.factories[i].0).collect())
            .unwrap_or_default()
    }

    /// Creates the mapper instances for one synthesis session.
    pub fn instantiate(&self) -> MapperCatalog {
        MapperCatalog {
            mappers: self.factories.iter().map(|(_, f)| f()).collect(),
            lookup: self.lookup.clone(),
        }
    }
}

impl fmt::Display for MapperRegistry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "MapperRegistry {{")?;
        for (opcode, ixs) in self.lookup.iter() {
            let names: Vec<&str> = ixs.iter().map(|&i| self.factories[i].0).collect();
            writeln!(f, "    {}: {:?}", opcode, names)?;
        }
        writeln!(f, "}}")
    }
}

/**
 * The mapper instances of one synthesis session. Mappers are only ever asked
 * about opcodes that they declared when they were registered.
 */
pub struct MapperCatalog {
    mappers: Vec<Box<dyn Mapper>>,
    lookup: BTreeMap<Opcode, Vec<usize>>,
}

impl MapperCatalog {
    pub fn lookup(&self, opcode: Opcode) -> impl Iterator<Item = &dyn Mapper> + '_ {
        self.lookup
            .get(&opcode)
            .into_iter()
            .flatten()
            .map(move |&i| self.mappers[i].as_ref())
    }

    pub fn supported_instructions(&self) -> Vec<Opcode> {
        self.lookup.keys().copied().collect()
    }

    /// Candidates from every mapper of the opcode, in registration order.
    pub fn try_map(
        &self,
        site: &SiteRef,
        instr: &Instruction,
        operand_types: &[DataType],
        result_types: &[DataType],
    ) -> Vec<Mapping> {
        let mut mappings = Vec::new();
        for mapper in self.lookup(instr.opcode()) {
            let found = mapper.try_map(site, instr, operand_types, result_types);
            trace!(
                "{}: {} candidate(s) for '{}' on '{}'",
                mapper.name(),
                found.len(),
                instr,
                site.name()
            );
            mappings.extend(found);
        }
        mappings
    }

    /// Allocates with the first mapper that supports the instruction.
    pub fn try_allocate(
        &self,
        host: &mut Host,
        instr: &Instruction,
        operand_types: &[DataType],
        result_types: &[DataType],
        project: &mut Project,
    ) -> Option<Mapping> {
        for mapper in self.lookup(instr.opcode()) {
            if let Some(mapping) = mapper.try_allocate(
                host,
                instr,
                operand_types,
                result_types,
                project,
            ) {
                debug!("{}: allocated {}", mapper.name(), mapping);
                return Some(mapping);
            }
        }
        debug!("no mapper can allocate '{}' for {:?}", instr, operand_types);
        None
    }

    /// Reuse candidates across all the sites of 'host'.
    pub fn candidates(
        &self,
        host: &Host,
        instr: &Instruction,
        operand_types: &[DataType],
        result_types: &[DataType],
    ) -> Vec<Mapping> {
        host.sites()
            .iter()
            .flat_map(|site| self.try_map(site, instr, operand_types, result_types))
            .collect()
    }
}
