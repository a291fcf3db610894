use crate::instr::{DataType, Instruction, Opcode};
use crate::mapper::Mapper;
use crate::mapping::{Mapping, Realize, ResourceKind};
use crate::signal::{SignalSink, SignalSource};
use crate::site::{Host, Project, SiteRef, SiteSpec, TransactionSite};
use crate::verb::{Action, TimedAction, TimingMode};
use log::debug;

pub const MEM_CLASS: &str = "mem";

const SUPPORTED: [Opcode; 2] = [Opcode::RdMem, Opcode::WrMem];

/**
 * Synchronous block-memory ports. A port is an exclusive resource: once it
 * has been bound to an access it cannot serve a different one.
 */
#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryMapper;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Port {
    Read,
    Write,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct MemoryAccess {
    port: Port,
    memory: String,
    width: u32,
}

impl Realize for MemoryAccess {
    fn description(&self) -> String {
        match self.port {
            Port::Read => format!("read port of '{}'", self.memory),
            Port::Write => format!("write port of '{}'", self.memory),
        }
    }

    fn arity(&self) -> (usize, usize) {
        match self.port {
            Port::Read => (1, 1),
            Port::Write => (2, 0),
        }
    }

    fn realize(
        &self,
        site: &TransactionSite,
        operands: &[SignalSource],
        results: &[SignalSink],
    ) -> Vec<TimedAction> {
        match self.port {
            // Registered output, so the data shows up one cycle later
            Port::Read => vec![
                site.verb(
                    TimingMode::Locked,
                    Action::idle().drive("addr", operands[0].clone()),
                ),
                site.verb(
                    TimingMode::Unlocked,
                    Action::idle().collect("dout", results[0].clone()),
                ),
            ],
            Port::Write => vec![site.verb(
                TimingMode::Locked,
                Action::idle()
                    .drive("addr", operands[0].clone())
                    .drive("din", operands[1].clone())
                    .drive("we", SignalSource::constant(1, 1)),
            )],
        }
    }
}

impl MemoryMapper {
    fn plan(
        &self,
        instr: &Instruction,
        operand_types: &[DataType],
        result_types: &[DataType],
    ) -> Option<MemoryAccess> {
        let memory = instr.memory()?.to_string();
        let address_ok = |t: &DataType| {
            matches!(t, DataType::Unsigned(_) | DataType::Logic(_))
        };

        match instr.opcode() {
            Opcode::RdMem => {
                if operand_types.len() != 1 || result_types.len() != 1 {
                    return None;
                }
                if !address_ok(&operand_types[0]) {
                    return None;
                }
                Some(MemoryAccess {
                    port: Port::Read,
                    memory,
                    width: result_types[0].width(),
                })
            }
            Opcode::WrMem => {
                if operand_types.len() != 2 || !result_types.is_empty() {
                    return None;
                }
                if !address_ok(&operand_types[0]) {
                    return None;
                }
                Some(MemoryAccess {
                    port: Port::Write,
                    memory,
                    width: operand_types[1].width(),
                })
            }
            _ => None,
        }
    }
}

impl Mapper for MemoryMapper {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn supported_instructions(&self) -> &[Opcode] {
        &SUPPORTED
    }

    fn try_map(
        &self,
        site: &SiteRef,
        instr: &Instruction,
        operand_types: &[DataType],
        result_types: &[DataType],
    ) -> Vec<Mapping> {
        if site.class() != MEM_CLASS || !self.supports(instr.opcode()) {
            return Vec::new();
        }
        if site.is_bound_elsewhere(instr) {
            debug!("memory: port '{}' is taken, refusing '{}'", site.name(), instr);
            return Vec::new();
        }
        let Some(access) = self.plan(instr, operand_types, result_types) else {
            return Vec::new();
        };
        if site.tag() != Some(access.memory.as_str())
            || site.width() != access.width
        {
            return Vec::new();
        }
        vec![Mapping::new(site.clone(), ResourceKind::Exclusive, access)]
    }

    fn try_allocate(
        &self,
        host: &mut Host,
        instr: &Instruction,
        operand_types: &[DataType],
        result_types: &[DataType],
        project: &mut Project,
    ) -> Option<Mapping> {
        if !self.supports(instr.opcode()) {
            return None;
        }
        let access = self.plan(instr, operand_types, result_types)?;
        let site = host.instantiate(
            project,
            SiteSpec {
                class: MEM_CLASS,
                kind: ResourceKind::Exclusive,
                width: access.width,
                tag: Some(access.memory.clone()),
            },
        );
        site.bind(instr).ok()?;
        Some(Mapping::new(site, ResourceKind::Exclusive, access))
    }
}
