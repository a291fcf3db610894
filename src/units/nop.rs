use crate::instr::{DataType, Instruction, Opcode};
use crate::mapper::Mapper;
use crate::mapping::{Mapping, Realize, ResourceKind};
use crate::signal::{SignalSink, SignalSource};
use crate::site::{Host, Project, SiteRef, SiteSpec, TransactionSite};
use crate::verb::{Action, TimedAction, TimingMode};

pub const NOP_CLASS: &str = "nop";

const SUPPORTED: [Opcode; 3] = [Opcode::Nop, Opcode::Barrier, Opcode::Convert];

/// Delays, barriers, and conversions that do not change the wire format.
#[derive(Debug, Clone, Copy, Default)]
pub struct NopMapper;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NopRealizer {
    Delay { cycles: usize },
    Identity { from: DataType, to: DataType },
}

impl Realize for NopRealizer {
    fn description(&self) -> String {
        match self {
            NopRealizer::Delay { cycles } => {
                format!("no operation ({} cycles)", cycles)
            }
            NopRealizer::Identity { from, to } => {
                format!("identity ({} -> {})", from, to)
            }
        }
    }

    fn arity(&self) -> (usize, usize) {
        match self {
            NopRealizer::Delay { .. } => (0, 0),
            NopRealizer::Identity { .. } => (1, 1),
        }
    }

    fn realize(
        &self,
        site: &TransactionSite,
        operands: &[SignalSource],
        results: &[SignalSink],
    ) -> Vec<TimedAction> {
        match self {
            NopRealizer::Delay { cycles } => (0..=*cycles)
                .map(|_| site.verb(TimingMode::Unlocked, Action::idle()))
                .collect(),
            NopRealizer::Identity { .. } => {
                let action = Action::idle()
                    .drive("i", operands[0].clone())
                    .collect("o", results[0].clone());
                vec![site.verb(TimingMode::Unlocked, action)]
            }
        }
    }
}

impl NopMapper {
    fn plan(
        &self,
        instr: &Instruction,
        operand_types: &[DataType],
        result_types: &[DataType],
    ) -> Option<NopRealizer> {
        match instr.opcode() {
            Opcode::Nop | Opcode::Barrier => Some(NopRealizer::Delay {
                cycles: instr.cycles().unwrap_or(0),
            }),
            Opcode::Convert => {
                if operand_types.len() != 1 || result_types.len() != 1 {
                    return None;
                }
                let (from, to) = (operand_types[0], result_types[0]);

                // Only a re-interpretation of the same wires is free
                if from == to || from.width() != to.width() {
                    return None;
                }
                Some(NopRealizer::Identity { from, to })
            }
            _ => None,
        }
    }
}

impl Mapper for NopMapper {
    fn name(&self) -> &'static str {
        "nop"
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
        if site.class() != NOP_CLASS || !self.supports(instr.opcode()) {
            return Vec::new();
        }
        self.plan(instr, operand_types, result_types)
            .map(|r| Mapping::new(site.clone(), ResourceKind::Replicatable, r))
            .into_iter()
            .collect()
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
        let realizer = self.plan(instr, operand_types, result_types)?;
        let site = host.instantiate(
            project,
            SiteSpec {
                class: NOP_CLASS,
                kind: ResourceKind::Replicatable,
                width: 0,
                tag: None,
            },
        );
        site.bind(instr).ok()?;
        Some(Mapping::new(site, ResourceKind::Replicatable, realizer))
    }
}
