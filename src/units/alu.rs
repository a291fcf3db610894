use crate::instr::{DataType, Instruction, Opcode};
use crate::mapper::Mapper;
use crate::mapping::{Mapping, Realize, ResourceKind};
use crate::signal::{SignalSink, SignalSource};
use crate::site::{Host, Project, SiteRef, SiteSpec, TransactionSite};
use crate::verb::{Action, TimedAction, TimingMode};
use log::trace;

pub const ALU_CLASS: &str = "alu";

const SUPPORTED: [Opcode; 9] = [
    Opcode::Add,
    Opcode::Sub,
    Opcode::And,
    Opcode::Or,
    Opcode::Xor,
    Opcode::Not,
    Opcode::Neg,
    Opcode::Mul,
    Opcode::Div,
];

const PORTS: [&str; 2] = ["a", "b"];

/**
 * Integer arithmetic & logic units. Each site implements one family of
 * operations at one fixed width:
 *  - addsub: add, sub, neg (combinational, with an operation select);
 *  - logic: and, or, xor, not (combinational);
 *  - mul: pipelined, accepting a new issue every cycle;
 *  - div: iterative, so locked for the whole computation.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AluMapper {
    mul_stages: usize,
    div_cycles: usize,
}

impl Default for AluMapper {
    fn default() -> Self {
        Self::new(2, 8)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Family {
    AddSub,
    Logic,
    Mul,
    Div,
}

impl Family {
    fn of(opcode: Opcode) -> Option<Self> {
        match opcode {
            Opcode::Add | Opcode::Sub | Opcode::Neg => Some(Family::AddSub),
            Opcode::And | Opcode::Or | Opcode::Xor | Opcode::Not => {
                Some(Family::Logic)
            }
            Opcode::Mul => Some(Family::Mul),
            Opcode::Div => Some(Family::Div),
            _ => None,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Family::AddSub => "addsub",
            Family::Logic => "logic",
            Family::Mul => "mul",
            Family::Div => "div",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct AluOp {
    opcode: Opcode,
    family: Family,
    width: u32,
    arity: usize,
    cycles: usize,
}

impl AluOp {
    fn issue(&self, operands: &[SignalSource]) -> Action {
        let mut action = Action::idle();
        if self.opcode == Opcode::Neg {
            // neg(x) = 0 - x
            action = action
                .drive("a", SignalSource::constant(0, self.width))
                .drive("b", operands[0].clone());
        } else {
            for (port, source) in PORTS.iter().zip(operands.iter()) {
                action = action.drive(*port, source.clone());
            }
        }
        if self.family == Family::AddSub {
            let sub = i64::from(self.opcode != Opcode::Add);
            action = action.drive("sub", SignalSource::constant(sub, 1));
        }
        action
    }
}

impl Realize for AluOp {
    fn description(&self) -> String {
        match self.family {
            Family::Mul => format!(
                "{} ({} bits, {}-stage pipeline)",
                self.opcode, self.width, self.cycles
            ),
            Family::Div => format!(
                "{} ({} bits, {} cycles)",
                self.opcode, self.width, self.cycles
            ),
            _ => format!("{} ({} bits)", self.opcode, self.width),
        }
    }

    fn arity(&self) -> (usize, usize) {
        (self.arity, 1)
    }

    fn realize(
        &self,
        site: &TransactionSite,
        operands: &[SignalSource],
        results: &[SignalSink],
    ) -> Vec<TimedAction> {
        use TimingMode::{Locked, Unlocked};

        let issue = self.issue(operands);
        let result = results[0].clone();

        match self.family {
            Family::Mul if self.cycles > 0 => {
                let mut actions = vec![site.verb(Locked, issue)];
                for _ in 1..self.cycles {
                    actions.push(site.verb(Unlocked, Action::idle()));
                }
                actions.push(
                    site.verb(Unlocked, Action::idle().collect("r", result)),
                );
                actions
            }
            Family::Div => {
                let mut actions = vec![site.verb(Locked, issue)];
                for _ in 1..self.cycles {
                    actions.push(site.verb(Locked, Action::idle()));
                }
                actions.push(
                    site.verb(Locked, Action::idle().collect("r", result)),
                );
                actions
            }
            _ => vec![site.verb(Locked, issue.collect("r", result))],
        }
    }
}

impl AluMapper {
    /// The divider always needs at least one cycle.
    pub fn new(mul_stages: usize, div_cycles: usize) -> Self {
        Self {
            mul_stages,
            div_cycles: div_cycles.max(1),
        }
    }

    pub fn mul_stages(&self) -> usize {
        self.mul_stages
    }

    pub fn div_cycles(&self) -> usize {
        self.div_cycles
    }

    fn plan(
        &self,
        instr: &Instruction,
        operand_types: &[DataType],
        result_types: &[DataType],
    ) -> Option<AluOp> {
        let opcode = instr.opcode();
        let family = Family::of(opcode)?;
        let arity = match opcode {
            Opcode::Not | Opcode::Neg => 1,
            _ => 2,
        };
        if operand_types.len() != arity || result_types.len() != 1 {
            return None;
        }

        let result = result_types[0];
        let width = result.width();
        if operand_types.iter().any(|t| t.width() != width) {
            return None;
        }

        let types_ok = match family {
            // Bit-wise ops do not care about signedness
            Family::Logic => {
                result.is_bitwise() && operand_types.iter().all(|t| t.is_bitwise())
            }
            _ => result.is_integer() && operand_types.iter().all(|t| *t == result),
        };
        if !types_ok {
            trace!("alu: rejected '{}' for types {:?}", instr, operand_types);
            return None;
        }

        let cycles = match family {
            Family::Mul => self.mul_stages,
            Family::Div => self.div_cycles,
            _ => 0,
        };
        Some(AluOp {
            opcode,
            family,
            width,
            arity,
            cycles,
        })
    }
}

impl Mapper for AluMapper {
    fn name(&self) -> &'static str {
        "alu"
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
        if site.class() != ALU_CLASS || !self.supports(instr.opcode()) {
            return Vec::new();
        }
        let Some(op) = self.plan(instr, operand_types, result_types) else {
            return Vec::new();
        };
        if site.tag() != Some(op.family.name()) || site.width() != op.width {
            return Vec::new();
        }
        vec![Mapping::new(site.clone(), ResourceKind::Replicatable, op)]
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
        let op = self.plan(instr, operand_types, result_types)?;
        let site = host.instantiate(
            project,
            SiteSpec {
                class: ALU_CLASS,
                kind: ResourceKind::Replicatable,
                width: op.width,
                tag: Some(op.family.name().to_string()),
            },
        );
        site.bind(instr).ok()?;
        Some(Mapping::new(site, ResourceKind::Replicatable, op))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const S16: DataType = DataType::Signed(16);

    fn allocate(mapper: &AluMapper, opcode: Opcode, arity: usize) -> Mapping {
        let mut host = Host::new("top");
        let mut project = Project::new("p");
        let operands = vec![S16; arity];
        mapper
            .try_allocate(
                &mut host,
                &Instruction::new(opcode),
                &operands,
                &[S16],
                &mut project,
            )
            .unwrap()
    }

    #[test]
    fn combinational_ops_issue_every_cycle() {
        let add = allocate(&AluMapper::default(), Opcode::Add, 2);
        assert_eq!(add.latency(), 0);
        assert_eq!(add.initiation_interval(), 1);
        assert_eq!(add.resource_kind(), ResourceKind::Replicatable);
    }

    #[test]
    fn multiplier_is_pipelined() {
        let mul = allocate(&AluMapper::new(3, 8), Opcode::Mul, 2);
        assert_eq!(mul.latency(), 3);
        assert_eq!(mul.initiation_interval(), 1);

        let comb = allocate(&AluMapper::new(0, 8), Opcode::Mul, 2);
        assert_eq!(comb.latency(), 0);
        assert_eq!(comb.initiation_interval(), 1);
    }

    #[test]
    fn divider_locks_the_unit_until_done() {
        let div = allocate(&AluMapper::new(2, 4), Opcode::Div, 2);
        assert_eq!(div.latency(), 4);
        assert_eq!(div.initiation_interval(), 5);

        let clamped = AluMapper::new(2, 0);
        assert_eq!(clamped.div_cycles(), 1);
    }

    #[test]
    fn adder_site_is_shared_by_add_sub_and_neg_only() {
        let mapper = AluMapper::default();
        let add = allocate(&mapper, Opcode::Add, 2);
        let site = add.site();

        let sub = Instruction::new(Opcode::Sub);
        assert_eq!(mapper.try_map(site, &sub, &[S16, S16], &[S16]).len(), 1);

        let neg = Instruction::new(Opcode::Neg);
        let mapped = mapper.try_map(site, &neg, &[S16], &[S16]);
        assert_eq!(mapped.len(), 1);
        let actions = mapped[0]
            .realize(&[SignalSource::signal("x")], &[SignalSink::signal("y")])
            .unwrap();
        assert_eq!(actions[0].action.drives.len(), 3);

        let xor = Instruction::new(Opcode::Xor);
        assert!(mapper.try_map(site, &xor, &[S16, S16], &[S16]).is_empty());

        let narrow = DataType::Signed(8);
        assert!(mapper
            .try_map(site, &sub, &[narrow, narrow], &[narrow])
            .is_empty());
    }

    #[test]
    fn arithmetic_rejects_mixed_and_float_types() {
        let mapper = AluMapper::default();
        let mut host = Host::new("top");
        let mut project = Project::new("p");
        let add = Instruction::new(Opcode::Add);

        let mixed = [DataType::Signed(16), DataType::Unsigned(16)];
        assert!(mapper
            .try_allocate(&mut host, &add, &mixed, &[S16], &mut project)
            .is_none());

        let f32s = [DataType::Float(32), DataType::Float(32)];
        assert!(mapper
            .try_allocate(&mut host, &add, &f32s, &f32s[..1], &mut project)
            .is_none());

        let and = Instruction::new(Opcode::And);
        let logic = [DataType::Logic(16), DataType::Unsigned(16)];
        assert!(mapper
            .try_allocate(&mut host, &and, &logic, &[DataType::Logic(16)], &mut project)
            .is_some());
    }
}
