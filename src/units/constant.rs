use crate::instr::{DataType, Instruction, Opcode};
use crate::mapper::Mapper;
use crate::mapping::{Mapping, Realize, ResourceKind};
use crate::signal::{SignalSink, SignalSource};
use crate::site::{Host, Project, SiteRef, SiteSpec, TransactionSite};
use crate::verb::{Action, TimedAction, TimingMode};

pub const CONST_CLASS: &str = "const";

const SUPPORTED: [Opcode; 2] = [Opcode::LdConst, Opcode::Ld0];

/**
 * Loading a constant is just wiring, so every use may get its own loader. An
 * existing loader is only reused for the same value at the same width.
 */
#[derive(Debug, Clone, Copy, Default)]
pub struct ConstLoaderMapper;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LoadConstant {
    value: i64,
    width: u32,
}

impl Realize for LoadConstant {
    fn description(&self) -> String {
        format!("constant loader: {}", self.value)
    }

    fn arity(&self) -> (usize, usize) {
        (0, 1)
    }

    fn realize(
        &self,
        site: &TransactionSite,
        _operands: &[SignalSource],
        results: &[SignalSink],
    ) -> Vec<TimedAction> {
        let action = Action::idle()
            .drive("k", SignalSource::constant(self.value, self.width))
            .collect("q", results[0].clone());
        vec![site.verb(TimingMode::Unlocked, action)]
    }
}

impl ConstLoaderMapper {
    fn plan(
        &self,
        instr: &Instruction,
        operand_types: &[DataType],
        result_types: &[DataType],
    ) -> Option<LoadConstant> {
        if !operand_types.is_empty() || result_types.len() != 1 {
            return None;
        }
        let value = match instr.opcode() {
            Opcode::LdConst => instr.constant()?,
            Opcode::Ld0 => 0,
            _ => return None,
        };
        Some(LoadConstant {
            value,
            width: result_types[0].width(),
        })
    }
}

impl Mapper for ConstLoaderMapper {
    fn name(&self) -> &'static str {
        "const-loader"
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
        if site.class() != CONST_CLASS || !self.supports(instr.opcode()) {
            return Vec::new();
        }
        let Some(load) = self.plan(instr, operand_types, result_types) else {
            return Vec::new();
        };
        let value = load.value.to_string();
        if site.tag() != Some(value.as_str()) || site.width() != load.width {
            return Vec::new();
        }
        vec![Mapping::new(site.clone(), ResourceKind::Lightweight, load)]
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
        let load = self.plan(instr, operand_types, result_types)?;
        let site = host.instantiate(
            project,
            SiteSpec {
                class: CONST_CLASS,
                kind: ResourceKind::Lightweight,
                width: load.width,
                tag: Some(load.value.to_string()),
            },
        );
        site.bind(instr).ok()?;
        Some(Mapping::new(site, ResourceKind::Lightweight, load))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instr::Operand;

    #[test]
    fn loader_is_reused_only_for_the_same_value_and_width() {
        let mut host = Host::new("top");
        let mut project = Project::new("p");
        let five = Instruction::with_operand(Opcode::LdConst, Operand::Const(5));
        let u8s = [DataType::Unsigned(8)];

        let mapping = ConstLoaderMapper
            .try_allocate(&mut host, &five, &[], &u8s, &mut project)
            .unwrap();
        assert_eq!(mapping.latency(), 0);
        assert_eq!(mapping.initiation_interval(), 0);
        assert_eq!(mapping.resource_kind(), ResourceKind::Lightweight);
        assert_eq!(mapping.description(), "constant loader: 5");

        let site = mapping.site();
        assert_eq!(ConstLoaderMapper.try_map(site, &five, &[], &u8s).len(), 1);

        let six = Instruction::with_operand(Opcode::LdConst, Operand::Const(6));
        assert!(ConstLoaderMapper.try_map(site, &six, &[], &u8s).is_empty());
        assert!(ConstLoaderMapper
            .try_map(site, &five, &[], &[DataType::Unsigned(16)])
            .is_empty());
    }

    #[test]
    fn load_zero_drives_a_zero_of_the_result_width() {
        let mut host = Host::new("top");
        let mut project = Project::new("p");
        let ld0 = Instruction::new(Opcode::Ld0);
        let mapping = ConstLoaderMapper
            .try_allocate(&mut host, &ld0, &[], &[DataType::Signed(12)], &mut project)
            .unwrap();
        let actions = mapping
            .realize(&[], &[SignalSink::signal("acc")])
            .unwrap();
        assert_eq!(actions.len(), 1);
        assert_eq!(
            actions[0].action.drives[0].source,
            SignalSource::constant(0, 12)
        );
        assert_eq!(actions[0].action.collects[0].sink, SignalSink::signal("acc"));
    }

    #[test]
    fn missing_constant_is_unsupported() {
        let mut host = Host::new("top");
        let mut project = Project::new("p");
        let bare = Instruction::new(Opcode::LdConst);
        assert!(ConstLoaderMapper
            .try_allocate(&mut host, &bare, &[], &[DataType::Bool], &mut project)
            .is_none());
    }
}
