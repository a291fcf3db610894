use serde::Deserialize;
use std::fmt;

/**
 * Abstract operations that the binder knows how to realize in hardware.
 */
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Opcode {
    Nop,
    Barrier,
    Convert,
    LdConst,
    #[serde(rename = "ld_0")]
    Ld0,
    Add,
    Sub,
    And,
    Or,
    Xor,
    Not,
    Neg,
    Mul,
    Div,
    RdMem,
    WrMem,
}

impl Opcode {
    pub const ALL: [Opcode; 16] = [
        Opcode::Nop,
        Opcode::Barrier,
        Opcode::Convert,
        Opcode::LdConst,
        Opcode::Ld0,
        Opcode::Add,
        Opcode::Sub,
        Opcode::And,
        Opcode::Or,
        Opcode::Xor,
        Opcode::Not,
        Opcode::Neg,
        Opcode::Mul,
        Opcode::Div,
        Opcode::RdMem,
        Opcode::WrMem,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Opcode::Nop => "nop",
            Opcode::Barrier => "barrier",
            Opcode::Convert => "convert",
            Opcode::LdConst => "ld_const",
            Opcode::Ld0 => "ld_0",
            Opcode::Add => "add",
            Opcode::Sub => "sub",
            Opcode::And => "and",
            Opcode::Or => "or",
            Opcode::Xor => "xor",
            Opcode::Not => "not",
            Opcode::Neg => "neg",
            Opcode::Mul => "mul",
            Opcode::Div => "div",
            Opcode::RdMem => "rd_mem",
            Opcode::WrMem => "wr_mem",
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Static parameter carried by an instruction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operand {
    Const(i64),
    Cycles(usize),
    Memory(String),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Operand::Const(v) => write!(f, "#{}", v),
            Operand::Cycles(n) => write!(f, "{}cc", n),
            Operand::Memory(m) => write!(f, "@{}", m),
        }
    }
}

/**
 * An instruction is just the opcode and its static operand, if any. The types
 * of its operands and results are passed separately, with each query, since
 * the same instruction may be bound with different signatures.
 */
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Instruction {
    opcode: Opcode,
    operand: Option<Operand>,
}

impl Instruction {
    pub fn new(opcode: Opcode) -> Self {
        Self {
            opcode,
            operand: None,
        }
    }

    pub fn with_operand(opcode: Opcode, operand: Operand) -> Self {
        Self {
            opcode,
            operand: Some(operand),
        }
    }

    pub fn opcode(&self) -> Opcode {
        self.opcode
    }

    pub fn operand(&self) -> Option<&Operand> {
        self.operand.as_ref()
    }

    pub fn constant(&self) -> Option<i64> {
        match self.operand {
            Some(Operand::Const(v)) => Some(v),
            _ => None,
        }
    }

    pub fn cycles(&self) -> Option<usize> {
        match self.operand {
            Some(Operand::Cycles(n)) => Some(n),
            _ => None,
        }
    }

    pub fn memory(&self) -> Option<&str> {
        match &self.operand {
            Some(Operand::Memory(m)) => Some(m.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.operand {
            Some(operand) => write!(f, "{} {}", self.opcode, operand),
            None => write!(f, "{}", self.opcode),
        }
    }
}

/**
 * Type descriptor of an operand or result. Only the wire-level shape matters
 * to the binder, so this is the type's class and its bit width.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Bool,
    Signed(u32),
    Unsigned(u32),
    Logic(u32),
    Float(u32),
}

impl DataType {
    pub fn width(&self) -> u32 {
        match *self {
            DataType::Bool => 1,
            DataType::Signed(w)
            | DataType::Unsigned(w)
            | DataType::Logic(w)
            | DataType::Float(w) => w,
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, DataType::Signed(_) | DataType::Unsigned(_))
    }

    /// Integers, logic vectors and booleans can all go through bit-wise ops.
    pub fn is_bitwise(&self) -> bool {
        !matches!(self, DataType::Float(_))
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DataType::Bool => write!(f, "bool"),
            DataType::Signed(w) => write!(f, "s{}", w),
            DataType::Unsigned(w) => write!(f, "u{}", w),
            DataType::Logic(w) => write!(f, "slv{}", w),
            DataType::Float(w) => write!(f, "f{}", w),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operand_accessors_only_match_their_own_variant() {
        let ld = Instruction::with_operand(Opcode::LdConst, Operand::Const(-3));
        assert_eq!(ld.constant(), Some(-3));
        assert_eq!(ld.cycles(), None);
        assert_eq!(ld.memory(), None);

        let rd = Instruction::with_operand(
            Opcode::RdMem,
            Operand::Memory("coeffs".to_string()),
        );
        assert_eq!(rd.memory(), Some("coeffs"));
        assert_eq!(Instruction::new(Opcode::Add).operand(), None);
    }

    #[test]
    fn session_files_use_the_display_names() {
        for opcode in Opcode::ALL {
            let parsed: Opcode = serde_yaml::from_str(opcode.name()).unwrap();
            assert_eq!(parsed, opcode);
        }
        assert!(serde_yaml::from_str::<Opcode>("ld0").is_err());
    }

    #[test]
    fn display_formats() {
        let nop = Instruction::with_operand(Opcode::Nop, Operand::Cycles(2));
        assert_eq!(nop.to_string(), "nop 2cc");
        assert_eq!(DataType::Unsigned(16).to_string(), "u16");
        assert_eq!(DataType::Bool.width(), 1);
        assert!(!DataType::Float(32).is_bitwise());
        assert!(DataType::Logic(8).is_bitwise());
        assert!(!DataType::Logic(8).is_integer());
    }
}
