use crate::error::ConfigError;
use crate::instr::{DataType, Instruction, Opcode, Operand};
use log::{debug, info};
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::Path;

const DEMO_SESSION: &str = include_str!("../demos/session.yaml");

/// Which of the built-in mappers get registered, and how they are configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct UnitSettings {
    pub nop: bool,
    pub constants: bool,
    pub alu: bool,
    pub memory: bool,
    pub mul_stages: usize,
    pub div_cycles: usize,
}

impl Default for UnitSettings {
    fn default() -> Self {
        Self {
            nop: true,
            constants: true,
            alu: true,
            memory: true,
            mul_stages: 2,
            div_cycles: 8,
        }
    }
}

/// Where the session log goes, and how much of it is kept.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    pub directory: String,
    pub keep_files: usize,
    pub rotate_daily: bool,
    pub max_bytes: u64,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            directory: "logs".to_string(),
            keep_files: 1,
            rotate_daily: true,
            max_bytes: 1 << 20,
        }
    }
}

/// One instruction to bind, along with its operand & result signature.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InstrSpec {
    pub op: Opcode,
    #[serde(default)]
    pub operand: Option<Operand>,
    #[serde(default)]
    pub operands: Vec<DataType>,
    #[serde(default)]
    pub results: Vec<DataType>,
}

impl InstrSpec {
    pub fn instruction(&self) -> Instruction {
        match &self.operand {
            Some(operand) => Instruction::with_operand(self.op, operand.clone()),
            None => Instruction::new(self.op),
        }
    }
}

impl fmt::Display for InstrSpec {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let ts = |types: &[DataType]| -> String {
            let ts: Vec<String> = types.iter().map(|t| t.to_string()).collect();
            ts.join(", ")
        };
        write!(
            f,
            "{} ({}) -> ({})",
            self.instruction(),
            ts(&self.operands),
            ts(&self.results)
        )
    }
}

/**
 * Settings for one binding session, as read from a YAML file. Every field is
 * optional, e.g.
 *
 *   host: datapath
 *   units:
 *     mul_stages: 3
 *   instructions:
 *     - op: add
 *       operands: [!unsigned 16, !unsigned 16]
 *       results: [!unsigned 16]
 */
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub host: String,
    pub project: String,
    pub units: UnitSettings,
    pub log: LogSettings,
    pub instructions: Vec<InstrSpec>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            host: "top".to_string(),
            project: "hls".to_string(),
            units: UnitSettings::default(),
            log: LogSettings::default(),
            instructions: Vec::new(),
        }
    }
}

impl SessionConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        debug!("reading session file: {}", path.display());
        let text = fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }

    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(text)?;
        config.validate()?;
        info!(
            "session '{}': {} instruction(s) for host '{}'",
            config.project,
            config.instructions.len(),
            config.host
        );
        Ok(config)
    }

    /// The built-in demonstration session.
    pub fn demo() -> Result<Self, ConfigError> {
        Self::from_yaml(DEMO_SESSION)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.units.div_cycles == 0 {
            return Err(ConfigError::Invalid(
                "the divider needs at least one cycle".to_string(),
            ));
        }
        if !self.log.rotate_daily && self.log.max_bytes == 0 {
            return Err(ConfigError::Invalid(
                "size-based log rotation needs a non-zero 'max_bytes'".to_string(),
            ));
        }
        if self.host.is_empty() {
            return Err(ConfigError::Invalid("empty host name".to_string()));
        }
        Ok(())
    }
}
