use crate::instr::Instruction;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BindError {
    #[error("{what} arity mismatch for '{mapping}': expected {expected}, found {found}")]
    Arity {
        mapping: String,
        what: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("site '{site}' is exclusive and already bound to '{bound}', cannot bind '{requested}'")]
    AlreadyBound {
        site: String,
        bound: Instruction,
        requested: Instruction,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read session file: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed session file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid session settings: {0}")]
    Invalid(String),
}
