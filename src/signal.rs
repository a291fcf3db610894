use std::fmt;

/// Wiring endpoint that feeds a functional-unit input port.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SignalSource {
    Const { value: i64, width: u32 },
    Signal(String),
}

/// Wiring endpoint that receives a functional-unit output port.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SignalSink {
    Signal(String),
    Nil,
}

impl SignalSource {
    pub fn constant(value: i64, width: u32) -> Self {
        SignalSource::Const { value, width }
    }

    pub fn signal(name: &str) -> Self {
        SignalSource::Signal(name.to_string())
    }

    /// Placeholder wiring, used when only the shape of a realization matters.
    pub fn zero() -> Self {
        SignalSource::Const { value: 0, width: 1 }
    }
}

impl SignalSink {
    pub fn signal(name: &str) -> Self {
        SignalSink::Signal(name.to_string())
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, SignalSink::Nil)
    }
}

impl fmt::Display for SignalSource {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SignalSource::Const { value, width } => {
                write!(f, "{}'d{}", width, value)
            }
            SignalSource::Signal(name) => write!(f, "{}", name),
        }
    }
}

impl fmt::Display for SignalSink {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SignalSink::Signal(name) => write!(f, "{}", name),
            SignalSink::Nil => write!(f, "_"),
        }
    }
}
