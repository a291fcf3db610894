pub use config::*;
pub use dse::*;
pub use error::*;
pub use instr::*;
pub use mapper::*;
pub use mapping::*;
pub use registry::*;
pub use signal::*;
pub use site::*;
pub use verb::*;

pub mod config;
pub mod dse;
pub mod error;
pub mod instr;
pub mod logger;
pub mod mapper;
pub mod mapping;
pub mod registry;
pub mod signal;
pub mod site;
pub mod units;
pub mod verb;
