mod converter;
mod registry;

pub use converter::UnitConverter;
pub use registry::{UnitRegistry, UnitSpec};
