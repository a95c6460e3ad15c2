#[macro_use]
pub mod macros;

pub mod atmosphere;
pub mod cost;
pub mod energy;
pub mod temperature;
