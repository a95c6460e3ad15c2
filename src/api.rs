mod client;
mod open_meteo;
mod zippopotam;

pub use self::{open_meteo::Api as OpenMeteo, zippopotam::Api as Zippopotam};
