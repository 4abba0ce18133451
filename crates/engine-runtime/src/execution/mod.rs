pub mod executor;
pub mod factory;
pub mod utils;
pub mod workers;
