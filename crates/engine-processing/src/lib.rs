pub mod accumulator;
pub mod breaks;
pub mod cursor;
pub mod definition;
pub mod engine;
pub mod error;
pub mod layout;
pub mod paginator;
pub mod run;
pub mod stop;
pub mod stream;
pub mod suppress;
