pub mod cli;
mod config;
mod run;

pub use run::{run, start};
