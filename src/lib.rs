pub mod combine;
pub mod config;
pub mod errors;
pub mod pipeline;
pub mod render;
pub mod seq;
pub mod tools;
pub mod tree;
pub mod ui;
mod runner;

use crate::errors::PhyloError;

pub fn run() -> Result<(), PhyloError> {
    runner::run()
}
