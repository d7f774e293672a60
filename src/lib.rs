// src/lib.rs — Library root for storytime

pub mod cli;
pub mod core;
pub mod evaluator;
pub mod infra;
pub mod memory;
pub mod provider;
pub mod util;
