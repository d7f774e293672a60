// src/core/mod.rs — Story pipeline

pub mod categorizer;
pub mod orchestrator;
pub mod parent;
pub mod safety;
pub mod storyteller;
pub mod types;
pub mod variety;
