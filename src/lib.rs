//! Craftmind - autonomous voxel-world agents driven by natural language

pub mod actions;
pub mod blueprints;
pub mod command;
pub mod core;
pub mod entity;
pub mod llm;
pub mod simulation;
pub mod task;
pub mod ui;
pub mod world;
