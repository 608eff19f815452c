//! Typed helper-module calls.
//!
//! One struct per PowerShell function the engine invokes. Each implements
//! `ModuleCall`, mapping its fields to the function's exact parameters.

pub mod choco;
pub mod desktop;
pub mod python;
