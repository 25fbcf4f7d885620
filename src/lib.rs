//! Per-project working time tracker. Several instances can share one store: each writes the whole
//! project list after every change and polls the store to pick up changes from the others.
//!

pub mod cli;
pub mod store;
pub mod sync;
pub mod tracker;
pub mod tracking;
pub mod utils;
