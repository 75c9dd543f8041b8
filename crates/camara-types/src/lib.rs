//! Wire and domain types shared by both chamber processes.

pub mod api;
pub mod events;
pub mod models;
pub mod relay;
