//! Controller layer: UI events, reducer-like state transitions, and action orchestration.

pub mod events;
pub mod orchestration;
pub mod reducer;
