//! UI layer: page rendering, card markup, markdown conversion and styling.

pub mod markdown;
pub mod page;
pub mod theme;
