//! CLI command implementations

pub(crate) mod check;
pub(crate) mod common;
pub(crate) mod down;
pub(crate) mod new;
pub(crate) mod status;
pub(crate) mod up;
