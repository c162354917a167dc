//! Emitters, one per directive kind.

pub(crate) mod conditional;
pub(crate) mod invocation;
pub(crate) mod iteration;
pub(crate) mod substitution;
