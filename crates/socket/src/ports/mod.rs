//! Port traits the socket core is written against.
//!
//! Adapters live in `crate::infrastructure`.

pub mod outbound;
