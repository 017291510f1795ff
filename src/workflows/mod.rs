//! Ready-made workflow definitions.

pub mod sample;
