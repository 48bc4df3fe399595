//! Low-level primitives for building heap graphs.
//!
//! Includes compact per-element flag arrays and the string dictionary shared
//! across snapshot generations.

/// Bit-packed flag and status arrays.
///
/// Fixed-capacity 1-bit and 2-bit arrays addressed by index, used for visited
/// sets and growth status over multi-million element graphs.
pub mod bits;

/// String interning.
///
/// Bidirectional string to dense id table shared by every graph a tracker builds.
pub mod dict;
