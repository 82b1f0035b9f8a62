//! Integration test crate for Voxmix.
//!
//! This crate exists solely to hold cross-crate integration tests.
//! It drives the mixer through its public API the way a backend and a
//! control thread would.

#[cfg(test)]
mod support;

#[cfg(test)]
mod lifecycle;

#[cfg(test)]
mod mixing;
