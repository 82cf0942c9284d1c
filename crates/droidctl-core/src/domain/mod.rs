//! Domain value types: synthetic input events and virtual display descriptions.
//!
//! Everything here is plain data.  Nothing in this module talks to the OS;
//! construction and validation only.

pub mod display;
pub mod event;
