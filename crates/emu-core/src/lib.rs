//! Core traits for the SNES emulator host.
//!
//! The host core never touches CPU, PPU or APU internals. The machine
//! crates reach it through three narrow contracts: `Machine` drives one
//! frame at a time, `Freezable` serialises the whole machine state to an
//! opaque byte buffer, and `JoypadBus` is the controller-port interface
//! the emulated CPU reads through `$4016`/`$4017`.

mod freeze;
mod joypad_bus;
mod machine;

pub use freeze::Freezable;
pub use joypad_bus::JoypadBus;
pub use machine::Machine;
