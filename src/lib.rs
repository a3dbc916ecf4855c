#![doc = include_str!("../README.md")]
#![cfg_attr(not(target_arch = "x86_64"), no_std)]

extern crate alloc;

pub mod board;
pub mod bootloader;
pub mod error;
pub mod flash;
pub mod hw;
mod init;
pub mod led;
pub mod partition;
pub mod platform;
pub mod settings;
mod window;

pub use error::{Error, Fault};
pub use flash::{ChipId, FlashChip, SectorRange};
pub use init::{Board, BootConfig, BootFailure, BootReport, BootStage};
pub use partition::{Partition, PartitionLabel, PartitionTable};
pub use platform::{Crc, Drivers};
pub use settings::HwSettings;
pub use window::{PartitionFlash, WindowError};
