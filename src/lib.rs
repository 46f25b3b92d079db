//! # ffu2img
//!
//! A Rust tool that replays Full Flash Update (FFU) firmware containers
//! into raw disk images.
//!
//! This library parses the container's nested binary record structure in a
//! single forward pass, sizes the destination medium from the partition
//! table embedded in the store's final table region, and streams the
//! payload chunks to the absolute offsets the container declares, from
//! either end of the medium.
//!
//! ## Features
//!
//! - One-pass metadata parsing over any random-access source
//! - Destination sizing from the embedded GPT's backup header
//! - Payload fan-out: one chunk read, written to every declared location
//! - Typed errors distinguishing truncation, malformed records and
//!   unsupported format revisions
//!
//! ## Example
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use ffu2img::{FfuFlasher, LocalFileReader, LocalImageWriter};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let reader = Arc::new(LocalFileReader::new(Path::new("flash.ffu"))?);
//!     let flasher = FfuFlasher::new(reader);
//!
//!     let meta = flasher.read_meta().await?;
//!     let size = flasher.estimate_device_size(&meta).await?;
//!
//!     let image = LocalImageWriter::create(Path::new("disk.img"), size)?;
//!     flasher.copy_blocks(&meta, &image).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod error;
pub mod ffu;
pub mod gpt;
pub mod io;

pub use cli::Cli;
pub use error::{Error, Result};
pub use ffu::{FfuFlasher, FfuMeta, FfuParser};
pub use gpt::Gpt;
pub use io::{LocalFileReader, LocalImageWriter, ReadAt, WriteAt};
