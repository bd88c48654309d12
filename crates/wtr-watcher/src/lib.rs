//!
//! # wtr.watcher bindings
//!
//! Filesystem watching through the native `libwatcher-c` engine, loaded at runtime from a
//! `.wtr_watcher.libs` directory next to the running executable.
//!
//! The native engine owns the watching itself (kernel mechanisms, recursion, per-OS backends).
//! This crate handles what sits between it and Rust code:
//! - Loading the shared library once per process and resolving its two entry points;
//! - Turning native event records into [`Event`]s, rejecting malformed records;
//! - Owning native watchers so they're closed exactly once, explicitly or on drop;
//! - Running user callbacks on native threads without letting panics cross the FFI boundary.
//!
//! Events that can't be decoded and panics raised by callbacks have nobody to be returned to,
//! they are reported through `tracing` (target `wtr_watcher`) and the event is dropped.
//!
//! ## Basic example
//!
//! ```no_run
//! use wtr_watcher::Watch;
//!
//! let watch = Watch::open(".", |event| println!("{event}"))?;
//!
//! std::thread::sleep(std::time::Duration::from_secs(10));
//!
//! watch.close()?;
//! # Ok::<(), wtr_watcher::Error>(())
//! ```

#![warn(
	clippy::all,
	clippy::pedantic,
	clippy::correctness,
	clippy::perf,
	clippy::style,
	clippy::suspicious,
	clippy::complexity,
	clippy::nursery,
	clippy::unwrap_used,
	unused_qualifications,
	rust_2018_idioms,
	trivial_casts,
	trivial_numeric_casts,
	unused_allocation,
	clippy::unnecessary_cast,
	clippy::cast_lossless,
	clippy::cast_possible_truncation,
	clippy::cast_possible_wrap,
	clippy::cast_precision_loss,
	clippy::cast_sign_loss,
	clippy::dbg_macro,
	clippy::deprecated_cfg_attr,
	clippy::separated_literal_suffix,
	deprecated
)]
#![forbid(deprecated_in_future)]
#![allow(clippy::missing_errors_doc, clippy::module_name_repetitions)]

mod config;
mod error;
mod event;
mod library;
mod stream;
mod watch;

pub mod ffi;

pub use config::{
	LoaderConfig, StreamConfig, DEFAULT_STREAM_CAPACITY, LIBRARY_SUBDIR, LIBRARY_VERSION,
};
pub use error::{Error, Result};
pub use event::{EffectType, Event, PathType};
pub use library::{
	default_library_dir, library_file_name, resolve_library_path, NativeEngine, NativeLibrary,
	OsFamily,
};
pub use stream::EventStream;
pub use watch::Watch;
