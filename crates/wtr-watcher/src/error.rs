use std::{ffi::NulError, io, path::Path, str::Utf8Error};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
	// Library resolution and loading
	#[error("native library does not exist: <path='{}'>", .path.display())]
	LibraryNotFound { path: Box<Path> },
	#[error("failed to load native library <path='{}'>", .path.display())]
	LibraryLoad {
		path: Box<Path>,
		#[source]
		source: libloading::Error,
	},
	#[error("native library is missing entry point <name='{name}'>")]
	MissingSymbol {
		name: &'static str,
		#[source]
		source: libloading::Error,
	},
	#[error("unable to locate the running executable")]
	CurrentExe(#[source] io::Error),

	// Watch lifecycle
	#[error("no such path: <path='{}'>", .0.display())]
	NoSuchPath(Box<Path>),
	#[error("received a non UTF-8 path: <path='{0:?}'>")]
	NonUtf8Path(Box<Path>),
	#[error("path contains an interior NUL byte")]
	InvalidPath(#[from] NulError),
	#[error("native engine failed to open a watcher <path='{}'>", .0.display())]
	WatcherOpenFailed(Box<Path>),
	#[error("native engine failed to close a watcher <path='{}'>", .0.display())]
	WatcherCloseFailed(Box<Path>),
	#[error("a watcher can't be closed from its own callback <path='{}'>", .0.display())]
	CloseFromCallback(Box<Path>),

	// Event conversion
	#[error("value out of range for {field} <value='{value}'>")]
	InvalidEnumValue { field: &'static str, value: i8 },
	#[error("{field} is not valid UTF-8")]
	Decode {
		field: &'static str,
		#[source]
		source: Utf8Error,
	},
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
