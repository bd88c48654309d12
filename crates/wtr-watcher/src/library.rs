//! Locating and loading `libwatcher-c`.

use crate::{
	config::{LoaderConfig, LIBRARY_SUBDIR},
	error::{Error, Result},
	ffi::{CloseFn, NativeCallback, OpenFn, CLOSE_SYMBOL, OPEN_SYMBOL},
};

use std::{
	env,
	ffi::{c_char, c_void},
	path::{Path, PathBuf},
	sync::Arc,
};

use once_cell::sync::OnceCell;
use tracing::{debug, instrument, trace};

static LIBRARY: OnceCell<Arc<NativeLibrary>> = OnceCell::new();

/// Operating system families with their own shared library naming convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsFamily {
	Darwin,
	Windows,
	Linux,
	Other,
}

impl OsFamily {
	pub const fn current() -> Self {
		if cfg!(any(target_os = "macos", target_os = "ios")) {
			Self::Darwin
		} else if cfg!(target_os = "windows") {
			Self::Windows
		} else if cfg!(target_os = "linux") {
			Self::Linux
		} else {
			Self::Other
		}
	}
}

/// File name of the native library for `os` at `version`.
///
/// The version goes in the suffix: the full version on Linux and Windows, only the major
/// version on Darwin.
pub fn library_file_name(os: OsFamily, version: &str) -> String {
	match os {
		OsFamily::Darwin => {
			let major = version.split('.').next().unwrap_or(version);
			format!("libwatcher-c.{major}.dylib")
		}
		OsFamily::Windows => format!("libwatcher-c.dll.{version}"),
		OsFamily::Linux | OsFamily::Other => format!("libwatcher-c.so.{version}"),
	}
}

/// Directory searched for the native library when the config doesn't name one.
pub fn default_library_dir() -> Result<PathBuf> {
	let exe = env::current_exe().map_err(Error::CurrentExe)?;
	let exe_dir = exe.parent().unwrap_or_else(|| Path::new("."));

	Ok(exe_dir.join(LIBRARY_SUBDIR))
}

/// Full path of the native library for the running platform, which must exist.
pub fn resolve_library_path(config: &LoaderConfig) -> Result<PathBuf> {
	let dir = match &config.library_dir {
		Some(dir) => dir.clone(),
		None => default_library_dir()?,
	};

	let path = dir.join(library_file_name(OsFamily::current(), &config.version));

	if path.exists() {
		Ok(path)
	} else {
		Err(Error::LibraryNotFound { path: path.into() })
	}
}

/// Returns what `cell` holds, running `load` to fill it if it's empty.
///
/// Concurrent first callers block on a single `load`, an error leaves the cell empty.
fn get_or_load<T>(cell: &OnceCell<Arc<T>>, load: impl FnOnce() -> Result<T>) -> Result<Arc<T>> {
	let mut loaded_here = false;

	let value = cell.get_or_try_init(|| {
		loaded_here = true;
		load().map(Arc::new)
	})?;

	if !loaded_here {
		trace!("Native library already loaded, ignoring loader config;");
	}

	Ok(Arc::clone(value))
}

/// The two entry points of the native engine.
///
/// Implemented by [`NativeLibrary`]; anything else implementing it has to honor the same
/// contract as `libwatcher-c`.
pub trait NativeEngine: Send + Sync {
	/// Starts watching `path`, returning an opaque watcher or null on failure.
	///
	/// # Safety
	///
	/// `path` must be a valid NUL-terminated string for the duration of the call and
	/// `context` must stay valid for as long as `callback` may be invoked, which is until
	/// a successful [`NativeEngine::close`] returns.
	unsafe fn open(
		&self,
		path: *const c_char,
		callback: NativeCallback,
		context: *mut c_void,
	) -> *mut c_void;

	/// Stops a watcher, blocking until no callback for it is running anymore.
	///
	/// # Safety
	///
	/// `watcher` must come from [`NativeEngine::open`] on the same engine and must not
	/// have been closed successfully before.
	unsafe fn close(&self, watcher: *mut c_void) -> bool;
}

/// A loaded `libwatcher-c`, with its entry points already resolved.
#[derive(Debug)]
pub struct NativeLibrary {
	path: PathBuf,
	open: OpenFn,
	close: CloseFn,
	// Keeps `open` and `close` valid
	_library: libloading::Library,
}

impl NativeLibrary {
	/// The process-wide library, loaded with the default [`LoaderConfig`] on first use.
	pub fn shared() -> Result<Arc<Self>> {
		Self::init(&LoaderConfig::default())
	}

	/// The process-wide library, loaded with `config` if nothing is loaded yet.
	///
	/// Concurrent first callers wait for a single load. A failed load isn't remembered,
	/// so the next caller tries again.
	pub fn init(config: &LoaderConfig) -> Result<Arc<Self>> {
		get_or_load(&LIBRARY, || Self::load(config))
	}

	#[instrument(skip_all, err)]
	fn load(config: &LoaderConfig) -> Result<Self> {
		let path = resolve_library_path(config)?;

		debug!(path = %path.display(), "Loading native library");

		// SAFETY: libwatcher-c has no initialization routines with preconditions
		let library = unsafe { libloading::Library::new(&path) }.map_err(|source| {
			Error::LibraryLoad {
				path: path.as_path().into(),
				source,
			}
		})?;

		// SAFETY: the symbol types match the C declarations in `ffi`
		let open = *unsafe { library.get::<OpenFn>(OPEN_SYMBOL.as_bytes()) }.map_err(
			|source| Error::MissingSymbol {
				name: OPEN_SYMBOL,
				source,
			},
		)?;
		let close = *unsafe { library.get::<CloseFn>(CLOSE_SYMBOL.as_bytes()) }.map_err(
			|source| Error::MissingSymbol {
				name: CLOSE_SYMBOL,
				source,
			},
		)?;

		debug!(path = %path.display(), "Native library loaded");

		Ok(Self {
			path,
			open,
			close,
			_library: library,
		})
	}

	pub fn path(&self) -> &Path {
		&self.path
	}
}

impl NativeEngine for NativeLibrary {
	unsafe fn open(
		&self,
		path: *const c_char,
		callback: NativeCallback,
		context: *mut c_void,
	) -> *mut c_void {
		(self.open)(path, callback, context)
	}

	unsafe fn close(&self, watcher: *mut c_void) -> bool {
		(self.close)(watcher)
	}
}
