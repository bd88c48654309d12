use crate::{
	config::StreamConfig,
	error::{Error, Result},
	ffi::{self, NativeEventRecord},
	library::{NativeEngine, NativeLibrary},
	stream::EventStream,
	Event,
};

use std::{
	any::Any,
	cell::Cell,
	ffi::{c_void, CString},
	panic::{self, AssertUnwindSafe},
	path::Path,
	ptr::{self, NonNull},
	sync::{
		atomic::{AtomicBool, Ordering},
		Arc,
	},
};

use parking_lot::Mutex;
use tracing::{debug, error, instrument, trace, warn};

type Callback = dyn Fn(Event) + Send + Sync;

thread_local! {
	/// Context whose events the current thread is delivering, null outside of a delivery.
	static DELIVERING: Cell<*const CallbackContext> = const { Cell::new(ptr::null()) };
}

/// Where decoded events go.
enum Sink {
	Callback(Box<Callback>),
	Channel(async_channel::Sender<Event>),
}

/// Shared between a [`Watch`] and the native threads delivering its events.
struct CallbackContext {
	path: Box<Path>,
	closed: AtomicBool,
	sink: Sink,
}

impl CallbackContext {
	fn deliver(&self, record: &NativeEventRecord) {
		if self.closed.load(Ordering::Acquire) {
			trace!(path = %self.path.display(), "Dropping event received while closing;");
			return;
		}

		// SAFETY: the engine keeps the record strings alive until the callback returns
		let event = match unsafe { ffi::decode(record) } {
			Ok(event) => event,
			Err(e) => {
				warn!(path = %self.path.display(), ?e, "Dropping undecodable event;");
				return;
			}
		};

		match &self.sink {
			Sink::Callback(callback) => callback(event),
			Sink::Channel(tx) => {
				if tx.send_blocking(event).is_err() {
					trace!(path = %self.path.display(), "Event stream is gone, dropping event;");
				}
			}
		}
	}

	/// Stops delivery. A native thread parked on a full channel is woken up.
	fn shut(&self) {
		self.closed.store(true, Ordering::Release);

		if let Sink::Channel(tx) = &self.sink {
			tx.close();
		}
	}
}

/// Registered with the native engine for every watch.
///
/// Nothing may unwind out of here, so decoding and the user callback run under
/// `catch_unwind` and failures end up in the logs.
unsafe extern "C" fn callback_bridge(record: NativeEventRecord, context: *mut c_void) {
	let Some(context) = NonNull::new(context.cast::<CallbackContext>()) else {
		return;
	};

	// SAFETY: the context outlives the native watcher, see `Watch::drop`
	let context = context.as_ref();

	DELIVERING.set(ptr::from_ref(context));
	let result = panic::catch_unwind(AssertUnwindSafe(|| context.deliver(&record)));
	DELIVERING.set(ptr::null());

	if let Err(e) = result {
		error!(
			path = %context.path.display(),
			"Event callback panicked: {};",
			panic_message(&*e)
		);
	}
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
	payload
		.downcast_ref::<&str>()
		.copied()
		.or_else(|| payload.downcast_ref::<String>().map(String::as_str))
		.unwrap_or("<non-string panic payload>")
}

#[derive(Debug, Clone, Copy)]
enum State {
	Active(NonNull<c_void>),
	Closed,
	/// The engine refused to close; we no longer touch the native watcher and never free
	/// the context it may still be using.
	Poisoned,
}

/// A running watch on a path.
///
/// Events are delivered on native engine threads until the watch is closed, either with
/// [`Watch::close`] or by dropping it. Closing is idempotent and can be done from any thread.
pub struct Watch {
	engine: Arc<dyn NativeEngine>,
	path: Box<Path>,
	state: Mutex<State>,
	context: NonNull<CallbackContext>,
}

// SAFETY: the native watcher is only touched under `state`'s lock and the context is
// `Sync` (it only holds `Send + Sync` sinks and atomics).
unsafe impl Send for Watch {}
unsafe impl Sync for Watch {}

impl Watch {
	/// Watches `path` with the process-wide native library, calling `callback` for every event.
	pub fn open(
		path: impl AsRef<Path>,
		callback: impl Fn(Event) + Send + Sync + 'static,
	) -> Result<Self> {
		Self::open_with(NativeLibrary::shared()?, path, callback)
	}

	pub fn open_with(
		engine: Arc<dyn NativeEngine>,
		path: impl AsRef<Path>,
		callback: impl Fn(Event) + Send + Sync + 'static,
	) -> Result<Self> {
		Self::open_inner(engine, path.as_ref(), Sink::Callback(Box::new(callback)))
	}

	/// Watches `path` with the process-wide native library, delivering events through an
	/// async [`EventStream`].
	pub fn stream(path: impl AsRef<Path>, config: &StreamConfig) -> Result<(Self, EventStream)> {
		Self::stream_with(NativeLibrary::shared()?, path, config)
	}

	pub fn stream_with(
		engine: Arc<dyn NativeEngine>,
		path: impl AsRef<Path>,
		config: &StreamConfig,
	) -> Result<(Self, EventStream)> {
		let (tx, rx) = async_channel::bounded(config.capacity.max(1));

		Self::open_inner(engine, path.as_ref(), Sink::Channel(tx))
			.map(|watch| (watch, EventStream::new(rx)))
	}

	#[instrument(name = "watch_open", skip_all, fields(path = %path.display()))]
	fn open_inner(engine: Arc<dyn NativeEngine>, path: &Path, sink: Sink) -> Result<Self> {
		let c_path = CString::new(
			path.to_str()
				.ok_or_else(|| Error::NonUtf8Path(path.into()))?,
		)?;

		// The engine happily watches paths that don't exist, so it never gets to see them
		if matches!(path.try_exists(), Ok(false)) {
			debug!("Refusing to watch a missing path;");
			return Err(Error::NoSuchPath(path.into()));
		}

		let context = NonNull::from(Box::leak(Box::new(CallbackContext {
			path: path.into(),
			closed: AtomicBool::new(false),
			sink,
		})));

		// SAFETY: `c_path` lives through the call and `context` until the watcher is closed
		let watcher = unsafe {
			engine.open(
				c_path.as_ptr(),
				callback_bridge,
				context.as_ptr().cast::<c_void>(),
			)
		};

		let Some(watcher) = NonNull::new(watcher) else {
			// SAFETY: no watcher was created, so the engine holds no reference to the context
			drop(unsafe { Box::from_raw(context.as_ptr()) });

			// The path may have been removed while the engine was setting up
			return Err(if path.exists() {
				error!("Native engine failed to open a watcher;");
				Error::WatcherOpenFailed(path.into())
			} else {
				debug!("Path vanished while opening a watcher;");
				Error::NoSuchPath(path.into())
			});
		};

		debug!("Watcher opened");

		Ok(Self {
			engine,
			path: path.into(),
			state: Mutex::new(State::Active(watcher)),
			context,
		})
	}

	/// Stops watching, blocking until the native engine has torn the watcher down.
	///
	/// Closing a closed watch is a no-op. If the engine fails to tear down the watcher the
	/// error is returned once and the watch is considered closed from then on.
	///
	/// The engine waits for running callbacks before tearing a watcher down, so closing a
	/// watch from inside its own callback fails with [`Error::CloseFromCallback`] and leaves
	/// the watch open.
	#[instrument(name = "watch_close", skip_all, fields(path = %self.path.display()))]
	pub fn close(&self) -> Result<()> {
		if ptr::eq(DELIVERING.get(), self.context.as_ptr()) {
			warn!("Refusing to close a watcher from its own callback;");
			return Err(Error::CloseFromCallback(self.path.clone()));
		}

		let mut state = self.state.lock();

		let State::Active(watcher) = *state else {
			trace!("Watcher already closed;");
			return Ok(());
		};

		self.context().shut();

		// SAFETY: `watcher` came from this engine and the lock guarantees a single close
		if unsafe { self.engine.close(watcher.as_ptr()) } {
			*state = State::Closed;
			debug!("Watcher closed");
			Ok(())
		} else {
			*state = State::Poisoned;
			Err(Error::WatcherCloseFailed(self.path.clone()))
		}
	}

	pub fn is_open(&self) -> bool {
		matches!(*self.state.lock(), State::Active(_))
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	fn context(&self) -> &CallbackContext {
		// SAFETY: the context is only freed in `drop`
		unsafe { self.context.as_ref() }
	}
}

impl std::fmt::Debug for Watch {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Watch")
			.field("path", &self.path)
			.field("state", &*self.state.lock())
			.finish_non_exhaustive()
	}
}

impl Drop for Watch {
	fn drop(&mut self) {
		if let Err(e) = self.close() {
			error!(?e, "Failed to close watcher on drop;");
		}

		match *self.state.get_mut() {
			State::Closed => {
				// SAFETY: the watcher is gone, nothing else can reach the context
				drop(unsafe { Box::from_raw(self.context.as_ptr()) });
			}
			State::Poisoned | State::Active(_) => {
				warn!(
					path = %self.path.display(),
					"Leaking callback context of a watcher that was not closed;"
				);
			}
		}
	}
}
