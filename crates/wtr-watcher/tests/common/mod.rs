#![allow(dead_code)]

use wtr_watcher::{
	ffi::{NativeCallback, NativeEventRecord},
	EffectType, NativeEngine, PathType,
};

use std::{
	collections::HashMap,
	ffi::{c_char, c_void, CStr, CString},
	ptr,
	sync::{
		atomic::{AtomicBool, AtomicUsize, Ordering},
		Arc,
	},
};

use parking_lot::{Mutex, RwLock};

#[derive(Clone, Copy)]
struct Session {
	callback: NativeCallback,
	context: usize,
}

/// In-process stand-in for `libwatcher-c`.
///
/// Like the real engine, `close` waits for in-flight deliveries to finish before returning,
/// and after a successful close the session never receives events again.
#[derive(Default)]
pub struct MockEngine {
	sessions: RwLock<HashMap<usize, Session>>,
	/// Sessions closed successfully, kept around to simulate events racing a close
	zombies: Mutex<Vec<Session>>,
	next_id: AtomicUsize,
	opened: AtomicUsize,
	closed: AtomicUsize,
	fail_open: AtomicBool,
	fail_close: AtomicBool,
	opened_paths: Mutex<Vec<String>>,
}

impl MockEngine {
	pub fn new() -> Arc<Self> {
		Arc::new(Self::default())
	}

	pub fn failing_open() -> Arc<Self> {
		let engine = Self::default();
		engine.fail_open.store(true, Ordering::SeqCst);
		Arc::new(engine)
	}

	pub fn failing_close() -> Arc<Self> {
		let engine = Self::default();
		engine.fail_close.store(true, Ordering::SeqCst);
		Arc::new(engine)
	}

	pub fn live_sessions(&self) -> usize {
		self.sessions.read().len()
	}

	pub fn open_calls(&self) -> usize {
		self.opened.load(Ordering::SeqCst)
	}

	pub fn close_calls(&self) -> usize {
		self.closed.load(Ordering::SeqCst)
	}

	pub fn opened_paths(&self) -> Vec<String> {
		self.opened_paths.lock().clone()
	}

	/// Delivers `record` to every live session, returning how many got it.
	pub fn deliver(&self, record: &OwnedRecord) -> usize {
		let sessions = self.sessions.read();

		for session in sessions.values() {
			// SAFETY: the session is live, so its context is too
			unsafe { (session.callback)(record.as_native(), session.context as *mut c_void) };
		}

		sessions.len()
	}

	/// Delivers `record` to sessions that were already closed.
	///
	/// Only sound while the `Watch` owning those sessions hasn't been dropped yet.
	pub fn deliver_to_closed(&self, record: &OwnedRecord) -> usize {
		let zombies = self.zombies.lock();

		for session in zombies.iter() {
			unsafe { (session.callback)(record.as_native(), session.context as *mut c_void) };
		}

		zombies.len()
	}
}

impl NativeEngine for MockEngine {
	unsafe fn open(
		&self,
		path: *const c_char,
		callback: NativeCallback,
		context: *mut c_void,
	) -> *mut c_void {
		self.opened.fetch_add(1, Ordering::SeqCst);
		self.opened_paths
			.lock()
			.push(CStr::from_ptr(path).to_string_lossy().into_owned());

		if self.fail_open.load(Ordering::SeqCst) {
			return ptr::null_mut();
		}

		let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
		self.sessions.write().insert(
			id,
			Session {
				callback,
				context: context as usize,
			},
		);

		id as *mut c_void
	}

	unsafe fn close(&self, watcher: *mut c_void) -> bool {
		self.closed.fetch_add(1, Ordering::SeqCst);

		if self.fail_close.load(Ordering::SeqCst) {
			return false;
		}

		// Taking the write lock waits for in-flight deliveries
		match self.sessions.write().remove(&(watcher as usize)) {
			Some(session) => {
				self.zombies.lock().push(session);
				true
			}
			None => false,
		}
	}
}

/// A native record together with the strings it points to.
pub struct OwnedRecord {
	pub effect_time: i64,
	pub path_name: Option<CString>,
	pub associated_path_name: Option<CString>,
	pub effect_type: i8,
	pub path_type: i8,
}

impl OwnedRecord {
	pub fn new(path: &str, effect_type: EffectType, path_type: PathType) -> Self {
		Self {
			effect_time: 1_700_000_000_000_000_000,
			path_name: Some(CString::new(path).expect("no NUL in test path")),
			associated_path_name: None,
			effect_type: effect_type.into(),
			path_type: path_type.into(),
		}
	}

	pub fn renamed_to(mut self, path: &str) -> Self {
		self.associated_path_name = Some(CString::new(path).expect("no NUL in test path"));
		self
	}

	pub fn as_native(&self) -> NativeEventRecord {
		NativeEventRecord {
			effect_time: self.effect_time,
			path_name: self.path_name.as_ref().map_or(ptr::null(), |s| s.as_ptr()),
			associated_path_name: self
				.associated_path_name
				.as_ref()
				.map_or(ptr::null(), |s| s.as_ptr()),
			effect_type: self.effect_type,
			path_type: self.path_type,
		}
	}
}
