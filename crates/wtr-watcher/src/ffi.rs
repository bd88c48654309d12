//! The C ABI shared with `libwatcher-c`.
//!
//! [`NativeEventRecord`] is the only type whose memory layout has to agree with the native
//! engine byte for byte. Field order follows the 0.12 generation of the C header:
//!
//! ```c
//! struct wtr_watcher_event {
//!     int64_t effect_time;
//!     char const* path_name;
//!     char const* associated_path_name;
//!     int8_t effect_type;
//!     int8_t path_type;
//! };
//! ```

use crate::{
	error::{Error, Result},
	event::{EffectType, Event, PathType},
};

use std::{
	ffi::{c_char, c_void, CStr},
	mem, ptr,
};

use chrono::{DateTime, Utc};
use static_assertions::const_assert_eq;

/// Event record as written by the native engine.
///
/// The string pointers are borrowed from the engine and only valid for the duration of
/// the callback invocation that received the record.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct NativeEventRecord {
	/// Nanoseconds since the Unix epoch
	pub effect_time: i64,
	pub path_name: *const c_char,
	pub associated_path_name: *const c_char,
	pub effect_type: i8,
	pub path_type: i8,
}

#[cfg(target_pointer_width = "64")]
const_assert_eq!(mem::size_of::<NativeEventRecord>(), 32);
const_assert_eq!(mem::align_of::<NativeEventRecord>(), mem::align_of::<i64>());
const_assert_eq!(mem::offset_of!(NativeEventRecord, effect_time), 0);
const_assert_eq!(mem::offset_of!(NativeEventRecord, path_name), 8);
const_assert_eq!(
	mem::offset_of!(NativeEventRecord, associated_path_name),
	8 + mem::size_of::<*const c_char>()
);
const_assert_eq!(
	mem::offset_of!(NativeEventRecord, effect_type),
	8 + 2 * mem::size_of::<*const c_char>()
);
const_assert_eq!(
	mem::offset_of!(NativeEventRecord, path_type),
	9 + 2 * mem::size_of::<*const c_char>()
);

impl Default for NativeEventRecord {
	fn default() -> Self {
		Self {
			effect_time: 0,
			path_name: ptr::null(),
			associated_path_name: ptr::null(),
			effect_type: EffectType::Other.into(),
			path_type: PathType::Other.into(),
		}
	}
}

/// `void (*)(struct wtr_watcher_event, void* context)`
pub type NativeCallback = unsafe extern "C" fn(record: NativeEventRecord, context: *mut c_void);

/// `void* wtr_watcher_open(char const* path, wtr_watcher_callback callback, void* context)`
pub type OpenFn = unsafe extern "C" fn(
	path: *const c_char,
	callback: NativeCallback,
	context: *mut c_void,
) -> *mut c_void;

/// `bool wtr_watcher_close(void* watcher)`
pub type CloseFn = unsafe extern "C" fn(watcher: *mut c_void) -> bool;

pub const OPEN_SYMBOL: &str = "wtr_watcher_open";
pub const CLOSE_SYMBOL: &str = "wtr_watcher_close";

/// Converts a native record into an [`Event`].
///
/// # Safety
///
/// Both string pointers of `record` must be either null or point to NUL-terminated
/// strings that stay alive for the duration of this call.
pub unsafe fn decode(record: &NativeEventRecord) -> Result<Event> {
	Ok(Event {
		path_name: c_chars_to_string(record.path_name, "path_name")?,
		effect_type: EffectType::try_from(record.effect_type).map_err(|value| {
			Error::InvalidEnumValue {
				field: "effect_type",
				value,
			}
		})?,
		path_type: PathType::try_from(record.path_type).map_err(|value| {
			Error::InvalidEnumValue {
				field: "path_type",
				value,
			}
		})?,
		effect_time: DateTime::<Utc>::from_timestamp_nanos(record.effect_time),
		associated_path_name: c_chars_to_string(
			record.associated_path_name,
			"associated_path_name",
		)?,
	})
}

/// A null pointer is an empty string; anything else has to be valid UTF-8.
unsafe fn c_chars_to_string(ptr: *const c_char, field: &'static str) -> Result<String> {
	if ptr.is_null() {
		return Ok(String::new());
	}

	CStr::from_ptr(ptr)
		.to_str()
		.map(ToOwned::to_owned)
		.map_err(|source| Error::Decode { field, source })
}
