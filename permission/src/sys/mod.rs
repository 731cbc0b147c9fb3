//! Platform-specific permission helpers.
//!
//! Each helper takes whatever platform handle it needs (an Activity on
//! Android, a `CLLocationManager` on Apple platforms) so callers own the
//! platform objects and nothing here is global.

/// Apple platform helpers (CoreLocation authorization).
#[cfg(any(target_os = "ios", target_os = "macos"))]
pub mod apple;

/// Android platform helpers (runtime permissions via JNI).
#[cfg(target_os = "android")]
pub mod android;

/// Linux helpers. There is no runtime prompt on Linux.
#[cfg(target_os = "linux")]
pub mod linux;
