//! Android permission implementation using JNI.
//!
//! Calls straight into the host Activity (`checkSelfPermission`,
//! `requestPermissions`), so no helper classes need to be bundled.

use crate::{PermissionError, PermissionState};
use jni::JNIEnv;
use jni::objects::{JObject, JValue};
use jni::sys::jint;

/// `android.Manifest.permission.ACCESS_FINE_LOCATION`.
pub const FINE_LOCATION: &str = "android.permission.ACCESS_FINE_LOCATION";

/// `android.Manifest.permission.ACCESS_COARSE_LOCATION`.
pub const COARSE_LOCATION: &str = "android.permission.ACCESS_COARSE_LOCATION";

/// `PackageManager.PERMISSION_GRANTED`.
const PERMISSION_GRANTED: jint = 0;

/// Converts a JNI failure into a [`PermissionError`], clearing any pending
/// Java exception so the env stays usable.
fn checked<T>(env: &mut JNIEnv<'_>, result: jni::errors::Result<T>) -> Result<T, PermissionError> {
    result.map_err(|err| {
        if matches!(err, jni::errors::Error::JavaException) {
            let _ = env.exception_clear();
        }
        PermissionError::Platform(err.to_string())
    })
}

fn is_granted(
    env: &mut JNIEnv<'_>,
    context: &JObject<'_>,
    permission: &str,
) -> Result<bool, PermissionError> {
    let name = env.new_string(permission);
    let name = checked(env, name)?;

    let result = env.call_method(
        context,
        "checkSelfPermission",
        "(Ljava/lang/String;)I",
        &[JValue::Object(&name)],
    );
    let status = checked(env, result.and_then(|value| value.i()))?;

    Ok(status == PERMISSION_GRANTED)
}

/// Check the current location permission using a Context.
///
/// # Errors
/// Returns a [`PermissionError`] if a JNI call fails.
pub fn check(
    env: &mut JNIEnv<'_>,
    context: &JObject<'_>,
) -> Result<PermissionState, PermissionError> {
    let fine = is_granted(env, context, FINE_LOCATION)?;
    let coarse = is_granted(env, context, COARSE_LOCATION)?;
    Ok(PermissionState::from_grants(fine, coarse))
}

/// Show the system prompt for fine and coarse location.
///
/// Returns as soon as the prompt is requested; the user's answer is delivered
/// to the Activity's `onRequestPermissionsResult` with `request_code`.
///
/// # Errors
/// Returns a [`PermissionError`] if a JNI call fails.
pub fn request(
    env: &mut JNIEnv<'_>,
    activity: &JObject<'_>,
    request_code: i32,
) -> Result<(), PermissionError> {
    let string_class = env.find_class("java/lang/String");
    let string_class = checked(env, string_class)?;

    let permissions = env.new_object_array(2, &string_class, JObject::null());
    let permissions = checked(env, permissions)?;

    for (index, permission) in [FINE_LOCATION, COARSE_LOCATION].into_iter().enumerate() {
        let name = env.new_string(permission);
        let name = checked(env, name)?;
        #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
        let stored = env.set_object_array_element(&permissions, index as jint, &name);
        checked(env, stored)?;
    }

    let result = env.call_method(
        activity,
        "requestPermissions",
        "([Ljava/lang/String;I)V",
        &[JValue::Object(&permissions), JValue::Int(request_code)],
    );
    checked(env, result)?;

    log::debug!("requested location permission (request code {request_code})");
    Ok(())
}
