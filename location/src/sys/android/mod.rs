//! Android location implementation using JNI.
//!
//! Continuous updates are registered against a `PendingIntent` instead of a
//! `LocationListener`, so nothing beyond the framework classes is needed.
//! Nobody listens for the broadcast: the updates only keep the system's
//! last-known location fresh, which is what `getLastKnownLocation` reads.

use jni::objects::{GlobalRef, JObject, JString, JThrowable, JValue};
use jni::sys::jint;
use jni::{JNIEnv, JavaVM};

use crate::{
    Accuracy, LocationError, LocationPlatform, LocationResult, PermissionState, Position,
    UpdateConfig,
};

const UPDATE_ACTION: &str = "locbridge.intent.action.LOCATION_UPDATE";

/// `PendingIntent.FLAG_UPDATE_CURRENT`.
const FLAG_UPDATE_CURRENT: jint = 0x0800_0000;
/// `PendingIntent.FLAG_MUTABLE`; the system writes the fix into the intent.
const FLAG_MUTABLE: jint = 0x0200_0000;

/// Request code hosts pass to [`AndroidPlatform::new`] unless they already
/// use 1001 for something else.
pub const DEFAULT_PERMISSION_REQUEST_CODE: i32 = 1001;

/// Providers read when looking for a cached fix, most precise first.
const CACHED_PROVIDERS: [&str; 3] = ["gps", "network", "passive"];

const fn provider(accuracy: Accuracy) -> &'static str {
    match accuracy {
        Accuracy::Highest => "gps",
        Accuracy::Balanced => "network",
        Accuracy::Low => "passive",
    }
}

/// Handle for a registered update request.
#[derive(Debug)]
pub struct AndroidSubscription {
    intent: GlobalRef,
}

/// Location platform backed by the Android framework `LocationManager`.
pub struct AndroidPlatform {
    vm: JavaVM,
    activity: GlobalRef,
    request_code: i32,
}

impl std::fmt::Debug for AndroidPlatform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AndroidPlatform")
            .field("request_code", &self.request_code)
            .finish_non_exhaustive()
    }
}

impl AndroidPlatform {
    /// Create a platform bound to the host Activity.
    ///
    /// Permission prompts are reported to the Activity's
    /// `onRequestPermissionsResult` with `request_code`.
    ///
    /// # Errors
    /// Returns an error if the JVM handle or a global reference cannot be
    /// obtained.
    pub fn new(
        env: &JNIEnv<'_>,
        activity: &JObject<'_>,
        request_code: i32,
    ) -> LocationResult<Self> {
        let vm = env
            .get_java_vm()
            .map_err(|e| LocationError::Platform(format!("get_java_vm failed: {e}")))?;
        let activity = env
            .new_global_ref(activity)
            .map_err(|e| LocationError::Platform(format!("new_global_ref failed: {e}")))?;

        Ok(Self {
            vm,
            activity,
            request_code,
        })
    }

    /// Run `action` with an attached env inside its own local reference frame.
    fn with_env<T>(
        &self,
        action: impl FnOnce(&mut JNIEnv<'_>, &JObject<'_>) -> LocationResult<T>,
    ) -> LocationResult<T> {
        let mut env = self
            .vm
            .attach_current_thread()
            .map_err(|e| LocationError::Platform(format!("attach_current_thread failed: {e}")))?;
        let activity = self.activity.as_obj();

        env.with_local_frame(16, |env| action(env, activity))
    }
}

impl From<jni::errors::Error> for LocationError {
    fn from(err: jni::errors::Error) -> Self {
        Self::Platform(err.to_string())
    }
}

/// Converts a JNI failure into a [`LocationError`].
///
/// A pending Java exception is cleared; a `SecurityException` becomes
/// [`LocationError::PermissionDenied`] and anything else keeps the
/// exception's message.
fn checked<T>(env: &mut JNIEnv<'_>, result: jni::errors::Result<T>) -> LocationResult<T> {
    match result {
        Ok(value) => Ok(value),
        Err(jni::errors::Error::JavaException) => Err(take_exception(env)),
        Err(err) => Err(err.into()),
    }
}

fn take_exception(env: &mut JNIEnv<'_>) -> LocationError {
    let throwable = env.exception_occurred();
    let _ = env.exception_clear();
    let Ok(throwable) = throwable else {
        return LocationError::Platform("java exception".into());
    };

    if env
        .is_instance_of(&throwable, "java/lang/SecurityException")
        .unwrap_or(false)
    {
        return LocationError::PermissionDenied;
    }

    LocationError::Platform(describe(env, &throwable).unwrap_or_else(|| "java exception".into()))
}

/// Whether the pending Java exception is an instance of `class`.
fn pending_is(env: &mut JNIEnv<'_>, class: &str) -> bool {
    env.exception_occurred()
        .and_then(|throwable| env.is_instance_of(&throwable, class))
        .unwrap_or(false)
}

fn describe(env: &mut JNIEnv<'_>, throwable: &JThrowable<'_>) -> Option<String> {
    let text = env
        .call_method(throwable, "toString", "()Ljava/lang/String;", &[])
        .ok()?
        .l()
        .ok()?;
    let text = JString::from(text);
    env.get_string(&text).ok().map(Into::into)
}

fn location_manager<'local>(
    env: &mut JNIEnv<'local>,
    activity: &JObject<'_>,
) -> LocationResult<JObject<'local>> {
    let service = env.new_string("location");
    let service = checked(env, service)?;

    let manager = env.call_method(
        activity,
        "getSystemService",
        "(Ljava/lang/String;)Ljava/lang/Object;",
        &[JValue::Object(&service)],
    );
    let manager = checked(env, manager.and_then(|value| value.l()))?;

    if manager.is_null() {
        return Err(LocationError::Platform("no location service".into()));
    }
    Ok(manager)
}

fn update_intent<'local>(
    env: &mut JNIEnv<'local>,
    activity: &JObject<'_>,
) -> LocationResult<JObject<'local>> {
    let action = env.new_string(UPDATE_ACTION);
    let action = checked(env, action)?;
    let intent = env.new_object(
        "android/content/Intent",
        "(Ljava/lang/String;)V",
        &[JValue::Object(&action)],
    );
    let intent = checked(env, intent)?;

    // Mutable pending intents must be explicit on recent Android versions.
    let package = env.call_method(activity, "getPackageName", "()Ljava/lang/String;", &[]);
    let package = checked(env, package.and_then(|value| value.l()))?;
    let scoped = env.call_method(
        &intent,
        "setPackage",
        "(Ljava/lang/String;)Landroid/content/Intent;",
        &[JValue::Object(&package)],
    );
    checked(env, scoped)?;

    let pending = env.call_static_method(
        "android/app/PendingIntent",
        "getBroadcast",
        "(Landroid/content/Context;ILandroid/content/Intent;I)Landroid/app/PendingIntent;",
        &[
            JValue::Object(activity),
            JValue::Int(0),
            JValue::Object(&intent),
            JValue::Int(FLAG_UPDATE_CURRENT | FLAG_MUTABLE),
        ],
    );
    checked(env, pending.and_then(|value| value.l()))
}

fn cached_fix(
    env: &mut JNIEnv<'_>,
    manager: &JObject<'_>,
    provider_name: &str,
) -> LocationResult<Option<Position>> {
    let name = env.new_string(provider_name);
    let name = checked(env, name)?;

    let location = env.call_method(
        manager,
        "getLastKnownLocation",
        "(Ljava/lang/String;)Landroid/location/Location;",
        &[JValue::Object(&name)],
    );
    let location = location.and_then(|value| value.l());
    // Unknown providers throw IllegalArgumentException; that is no fix, not a
    // failure.
    if matches!(location, Err(jni::errors::Error::JavaException))
        && pending_is(env, "java/lang/IllegalArgumentException")
    {
        let _ = env.exception_clear();
        log::debug!("no cached fix from unknown provider {provider_name}");
        return Ok(None);
    }
    let location = checked(env, location)?;
    if location.is_null() {
        return Ok(None);
    }

    let latitude = env.call_method(&location, "getLatitude", "()D", &[]);
    let latitude = checked(env, latitude.and_then(|value| value.d()))?;
    let longitude = env.call_method(&location, "getLongitude", "()D", &[]);
    let longitude = checked(env, longitude.and_then(|value| value.d()))?;
    let accuracy = env.call_method(&location, "getAccuracy", "()F", &[]);
    let accuracy = checked(env, accuracy.and_then(|value| value.f()))?;
    let timestamp = env.call_method(&location, "getTime", "()J", &[]);
    let timestamp = checked(env, timestamp.and_then(|value| value.j()))?;

    Ok(Some(Position {
        latitude,
        longitude,
        accuracy: f64::from(accuracy),
        timestamp,
    }))
}

impl LocationPlatform for AndroidPlatform {
    type Subscription = AndroidSubscription;

    async fn check_permission(&self) -> LocationResult<PermissionState> {
        self.with_env(|env, activity| {
            locbridge_permission::sys::android::check(env, activity).map_err(Into::into)
        })
    }

    async fn request_permission(&self) -> LocationResult<()> {
        self.with_env(|env, activity| {
            locbridge_permission::sys::android::request(env, activity, self.request_code)
                .map_err(Into::into)
        })
    }

    async fn is_provider_enabled(&self) -> LocationResult<bool> {
        self.with_env(|env, activity| {
            let manager = location_manager(env, activity)?;
            let name = env.new_string(provider(Accuracy::Highest));
            let name = checked(env, name)?;

            let enabled = env.call_method(
                &manager,
                "isProviderEnabled",
                "(Ljava/lang/String;)Z",
                &[JValue::Object(&name)],
            );
            checked(env, enabled.and_then(|value| value.z()))
        })
    }

    async fn start_updates(&self, config: &UpdateConfig) -> LocationResult<AndroidSubscription> {
        self.with_env(|env, activity| {
            let manager = location_manager(env, activity)?;
            let intent = update_intent(env, activity)?;
            let name = env.new_string(provider(config.accuracy));
            let name = checked(env, name)?;
            let interval = i64::try_from(config.interval.as_millis()).unwrap_or(i64::MAX);

            let requested = env.call_method(
                &manager,
                "requestLocationUpdates",
                "(Ljava/lang/String;JFLandroid/app/PendingIntent;)V",
                &[
                    JValue::Object(&name),
                    JValue::Long(interval),
                    JValue::Float(0.0),
                    JValue::Object(&intent),
                ],
            );
            checked(env, requested)?;

            let intent = env.new_global_ref(&intent);
            let intent = checked(env, intent)?;
            Ok(AndroidSubscription { intent })
        })
    }

    async fn stop_updates(&self, subscription: &AndroidSubscription) -> LocationResult<()> {
        self.with_env(|env, activity| {
            let manager = location_manager(env, activity)?;
            let intent = subscription.intent.as_obj();

            let removed = env.call_method(
                &manager,
                "removeUpdates",
                "(Landroid/app/PendingIntent;)V",
                &[JValue::Object(intent)],
            );
            checked(env, removed)?;

            let cancelled = env.call_method(intent, "cancel", "()V", &[]);
            checked(env, cancelled)?;
            Ok(())
        })
    }

    async fn last_position(&self) -> LocationResult<Option<Position>> {
        self.with_env(|env, activity| {
            let manager = location_manager(env, activity)?;

            let mut freshest: Option<Position> = None;
            for name in CACHED_PROVIDERS {
                if let Some(fix) = cached_fix(env, &manager, name)? {
                    if freshest.is_none_or(|current| fix.timestamp > current.timestamp) {
                        freshest = Some(fix);
                    }
                }
            }
            Ok(freshest)
        })
    }
}
