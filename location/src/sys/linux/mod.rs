//! Linux location implementation using the GeoClue2 D-Bus service.
//!
//! A GeoClue client stays alive only as long as the D-Bus connection that
//! created it, so the running client and its connection are kept together
//! and the subscription handle only names the client path.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use futures::lock::Mutex;
use zbus::Connection;
use zbus::zvariant::{OwnedObjectPath, OwnedValue, Value};

use crate::{
    Accuracy, LocationError, LocationPlatform, LocationResult, PermissionState, Position,
    UpdateConfig,
};

const GEOCLUE: &str = "org.freedesktop.GeoClue2";
const MANAGER_PATH: &str = "/org/freedesktop/GeoClue2/Manager";
const MANAGER_IFACE: &str = "org.freedesktop.GeoClue2.Manager";
const CLIENT_IFACE: &str = "org.freedesktop.GeoClue2.Client";
const LOCATION_IFACE: &str = "org.freedesktop.GeoClue2.Location";
const PROPERTIES_IFACE: &str = "org.freedesktop.DBus.Properties";

/// `GCLUE_ACCURACY_LEVEL_*` values.
const fn accuracy_level(accuracy: Accuracy) -> u32 {
    match accuracy {
        Accuracy::Highest => 8,
        Accuracy::Balanced => 6,
        Accuracy::Low => 4,
    }
}

/// Handle for a started GeoClue client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeoClueSubscription {
    client: OwnedObjectPath,
}

#[derive(Debug)]
struct ActiveClient {
    connection: Connection,
    client: OwnedObjectPath,
}

/// Location platform backed by GeoClue2.
#[derive(Debug)]
pub struct GeoCluePlatform {
    desktop_id: String,
    active: Mutex<Option<ActiveClient>>,
}

impl Default for GeoCluePlatform {
    fn default() -> Self {
        Self::new("locbridge")
    }
}

impl GeoCluePlatform {
    /// Create a platform that identifies itself to GeoClue as `desktop_id`.
    ///
    /// GeoClue matches the id against installed `.desktop` files when
    /// deciding whether to authorize the app.
    pub fn new(desktop_id: impl Into<String>) -> Self {
        Self {
            desktop_id: desktop_id.into(),
            active: Mutex::new(None),
        }
    }

    async fn create_client(
        &self,
        connection: &Connection,
        config: &UpdateConfig,
    ) -> LocationResult<OwnedObjectPath> {
        let (client,): (OwnedObjectPath,) = connection
            .call_method(Some(GEOCLUE), MANAGER_PATH, Some(MANAGER_IFACE), "GetClient", &())
            .await
            .map_err(|e| map_dbus_error("GeoClue2 not available", e))?
            .body()
            .deserialize()
            .map_err(|e| map_dbus_error("failed to parse client path", e))?;

        let interval = u32::try_from(config.interval.as_secs()).unwrap_or(u32::MAX);
        set_client_property(
            connection,
            &client,
            "DesktopId",
            Value::from(self.desktop_id.as_str()),
        )
        .await?;
        set_client_property(
            connection,
            &client,
            "RequestedAccuracyLevel",
            Value::from(accuracy_level(config.accuracy)),
        )
        .await?;
        set_client_property(connection, &client, "TimeThreshold", Value::from(interval)).await?;

        Ok(client)
    }
}

fn map_dbus_error(context: &str, err: zbus::Error) -> LocationError {
    if let zbus::Error::MethodError(name, _, _) = &err {
        if name.as_str().ends_with("AccessDenied") {
            return LocationError::PermissionDenied;
        }
    }
    LocationError::Platform(format!("{context}: {err}"))
}

async fn get_property(
    connection: &Connection,
    path: &str,
    interface: &str,
    name: &str,
) -> zbus::Result<OwnedValue> {
    connection
        .call_method(
            Some(GEOCLUE),
            path,
            Some(PROPERTIES_IFACE),
            "Get",
            &(interface, name),
        )
        .await?
        .body()
        .deserialize()
}

async fn set_client_property(
    connection: &Connection,
    client: &OwnedObjectPath,
    name: &str,
    value: Value<'_>,
) -> LocationResult<()> {
    connection
        .call_method(
            Some(GEOCLUE),
            client.as_str(),
            Some(PROPERTIES_IFACE),
            "Set",
            &(CLIENT_IFACE, name, value),
        )
        .await
        .map_err(|e| map_dbus_error(&format!("failed to set {name}"), e))?;
    Ok(())
}

async fn call_client(
    connection: &Connection,
    client: &OwnedObjectPath,
    method: &str,
) -> LocationResult<()> {
    connection
        .call_method(Some(GEOCLUE), client.as_str(), Some(CLIENT_IFACE), method, &())
        .await
        .map_err(|e| map_dbus_error(&format!("client {method} failed"), e))?;
    Ok(())
}

async fn location_f64(connection: &Connection, location: &str, name: &str) -> LocationResult<f64> {
    let value = get_property(connection, location, LOCATION_IFACE, name)
        .await
        .map_err(|e| map_dbus_error(&format!("failed to get {name}"), e))?;
    f64::try_from(value)
        .map_err(|e| LocationError::Platform(format!("failed to parse {name}: {e}")))
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
}

/// GeoClue reports `(seconds, microseconds)`; fall back to now if the
/// property is missing.
async fn location_timestamp(connection: &Connection, location: &str) -> i64 {
    let Ok(value) = get_property(connection, location, LOCATION_IFACE, "Timestamp").await else {
        return now_millis();
    };

    match <(u64, u64)>::try_from(Value::from(value)) {
        Ok((secs, micros)) => {
            let capture = Duration::from_secs(secs) + Duration::from_micros(micros);
            i64::try_from(capture.as_millis()).unwrap_or(i64::MAX)
        }
        Err(_) => now_millis(),
    }
}

impl LocationPlatform for GeoCluePlatform {
    type Subscription = GeoClueSubscription;

    async fn check_permission(&self) -> LocationResult<PermissionState> {
        Ok(locbridge_permission::sys::linux::check())
    }

    async fn request_permission(&self) -> LocationResult<()> {
        locbridge_permission::sys::linux::request();
        Ok(())
    }

    async fn is_provider_enabled(&self) -> LocationResult<bool> {
        let connection = Connection::system()
            .await
            .map_err(|e| map_dbus_error("D-Bus connection failed", e))?;

        let level = get_property(&connection, MANAGER_PATH, MANAGER_IFACE, "AvailableAccuracyLevel")
            .await
            .map_err(|e| map_dbus_error("GeoClue2 not available", e))?;
        let level = u32::try_from(level)
            .map_err(|e| LocationError::Platform(format!("failed to parse accuracy level: {e}")))?;

        Ok(level > 0)
    }

    async fn start_updates(&self, config: &UpdateConfig) -> LocationResult<GeoClueSubscription> {
        if !self.is_provider_enabled().await? {
            return Err(LocationError::ServiceDisabled);
        }

        let connection = Connection::system()
            .await
            .map_err(|e| map_dbus_error("D-Bus connection failed", e))?;
        let client = self.create_client(&connection, config).await?;
        call_client(&connection, &client, "Start").await?;

        log::debug!("started GeoClue client {}", client.as_str());
        *self.active.lock().await = Some(ActiveClient {
            connection,
            client: client.clone(),
        });

        Ok(GeoClueSubscription { client })
    }

    async fn stop_updates(&self, subscription: &GeoClueSubscription) -> LocationResult<()> {
        let mut active = self.active.lock().await;
        let Some(current) = active.as_ref().filter(|c| c.client == subscription.client) else {
            return Err(LocationError::Platform(format!(
                "no running GeoClue client at {}",
                subscription.client.as_str()
            )));
        };

        call_client(&current.connection, &current.client, "Stop").await?;
        let deleted = current
            .connection
            .call_method(
                Some(GEOCLUE),
                MANAGER_PATH,
                Some(MANAGER_IFACE),
                "DeleteClient",
                &(&current.client,),
            )
            .await;
        if let Err(err) = deleted {
            log::warn!("failed to delete GeoClue client {}: {err}", current.client.as_str());
        }

        *active = None;
        Ok(())
    }

    async fn last_position(&self) -> LocationResult<Option<Position>> {
        let active = self.active.lock().await;
        let Some(current) = active.as_ref() else {
            // GeoClue keeps no fix outside a running client.
            return Ok(None);
        };
        let connection = &current.connection;

        let location = get_property(connection, current.client.as_str(), CLIENT_IFACE, "Location")
            .await
            .map_err(|e| map_dbus_error("failed to get location", e))?;
        let location = OwnedObjectPath::try_from(location)
            .map_err(|e| LocationError::Platform(format!("failed to parse location path: {e}")))?;
        if location.as_str() == "/" {
            return Ok(None);
        }

        let location = location.as_str();
        Ok(Some(Position {
            latitude: location_f64(connection, location, "Latitude").await?,
            longitude: location_f64(connection, location, "Longitude").await?,
            accuracy: location_f64(connection, location, "Accuracy").await?,
            timestamp: location_timestamp(connection, location).await,
        }))
    }
}
