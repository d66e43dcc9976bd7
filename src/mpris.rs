//! MPRIS client: player discovery on the session bus plus targeted
//! metadata and position reads.

use crate::lyrics::TrackIdentity;
use crate::sync::PlaybackSource;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::OnceCell;
use zbus::Proxy;
use zvariant::OwnedValue;

const MPRIS_PREFIX: &str = "org.mpris.MediaPlayer2.";
const MPRIS_PATH: &str = "/org/mpris/MediaPlayer2";
const PLAYER_IFACE: &str = "org.mpris.MediaPlayer2.Player";
const PROPERTIES_IFACE: &str = "org.freedesktop.DBus.Properties";

#[derive(thiserror::Error, Debug)]
pub enum MprisError {
    #[error("D-Bus error: {0}")]
    ZBus(#[from] zbus::Error),
    #[error("D-Bus call error: {0}")]
    Fdo(#[from] zbus::fdo::Error),
    #[error("Failed to establish D-Bus connection")]
    NoConnection,
}

/// Global D-Bus connection singleton
static DBUS_CONNECTION: OnceCell<Arc<zbus::Connection>> = OnceCell::const_new();

/// Get or create a shared D-Bus session connection
async fn get_dbus_conn() -> Result<Arc<zbus::Connection>, MprisError> {
    DBUS_CONNECTION
        .get_or_try_init(|| async {
            let conn = zbus::Connection::session()
                .await
                .map_err(|_| MprisError::NoConnection)?;
            Ok(Arc::new(conn))
        })
        .await
        .cloned()
}

/// Find the first MPRIS service on the bus, optionally restricted to names
/// containing `filter` (case-insensitive).
pub async fn find_player(filter: Option<&str>) -> Result<Option<String>, MprisError> {
    let conn = get_dbus_conn().await?;
    let proxy = zbus::fdo::DBusProxy::new(&conn).await?;
    let names = proxy.list_names().await?;
    let filter_lower = filter.map(str::to_lowercase);
    Ok(names
        .into_iter()
        .map(|name| name.to_string())
        .find(|name| {
            name.starts_with(MPRIS_PREFIX)
                && filter_lower
                    .as_deref()
                    .is_none_or(|f| name.to_lowercase().contains(f))
        }))
}

/// Handle to one MPRIS player service.
#[derive(Debug, Clone)]
pub struct Player {
    service: String,
}

impl Player {
    pub fn new(service: String) -> Self {
        Self { service }
    }

    // Targeted Properties.Get; avoids triggering GetAll on some players.
    async fn player_property(&self, name: &str) -> Result<OwnedValue, MprisError> {
        let conn = get_dbus_conn().await?;
        let proxy = Proxy::new(&conn, self.service.as_str(), MPRIS_PATH, PROPERTIES_IFACE).await?;
        let reply = proxy.call_method("Get", &(PLAYER_IFACE, name)).await?;
        Ok(reply.body().deserialize::<OwnedValue>()?)
    }

    /// Current track identity from the player's `Metadata` property.
    /// `mpris:length` (microseconds) is truncated to whole seconds.
    pub async fn identity(&self) -> Result<TrackIdentity, MprisError> {
        let value = self.player_property("Metadata").await?;
        let Ok(map) = HashMap::<String, OwnedValue>::try_from(value) else {
            return Ok(TrackIdentity::default());
        };
        let title = map
            .get("xesam:title")
            .and_then(string_or_first)
            .unwrap_or_default();
        let artist = map
            .get("xesam:artist")
            .and_then(string_or_first)
            .unwrap_or_default();
        let album = map
            .get("xesam:album")
            .and_then(string_or_first)
            .unwrap_or_default();
        let duration_secs = map
            .get("mpris:length")
            .and_then(micros)
            .map(|us| us / 1_000_000)
            .unwrap_or(0);
        Ok(TrackIdentity {
            title,
            artist,
            album,
            duration_secs,
        })
    }
}

impl PlaybackSource for Player {
    /// Current playback position in milliseconds. A value the player
    /// reports in an unexpected shape degrades to 0; a failed call (player
    /// gone) propagates so the session can be torn down.
    async fn position_ms(&self) -> Result<u64, MprisError> {
        let value = self.player_property("Position").await?;
        Ok(micros(&value).map(|us| (us / 1000).max(0) as u64).unwrap_or(0))
    }

    async fn current_title(&self) -> Result<String, MprisError> {
        Ok(self.identity().await?.title)
    }
}

/// Extract a string that might be a single value or the first in an array.
/// The MPRIS spec says artist is an array of strings, but some players send
/// a single string (and vice versa for album).
fn string_or_first(value: &OwnedValue) -> Option<String> {
    String::try_from(value.clone()).ok().or_else(|| {
        Vec::<String>::try_from(value.clone())
            .ok()
            .and_then(|v| v.into_iter().next())
    })
}

fn micros(value: &OwnedValue) -> Option<i64> {
    i64::try_from(value.clone())
        .ok()
        .or_else(|| u64::try_from(value.clone()).ok().map(|u| u as i64))
}
