use std::time::Duration;

use readyroom::prelude::*;
use tracing_subscriber::EnvFilter;

const DEFAULT_PORT: u16 = 3001;

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Process settings read from the environment.
#[derive(Debug, PartialEq)]
struct Settings {
    port: u16,
    allowed_origin: Option<String>,
    room_ttl: Option<Duration>,
}

impl Settings {
    fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// `PORT` (default 3001), `ALLOWED_ORIGIN`, `ROOM_TTL_SECS`.
    fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, String> {
        let port = match lookup("PORT") {
            Some(raw) => raw.trim().parse().map_err(|_| {
                format!("PORT must be a port number, got {raw:?}")
            })?,
            None => DEFAULT_PORT,
        };
        let allowed_origin = lookup("ALLOWED_ORIGIN")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        let room_ttl = match lookup("ROOM_TTL_SECS") {
            Some(raw) => {
                let secs: u64 = raw.trim().parse().map_err(|_| {
                    format!("ROOM_TTL_SECS must be whole seconds, got {raw:?}")
                })?;
                (secs > 0).then(|| Duration::from_secs(secs))
            }
            None => None,
        };
        Ok(Self {
            port,
            allowed_origin,
            room_ttl,
        })
    }
}

// ---------------------------------------------------------------------------
// Server bootstrap
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = Settings::from_env()?;
    let addr = format!("0.0.0.0:{}", settings.port);
    tracing::info!(
        %addr,
        origin = ?settings.allowed_origin,
        "starting readyroom server"
    );

    let mut builder = ReadyRoomServer::builder()
        .bind(&addr)
        .room_config(RoomConfig {
            room_ttl: settings.room_ttl,
            ..RoomConfig::default()
        });
    if let Some(origin) = &settings.allowed_origin {
        builder = builder.allowed_origin(origin);
    }

    let server = builder.build().await?;
    server.run().await?;
    Ok(())
}
