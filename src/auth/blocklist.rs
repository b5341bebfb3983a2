use redis::aio::ConnectionManager;

use crate::auth::{AuthError, AuthResult};

const KEY_PREFIX: &str = "bookshelf:blocklist";

/// Shared Redis blocklist of revoked token identifiers.
///
/// Logout writes a marker keyed by jti with a TTL covering the token's
/// remaining validity; every authenticated request reads it. Entries are
/// garbage-collected by Redis, which bounds the store to logged-out tokens
/// still inside their original expiry window.
#[derive(Clone)]
pub struct TokenBlocklist {
    conn: ConnectionManager,
    ttl_secs: u64,
}

impl TokenBlocklist {
    /// Open the connection at process start; the manager reconnects on its
    /// own and the handle is cloned into request state.
    pub async fn connect(url: &str, ttl_secs: u64) -> AuthResult<Self> {
        let client = redis::Client::open(url).map_err(|err| AuthError::Redis(err.to_string()))?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|err| AuthError::Redis(err.to_string()))?;

        Ok(Self { conn, ttl_secs })
    }

    /// Record `jti` as revoked for the configured TTL.
    pub async fn revoke(&self, jti: &str) -> AuthResult<()> {
        let mut conn = self.conn.clone();
        redis::cmd("SET")
            .arg(Self::key(jti))
            .arg("revoked")
            .arg("EX")
            .arg(self.ttl_secs)
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(|err| AuthError::Redis(err.to_string()))?;

        log::info!(
            "token {jti} revoked; blocklist entry expires in {}s",
            self.ttl_secs
        );
        Ok(())
    }

    /// Presence of any value under the jti key means revoked.
    pub async fn is_revoked(&self, jti: &str) -> AuthResult<bool> {
        let mut conn = self.conn.clone();
        let exists: bool = redis::cmd("EXISTS")
            .arg(Self::key(jti))
            .query_async(&mut conn)
            .await
            .map_err(|err| AuthError::Redis(err.to_string()))?;

        Ok(exists)
    }

    fn key(jti: &str) -> String {
        format!("{KEY_PREFIX}:{jti}")
    }
}
