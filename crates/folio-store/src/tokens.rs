//! `TokenStore` implementation

use crate::rows::ts;
use crate::SqliteCatalog;
use async_trait::async_trait;
use chrono::Utc;
use folio_domain::traits::TokenStore;
use folio_domain::{OAuthToken, PortError};
use rusqlite::{params, OptionalExtension};

#[async_trait]
impl TokenStore for SqliteCatalog {
    async fn load(&self, account: &str) -> Result<Option<OAuthToken>, PortError> {
        let account = account.to_string();
        let token = self
            .with_conn(move |conn| {
                Ok(conn
                    .query_row(
                        "SELECT access_token, refresh_token, expires_at_ms, scope, token_type \
                         FROM oauth_tokens WHERE account = ?1",
                        params![account],
                        |row| {
                            Ok(OAuthToken {
                                access_token: row.get(0)?,
                                refresh_token: row.get(1)?,
                                expires_at_ms: row.get(2)?,
                                scope: row.get(3)?,
                                token_type: row.get(4)?,
                            })
                        },
                    )
                    .optional()?)
            })
            .await?;
        Ok(token)
    }

    async fn save(&self, account: &str, token: &OAuthToken) -> Result<(), PortError> {
        let account = account.to_string();
        let token = token.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO oauth_tokens \
                 (account, access_token, refresh_token, expires_at_ms, scope, token_type, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7) \
                 ON CONFLICT(account) DO UPDATE SET \
                 access_token = excluded.access_token, \
                 refresh_token = COALESCE(excluded.refresh_token, oauth_tokens.refresh_token), \
                 expires_at_ms = excluded.expires_at_ms, \
                 scope = excluded.scope, \
                 token_type = excluded.token_type, \
                 updated_at = excluded.updated_at",
                params![
                    account,
                    token.access_token,
                    token.refresh_token,
                    token.expires_at_ms,
                    token.scope,
                    token.token_type,
                    ts(&Utc::now()),
                ],
            )?;
            Ok(())
        })
        .await?;
        Ok(())
    }
}
