//! Session token persistence
//!
//! Tokens are opaque strings stored verbatim; nothing here tracks expiry or
//! refreshes them.

use tracing::info;
use crate::error::Result;
use crate::forms::{Navigation, LOGIN_ROUTE};
use crate::store::KeyValueStore;

pub const ACCESS_TOKEN_KEY: &str = "accessToken";
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";

pub const LOGOUT_PROMPT: &str = "Are you sure you want to logout?";

pub fn access_token(store: &impl KeyValueStore) -> Option<String> {
    store.get(ACCESS_TOKEN_KEY).filter(|token| !token.is_empty())
}

pub fn refresh_token(store: &impl KeyValueStore) -> Option<String> {
    store.get(REFRESH_TOKEN_KEY).filter(|token| !token.is_empty())
}

/// Persist the access token and, when given, the refresh token
pub fn store_tokens(store: &mut impl KeyValueStore, access: &str, refresh: Option<&str>) -> Result<()> {
    store.set(ACCESS_TOKEN_KEY, access)?;
    if let Some(refresh) = refresh {
        store.set(REFRESH_TOKEN_KEY, refresh)?;
    }
    Ok(())
}

/// Drop both tokens and send the user back to the login screen
pub fn logout(store: &mut impl KeyValueStore) -> Result<Navigation> {
    store.remove(ACCESS_TOKEN_KEY)?;
    store.remove(REFRESH_TOKEN_KEY)?;
    info!("Session cleared");
    Ok(Navigation::immediate(LOGIN_ROUTE))
}
