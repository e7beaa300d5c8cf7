//! Opt-in process-wide client.
//!
//! Building a [`Tmv1Client`] sets up a connection pool, so callers that
//! construct clients on demand can share one through [`shared_client`]. The
//! registry holds a single entry: asking with the same configuration returns
//! the cached client, asking with a different one replaces it. Clients
//! already handed out keep working after a replacement.

use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

use tracing::debug;

use crate::client::Tmv1Client;
use crate::config::ClientConfig;

type Entry = Option<(ClientConfig, Arc<Tmv1Client>)>;

static SHARED: OnceLock<Mutex<Entry>> = OnceLock::new();

fn lock_entry() -> MutexGuard<'static, Entry> {
    SHARED
        .get_or_init(|| Mutex::new(None))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Returns the shared client for `config`, building it when the registry
/// is empty or holds a client built from a different configuration.
///
/// # Errors
///
/// `Tmv1Error::Config` or `Tmv1Error::Network` when a new client cannot be
/// built; the previous entry is kept in that case.
pub fn shared_client(config: &ClientConfig) -> crate::error::Result<Arc<Tmv1Client>> {
    let mut entry = lock_entry();
    if let Some((_, client)) = entry.as_ref().filter(|(cached, _)| cached == config) {
        return Ok(Arc::clone(client));
    }
    let client = Arc::new(Tmv1Client::new(config)?);
    debug!(app = %config.app_name, "shared client (re)built");
    *entry = Some((config.clone(), Arc::clone(&client)));
    Ok(client)
}

/// Drops the cached client, if any.
pub fn clear() {
    *lock_entry() = None;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProxySettings;

    fn config(token: &str) -> ClientConfig {
        ClientConfig::new("registry-test", token, "http://127.0.0.1:9")
            .with_proxy(ProxySettings::default())
    }

    // The registry is process-wide, so the scenarios run in one test.
    #[test]
    fn reuses_until_config_changes() {
        let first = shared_client(&config("token-a")).unwrap();
        let again = shared_client(&config("token-a")).unwrap();
        assert!(Arc::ptr_eq(&first, &again));

        let replaced = shared_client(&config("token-b")).unwrap();
        assert!(!Arc::ptr_eq(&first, &replaced));

        let bad = ClientConfig::new("registry-test", "token-c", "not a url")
            .with_proxy(ProxySettings::default());
        assert!(shared_client(&bad).is_err());
        let kept = shared_client(&config("token-b")).unwrap();
        assert!(Arc::ptr_eq(&replaced, &kept));

        clear();
        let rebuilt = shared_client(&config("token-b")).unwrap();
        assert!(!Arc::ptr_eq(&replaced, &rebuilt));
    }
}
