use std::sync::Arc;

use crate::store::SecretStore;

pub(crate) const KEY_COLLECTION: &str = "API";
pub(crate) const KEY_DOCUMENT: &str = "gpt";

/// Reads the model API key from the secret store on every call. Nothing is
/// cached, so a key rotated in the store takes effect on the next request.
#[derive(Clone)]
pub(crate) struct KeyProvider {
    secrets: Arc<dyn SecretStore>,
}

impl KeyProvider {
    pub(crate) fn new(secrets: Arc<dyn SecretStore>) -> Self {
        Self { secrets }
    }

    /// `None` means the feature is unavailable, whether the document is
    /// missing or the read failed.
    pub(crate) fn fetch_key(&self) -> Option<String> {
        match self.secrets.read_secret(KEY_COLLECTION, KEY_DOCUMENT) {
            Ok(Some(key)) => Some(key),
            Ok(None) => {
                tracing::warn!(
                    collection = KEY_COLLECTION,
                    document = KEY_DOCUMENT,
                    "api key document does not exist"
                );
                None
            }
            Err(err) => {
                tracing::error!(error = %err, "api key fetch failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{anyhow, Result};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedSecrets {
        value: Result<Option<String>, String>,
        reads: AtomicUsize,
    }

    impl SecretStore for FixedSecrets {
        fn read_secret(&self, collection: &str, document: &str) -> Result<Option<String>> {
            assert_eq!((collection, document), (KEY_COLLECTION, KEY_DOCUMENT));
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.value.clone().map_err(|e| anyhow!(e))
        }
    }

    fn provider(value: Result<Option<String>, String>) -> (Arc<FixedSecrets>, KeyProvider) {
        let secrets = Arc::new(FixedSecrets {
            value,
            reads: AtomicUsize::new(0),
        });
        (secrets.clone(), KeyProvider::new(secrets))
    }

    #[test]
    fn present_key_is_returned() {
        let (_, keys) = provider(Ok(Some("sk-test".to_string())));
        assert_eq!(keys.fetch_key().as_deref(), Some("sk-test"));
    }

    #[test]
    fn missing_document_is_none() {
        let (_, keys) = provider(Ok(None));
        assert_eq!(keys.fetch_key(), None);
    }

    #[test]
    fn read_failure_is_swallowed_as_none() {
        let (_, keys) = provider(Err("store offline".to_string()));
        assert_eq!(keys.fetch_key(), None);
    }

    #[test]
    fn every_call_reads_the_store() {
        let (secrets, keys) = provider(Ok(Some("sk-test".to_string())));
        keys.fetch_key();
        keys.fetch_key();
        assert_eq!(secrets.reads.load(Ordering::SeqCst), 2);
    }
}
