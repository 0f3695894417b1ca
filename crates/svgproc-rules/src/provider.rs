//! Named configuration values for property lookups
//!
//! A [`Provider`] answers `name -> Option<String>`. Providers stack with
//! [`Provider::above`]: the upper one wins, the lower one is only asked when
//! the upper one knows nothing about a name.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

/// Source of named property values
pub trait PropertyProvider: Send + Sync {
    /// Look up a property. `None` means the property is not defined here.
    fn get(&self, name: &str) -> Option<String>;
}

impl<F> PropertyProvider for F
where
    F: Fn(&str) -> Option<String> + Send + Sync,
{
    fn get(&self, name: &str) -> Option<String> {
        self(name)
    }
}

impl PropertyProvider for HashMap<String, String> {
    fn get(&self, name: &str) -> Option<String> {
        HashMap::get(self, name).cloned()
    }
}

impl PropertyProvider for BTreeMap<String, String> {
    fn get(&self, name: &str) -> Option<String> {
        BTreeMap::get(self, name).cloned()
    }
}

struct Empty;

impl PropertyProvider for Empty {
    fn get(&self, _name: &str) -> Option<String> {
        None
    }
}

struct Stacked {
    upper: Provider,
    lower: Provider,
}

impl PropertyProvider for Stacked {
    fn get(&self, name: &str) -> Option<String> {
        self.upper.get(name).or_else(|| self.lower.get(name))
    }
}

/// Shared handle to a [`PropertyProvider`]
#[derive(Clone)]
pub struct Provider(Arc<dyn PropertyProvider>);

impl Provider {
    /// Wrap any provider implementation
    pub fn new(provider: impl PropertyProvider + 'static) -> Self {
        Self(Arc::new(provider))
    }

    /// A provider backed by a lookup function
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// The provider that knows no properties
    pub fn empty() -> Self {
        Self(Arc::new(Empty))
    }

    /// A provider answering from a fixed table
    pub fn from_map(map: HashMap<String, String>) -> Self {
        Self::new(map)
    }

    /// A provider answering from key-value pairs
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        pairs.into_iter().collect()
    }

    pub fn get(&self, name: &str) -> Option<String> {
        self.0.get(name)
    }

    /// Put this provider on top of `lower`, falling back to it for
    /// properties this one does not define.
    pub fn above(&self, lower: &Provider) -> Provider {
        Self::new(Stacked {
            upper: self.clone(),
            lower: lower.clone(),
        })
    }
}

impl Default for Provider {
    fn default() -> Self {
        Self::empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Provider {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let map: HashMap<String, String> = iter
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self::new(map)
    }
}

impl fmt::Debug for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Provider(..)")
    }
}
