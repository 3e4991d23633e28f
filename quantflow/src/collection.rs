use fnv::FnvBuildHasher;
use indexmap::{IndexMap, IndexSet};
use std::collections::{HashMap, HashSet};

/// [`IndexMap`] keyed with the [`fnv`] hasher. Preserves insertion order.
pub type FnvIndexMap<K, V> = IndexMap<K, V, FnvBuildHasher>;

/// [`IndexSet`] keyed with the [`fnv`] hasher. Preserves insertion order.
pub type FnvIndexSet<T> = IndexSet<T, FnvBuildHasher>;

/// [`HashMap`] keyed with the [`fnv`] hasher.
pub type FnvHashMap<K, V> = HashMap<K, V, FnvBuildHasher>;

/// [`HashSet`] keyed with the [`fnv`] hasher.
pub type FnvHashSet<T> = HashSet<T, FnvBuildHasher>;
