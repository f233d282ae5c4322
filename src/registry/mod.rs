//! Store and database registry
//!
//! Stores are declared once at startup; databases are named per store and
//! bound to a live façade on first open. The façade supervises its own
//! writer (respawn on crash); the registry's job is naming, lifecycle, and
//! rejecting unknown store names.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::database::{Database, DatabaseError, DatabaseOptions, DatabaseResult};
use crate::observability::LogEvent;
use crate::store::Store;

/// Declaration of one store
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Store name, unique within the registry
    pub name: String,
}

impl StoreConfig {
    /// Declare a store by name
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Startup configuration: the stores this node serves
#[derive(Debug, Clone, Default)]
pub struct RegistryConfig {
    /// Store declarations, applied in order
    pub stores: Vec<StoreConfig>,
}

impl RegistryConfig {
    /// A configuration with a single store named `default`
    pub fn single_default() -> Self {
        Self {
            stores: vec![StoreConfig::new("default")],
        }
    }
}

/// Names stores and open databases
#[derive(Debug)]
pub struct Registry {
    stores: HashMap<String, Arc<Store>>,
    databases: RwLock<HashMap<String, Arc<Database>>>,
}

impl Registry {
    /// Build the registry from startup configuration
    pub fn new(config: RegistryConfig) -> Self {
        let mut stores = HashMap::new();
        for declared in config.stores {
            LogEvent::info("store_opened").store(&declared.name).emit();
            stores.insert(declared.name.clone(), Arc::new(Store::in_memory(declared.name)));
        }

        Self {
            stores,
            databases: RwLock::new(HashMap::new()),
        }
    }

    /// Look up a declared store
    pub fn store(&self, name: &str) -> DatabaseResult<Arc<Store>> {
        self.stores
            .get(name)
            .cloned()
            .ok_or_else(|| DatabaseError::UnknownStore(name.to_string()))
    }

    /// Open a database, reusing the live façade when it is already open
    pub fn open_database(
        &self,
        store_name: &str,
        db_name: &str,
        options: &DatabaseOptions,
    ) -> DatabaseResult<Arc<Database>> {
        let key = registry_key(store_name, db_name);

        if let Ok(databases) = self.databases.read() {
            if let Some(db) = databases.get(&key) {
                return Ok(Arc::clone(db));
            }
        }

        let store = self.store(store_name)?;
        let db = Database::open(store, db_name, options)?;

        let mut databases = self
            .databases
            .write()
            .map_err(|_| DatabaseError::WriterStopped)?;
        // Another opener may have won the race
        if let Some(existing) = databases.get(&key) {
            return Ok(Arc::clone(existing));
        }
        databases.insert(key, Arc::clone(&db));
        Ok(db)
    }

    /// A database that is already open, if any
    pub fn database(&self, store_name: &str, db_name: &str) -> Option<Arc<Database>> {
        self.databases
            .read()
            .ok()
            .and_then(|dbs| dbs.get(&registry_key(store_name, db_name)).cloned())
    }

    /// Stop a database's writer and delete everything it stored
    pub async fn clean_database(&self, store_name: &str, db_name: &str) -> DatabaseResult<()> {
        let key = registry_key(store_name, db_name);
        let open = self
            .databases
            .write()
            .ok()
            .and_then(|mut dbs| dbs.remove(&key));

        let db = match open {
            Some(db) => db,
            // Not open: bind to it without creating, then clean
            None => {
                let store = self.store(store_name)?;
                Database::open(
                    store,
                    db_name,
                    &DatabaseOptions {
                        create_if_missing: false,
                    },
                )?
            }
        };

        db.clean().await
    }

    /// Number of currently open databases
    pub fn open_count(&self) -> usize {
        self.databases.read().map(|dbs| dbs.len()).unwrap_or(0)
    }
}

fn registry_key(store_name: &str, db_name: &str) -> String {
    format!("{}/{}", store_name, db_name)
}
