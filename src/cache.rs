use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use ahash::RandomState;
use alembic_schema::{Name, SchemaSet};
use hashbrown::HashMap;
use log::debug;
use parking_lot::{RwLock, RwLockUpgradableReadGuard};

use crate::{builder::PlanBuilder, error::SchemaErrors, plan::Plans, resolve::GlobalBindings};

/// Thread-safe cache of frozen plan sets keyed by root type.
///
/// Each root type is built at most once. Concurrent requests for a root
/// that is being built wait for that build and observe its result.
#[derive(Default)]
pub struct PlanCache {
    plans: RwLock<HashMap<Name, Arc<Plans>, RandomState>>,
    builds: AtomicUsize,
}

impl PlanCache {
    pub fn new() -> Self {
        PlanCache::default()
    }

    /// Returns cached plans of the root type.
    pub fn get(&self, root: &str) -> Option<Arc<Plans>> {
        self.plans.read().get(root).cloned()
    }

    /// Returns cached plans of the root type, building them on first request.
    ///
    /// Failed builds are not cached.
    pub fn get_or_build(
        &self,
        root: &str,
        schemas: &SchemaSet,
        globals: &GlobalBindings,
    ) -> Result<Arc<Plans>, SchemaErrors> {
        if let Some(plans) = self.get(root) {
            return Ok(plans);
        }
        self.build(root, schemas, globals)
    }

    #[cold]
    fn build(
        &self,
        root: &str,
        schemas: &SchemaSet,
        globals: &GlobalBindings,
    ) -> Result<Arc<Plans>, SchemaErrors> {
        // Only one upgradable guard exists at a time,
        // so builds are serialized while readers proceed.
        let cache = self.plans.upgradable_read();
        if let Some(plans) = cache.get(root) {
            return Ok(plans.clone());
        }

        debug!("plan cache miss for `{}`", root);
        self.builds.fetch_add(1, Ordering::Relaxed);

        let mut builder = PlanBuilder::new(schemas, globals);
        builder.build(root);
        let plans = Arc::new(builder.finish()?);

        let mut cache = RwLockUpgradableReadGuard::upgrade(cache);
        cache.insert(Name::new(root), plans.clone());
        Ok(plans)
    }

    /// Number of builds performed.
    pub fn builds(&self) -> usize {
        self.builds.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.plans.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.plans.read().is_empty()
    }

    pub fn clear(&self) {
        self.plans.write().clear();
    }
}
