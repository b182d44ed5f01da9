//! Process-wide cache of codec plans.
//!
//! Plans are keyed by [`DeclId`] and never evicted: a declaration is planned
//! at most once per cache, and every later lookup is a read-locked map hit.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;
use tessera_core::{ConfigError, DeclId, TypeDecl, describe};

use crate::{CodecPlan, plan_in};

static GLOBAL: OnceLock<PlanCache> = OnceLock::new();

/// Write-once, read-many store of [`CodecPlan`]s.
#[derive(Default)]
pub struct PlanCache {
    plans: RwLock<HashMap<DeclId, Arc<CodecPlan>>>,
}

impl PlanCache {
    /// An empty cache, independent of the global one.
    pub fn new() -> Self {
        Self::default()
    }

    /// The cache shared by every codec in the process.
    pub fn global() -> &'static PlanCache {
        GLOBAL.get_or_init(PlanCache::new)
    }

    /// Get the plan of `decl`, building it on first use.
    ///
    /// Planning runs without the lock held. When two threads race on the same
    /// declaration, the first plan inserted is the one everybody gets.
    pub fn get_or_plan(&self, decl: &Arc<TypeDecl>) -> Result<Arc<CodecPlan>, ConfigError> {
        // Fast path: check read lock first
        if let Some(plan) = self.get(decl.id()) {
            return Ok(plan);
        }

        // Slow path: plan and insert
        let planned = Arc::new(plan_in(self, describe(decl)?)?);
        let mut plans = self.plans.write();
        // Double-check in case another thread planned while we were planning
        let plan = plans.entry(decl.id()).or_insert(planned);
        debug!(type_name = decl.name(), "plan cache: inserted");
        Ok(Arc::clone(plan))
    }

    /// Look up an already built plan.
    pub fn get(&self, id: DeclId) -> Option<Arc<CodecPlan>> {
        self.plans.read().get(&id).cloned()
    }

    /// Number of cached plans.
    pub fn len(&self) -> usize {
        self.plans.read().len()
    }

    /// Whether nothing has been planned yet.
    pub fn is_empty(&self) -> bool {
        self.plans.read().is_empty()
    }
}

impl core::fmt::Debug for PlanCache {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PlanCache")
            .field("plans", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_core::{FieldDecl, SemanticKind};

    #[test]
    fn plans_are_built_once() {
        let cache = PlanCache::new();
        let decl = TypeDecl::builder("Once")
            .field(FieldDecl::new("A", SemanticKind::Bool))
            .build();

        let first = cache.get_or_plan(&decl).unwrap();
        let second = cache.get_or_plan(&decl).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn nested_types_share_the_cache() {
        let cache = PlanCache::new();
        let inner = TypeDecl::builder("Inner").build();
        let outer = TypeDecl::builder("Outer")
            .field(FieldDecl::new("Inner", SemanticKind::Object(Arc::clone(&inner))))
            .build();

        cache.get_or_plan(&outer).unwrap();
        assert!(cache.get(inner.id()).is_some());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn failed_plans_are_not_cached() {
        let cache = PlanCache::new();
        let decl = TypeDecl::builder("Bad")
            .field(FieldDecl::new("A", SemanticKind::I32).rename("x"))
            .field(FieldDecl::new("B", SemanticKind::I32).rename("x"))
            .build();
        assert!(cache.get_or_plan(&decl).is_err());
        assert!(cache.is_empty());
    }
}
