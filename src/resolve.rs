//! Per-connection resolution: which blocks apply and what they set.
//!
//! 1. [`setup_connection`](ConfigTree::setup_connection) once per connection:
//!    built-in defaults, then everything the global block assigned.
//! 2. [`patch_connection`](ConfigTree::patch_connection) once per stage, as
//!    the attribute that stage exposes becomes known: every block for that
//!    stage whose header (and every enclosing header) matches is merged in
//!    file order.
//!
//! Both steps use [`EffectiveConfig::merge`], so a field is only ever
//! overwritten by a block that assigns it, and the last matching block wins.
//! No I/O and no errors: everything that can fail was checked at load.

use crate::builder::ConfigTree;
use crate::condition::{Connection, Stage, Variable, evaluate};
use crate::effective::EffectiveConfig;

impl ConfigTree {
    /// Reset `config` to the defaults overlaid with the global block.
    pub fn setup_connection(&self, config: &mut EffectiveConfig) {
        *config = EffectiveConfig::default();
        if let Some(global) = self.nodes.first() {
            config.merge(&global.record);
        }
    }

    /// Whether block `index` and all blocks enclosing it match `conn`.
    fn applies<C: Connection + ?Sized>(&self, index: usize, conn: &C) -> bool {
        let mut next = Some(index);
        while let Some(i) = next {
            let context = &self.nodes[i].context;
            match &context.selector {
                Some(selector) if evaluate(selector, conn) => {}
                _ => return false,
            }
            next = context.parent;
        }
        true
    }

    /// Merge every matching block of `stage` into `config`.
    pub fn patch_connection<C: Connection + ?Sized>(
        &self,
        conn: &C,
        config: &mut EffectiveConfig,
        stage: Stage,
    ) {
        for (index, node) in self.nodes.iter().enumerate().skip(1) {
            if node.context.stage != Some(stage) || !self.applies(index, conn) {
                continue;
            }
            tracing::trace!(context = %node.context.name, stage = %stage, "block applies");
            config.merge(&node.record);
        }
    }

    /// Setup followed by a patch for each of `stages`, in the order given.
    pub fn resolve<C: Connection + ?Sized>(&self, conn: &C, stages: &[Stage]) -> EffectiveConfig {
        let mut config = EffectiveConfig::default();
        self.setup_connection(&mut config);
        for &stage in stages {
            self.patch_connection(conn, &mut config, stage);
        }
        config
    }

    /// [`resolve`](Self::resolve) through every stage a request passes.
    pub fn resolve_all<C: Connection + ?Sized>(&self, conn: &C) -> EffectiveConfig {
        self.resolve(conn, &Variable::ALL)
    }
}
