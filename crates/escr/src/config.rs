//! Engine configuration (§4.6, ambient).
//!
//! Deliberately small: the spec's Non-goals rule out a CLI, so there is no
//! flag parsing here, only the construction knobs `Engine::prepare` and
//! `Engine::execute` need internally. Grounded in the teacher's plain,
//! hand-written-`Default` configuration structs (`faxc-drv::Config`,
//! `fgc::config`) rather than a derive-heavy builder.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Overrides the resource name quoted in diagnostics. Left empty, the
    /// engine uses the name it already has - the `TextStream`'s or the one
    /// passed to `create_engine_from_parsed` - so this only matters when a
    /// host wants to re-label an engine it didn't construct.
    pub resource_name: String,
    /// Call `Basket::collect` once `prepare` finishes.
    pub collect_after_prepare: bool,
    /// Call `Basket::collect` after every top-level statement (§5.3, "may
    /// call collect opportunistically").
    pub collect_after_statement: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            resource_name: String::new(),
            collect_after_prepare: false,
            collect_after_statement: false,
        }
    }
}
