//! Session construction.

use std::sync::Arc;

use crate::caches::Caches;
use crate::config::DbSetting;
use crate::driver::Connection;
use crate::result_cache::ResultCache;
use crate::statement::{AnsiStatementBuilder, StatementBuilder};
use crate::trace::Trace;

use super::session::Session;

/// Wires a connection into a [`Session`].
///
/// ```ignore
/// let session = SessionBuilder::new()
///     .setting(DbSetting { max_parameters: 999, ..DbSetting::default() })
///     .trace(Arc::new(TracingTrace))
///     .result_cache(Arc::new(MemoryCache::new()))
///     .build(conn);
/// ```
#[derive(Default)]
pub struct SessionBuilder {
    setting: Option<DbSetting>,
    builder: Option<Arc<dyn StatementBuilder>>,
    caches: Option<Arc<Caches>>,
    trace: Option<Arc<dyn Trace>>,
    result_cache: Option<Arc<dyn ResultCache>>,
}

impl SessionBuilder {
    /// Starts from the defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the session settings.
    pub fn setting(mut self, setting: DbSetting) -> Self {
        self.setting = Some(setting);
        self
    }

    /// Sets the statement builder. Defaults to an [`AnsiStatementBuilder`]
    /// configured from the settings.
    pub fn statement_builder(mut self, builder: Arc<dyn StatementBuilder>) -> Self {
        self.builder = Some(builder);
        self
    }

    /// Uses a private cache bundle instead of [`Caches::global`].
    pub fn caches(mut self, caches: Arc<Caches>) -> Self {
        self.caches = Some(caches);
        self
    }

    /// Sets the trace hook.
    pub fn trace(mut self, trace: Arc<dyn Trace>) -> Self {
        self.trace = Some(trace);
        self
    }

    /// Sets the result cache used by reads with a cache key.
    pub fn result_cache(mut self, cache: Arc<dyn ResultCache>) -> Self {
        self.result_cache = Some(cache);
        self
    }

    /// Builds the session.
    pub fn build<C: Connection>(self, conn: C) -> Session<C> {
        let setting = self.setting.unwrap_or_default();
        let builder: Arc<dyn StatementBuilder> = match self.builder {
            Some(builder) => builder,
            None => Arc::new(AnsiStatementBuilder::new(&setting)),
        };
        Session {
            conn,
            setting: Arc::new(setting),
            builder,
            caches: self.caches.unwrap_or_else(Caches::global),
            trace: self.trace,
            result_cache: self.result_cache,
            transaction: false,
        }
    }
}
