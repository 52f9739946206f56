// vesper-core - Interpreter configuration
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Interpreter configuration.

/// Maximum depth of non-tail evaluation before failing with a stack
/// overflow error.
pub const DEFAULT_MAX_DEPTH: usize = 10_000;

/// Settings fixed when an [`Interpreter`](crate::Interpreter) is created.
///
/// ```
/// use vesper_core::Config;
///
/// let config = Config::default()
///     .with_max_depth(500)
///     .with_check_shadowing(true);
/// assert_eq!(config.max_depth, 500);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Recursion limit for non-tail calls and nested evaluation
    pub max_depth: usize,
    /// Reject local bindings that shadow non-overwritable global functions
    pub check_shadowing: bool,
    /// Let `catch` handle security and namespace sealing errors
    pub catchable_security_errors: bool,
    /// Expand every top-level form completely before evaluating it
    pub macroexpand_on_load: bool,
    /// Report special form timings to the metrics sink
    pub collect_metrics: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            max_depth: DEFAULT_MAX_DEPTH,
            check_shadowing: false,
            catchable_security_errors: false,
            macroexpand_on_load: false,
            collect_metrics: false,
        }
    }
}

impl Config {
    #[must_use]
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    #[must_use]
    pub fn with_check_shadowing(mut self, enabled: bool) -> Self {
        self.check_shadowing = enabled;
        self
    }

    #[must_use]
    pub fn with_catchable_security_errors(mut self, enabled: bool) -> Self {
        self.catchable_security_errors = enabled;
        self
    }

    #[must_use]
    pub fn with_macroexpand_on_load(mut self, enabled: bool) -> Self {
        self.macroexpand_on_load = enabled;
        self
    }

    #[must_use]
    pub fn with_collect_metrics(mut self, enabled: bool) -> Self {
        self.collect_metrics = enabled;
        self
    }
}
