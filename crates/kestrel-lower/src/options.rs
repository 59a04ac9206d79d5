//! Lowering configuration.

/// Options controlling a lowering run.
///
/// # Example
///
/// ```
/// use kestrel_lower::LoweringOptions;
///
/// let options = LoweringOptions::new()
///     .with_top_level_name("repl_entry")
///     .with_ir_dump(true);
/// assert!(options.dump_ir);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoweringOptions {
    /// Run the deferred pass over definitions pulled in from imports.
    pub emit_external_definitions: bool,
    /// Log the printed IR of every lowered function at `debug`.
    pub dump_ir: bool,
    /// Symbol name of the top-level function.
    pub top_level_name: String,
}

impl LoweringOptions {
    pub fn new() -> Self {
        Self {
            emit_external_definitions: true,
            dump_ir: false,
            top_level_name: "main".to_string(),
        }
    }

    pub fn with_external_definitions(mut self, enabled: bool) -> Self {
        self.emit_external_definitions = enabled;
        self
    }

    pub fn with_ir_dump(mut self, enabled: bool) -> Self {
        self.dump_ir = enabled;
        self
    }

    pub fn with_top_level_name<S: Into<String>>(mut self, name: S) -> Self {
        self.top_level_name = name.into();
        self
    }
}

impl Default for LoweringOptions {
    fn default() -> Self {
        Self::new()
    }
}
