//! Runtime settings the transport consults.

/// Settings surface for the live component system.
#[derive(Debug, Clone)]
pub struct LivelyConfig {
    /// Verbose logging plus component-unknown responses for bad UIDs.
    pub debug: bool,

    /// Whether a component-unknown response asks the client to reload the
    /// page. Evicted registry entries recover this way.
    pub reload_on_unknown_components: bool,

    /// Upper bound for a single inbound frame payload, in bytes.
    pub max_message_size: Option<usize>,
}

impl Default for LivelyConfig {
    fn default() -> Self {
        Self {
            debug: false,
            reload_on_unknown_components: true,
            max_message_size: Some(1 << 20),
        }
    }
}
