//! Ambient configuration for the restructuring driver.

/// The one knob the driver exposes: whether block names are spelled out in
/// `log::debug!` records, or only counts. Defaults to off, since a full
/// hierarchy's worth of names in every log line is rarely what a caller
/// wants.
#[derive(Debug, Clone, Copy, Default)]
pub struct RestructureConfig {
    pub log_block_names: bool,
}
