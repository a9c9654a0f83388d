#![deny(unused_must_use)]
#![forbid(unsafe_code)]
// Don't allow dbg! prints in release.
#![cfg_attr(not(debug_assertions), deny(clippy::dbg_macro))]

pub use classify::{ResourceType, TargetOs, classify_resource_type, classify_target_os};
pub use ne_header::{ApplicationType, ModuleFlags, NeHeader, Os2Flags};
pub use ne_parser::{
    NameInfoPolicy, NeExecutable, NeParser, ParserSettings, ReadSeek, ResourceTableBase,
    decode_executable, decode_executable_with,
};
pub use ne_resource_table::{ResourceTable, ResourceTypeEntry, ResourceTypeMetadata};

pub mod classify;
pub mod err;
pub mod ne_header;
pub mod ne_output;
pub mod ne_parser;
pub mod ne_resource_table;

mod utils;

#[cfg(test)]
use std::sync::Once;
#[cfg(test)]
static LOGGER_INIT: Once = Once::new();

// Rust runs the tests concurrently, so unless we synchronize logging access
// it will crash when attempting to run `cargo test` with some logging facilities.
#[cfg(test)]
pub fn ensure_env_logger_initialized() {
    use std::io::Write;

    LOGGER_INIT.call_once(|| {
        let mut builder = env_logger::Builder::from_default_env();
        builder
            .format(|buf, record| writeln!(buf, "[{}] - {}", record.level(), record.args()))
            .init();
    });
}
