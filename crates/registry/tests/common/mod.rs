pub mod fixtures;
pub mod mocks;

#[allow(unused_imports)]
pub use fixtures::{
    TestRegistry, archive_bytes, archive_with_values, filesystem_registry, memory_registry,
    registry_with_config, stored_content,
};
#[allow(unused_imports)]
pub use mocks::InstrumentedVersion;
