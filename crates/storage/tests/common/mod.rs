pub mod fixtures;

#[allow(unused_imports)]
pub use fixtures::{
    Fixture, archive_bytes, package_name, populated_backends, space_name, version_number,
};
