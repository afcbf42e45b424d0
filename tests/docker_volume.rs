//! Integration test: inspect a real Docker volume through
//! `LocalHost`.
//!
//! Requires Docker. Skipped in normal `cargo test` runs unless the
//! `integration` feature is enabled.

#![cfg(feature = "integration")]

use vcdeploy::volume::DbVolume;
use vcdeploy::{Host, LocalHost, Stack};

#[test]
fn inspect_created_volume() {
    let host = LocalHost::new();
    let stack = Stack::new("vcdeploy-it");
    let name = "vcdeploy-it_postgres_data";

    host.exec(&format!("docker volume create {name}"))
        .expect("docker volume create failed");

    let volume = DbVolume::new(&host, &stack, name);
    let info = volume.inspect().expect("inspect").expect("volume present");
    assert_eq!(info.name, name);

    host.exec(&format!("docker volume rm {name}"))
        .expect("docker volume rm failed");
    assert!(!volume.exists().expect("exists"));
}
