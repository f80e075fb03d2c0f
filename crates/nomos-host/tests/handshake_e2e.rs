// SPDX-License-Identifier: MIT OR Apache-2.0
// End-to-end tests against a real subprocess speaking the provider
// protocol, using a minimal Python fixture: a real process, not a
// mock.
//
// Requirements: `python3` on PATH.
//
// Run manually with: cargo test --test handshake_e2e -- --ignored

use nomos_host::ProviderHost;
use std::path::PathBuf;

fn python3_available() -> bool {
    std::process::Command::new("python3")
        .arg("--version")
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .is_ok()
}

macro_rules! require_python {
    () => {
        if !python3_available() {
            eprintln!("SKIP: python3 not found on PATH");
            return;
        }
    };
}

const FIXTURE: &str = include_str!("fixtures/fake_provider.py");

#[cfg(unix)]
fn install_fixture() -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let dir = std::env::temp_dir().join("nomos-host-test-fixtures");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("fake_provider.py");
    std::fs::write(&path, format!("#!/usr/bin/env python3\n{FIXTURE}")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

#[cfg(unix)]
#[tokio::test]
#[ignore]
async fn full_round_trip_against_a_real_provider_subprocess() {
    require_python!();
    let script = install_fixture();

    let host = ProviderHost::new();
    let handle = host.get_provider("db", &script).await.unwrap();
    drop(handle);

    host.init("db", std::collections::BTreeMap::new(), "/tmp/a.csl")
        .await
        .unwrap();

    let value = host.fetch("db", &["anything".to_string()]).await.unwrap();
    assert_eq!(value, nomos_core::Value::Int(42));

    // Second call is the O(1) cache-hit path; same subprocess, no
    // re-spawn or re-handshake.
    let value_again = host.fetch("db", &["anything".to_string()]).await.unwrap();
    assert_eq!(value_again, nomos_core::Value::Int(42));

    host.shutdown().await.unwrap();
}
