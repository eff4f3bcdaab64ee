//! Spawns `bundle_fixture` under several process environments and asserts
//! identical output: report bytes do not depend on cwd, locale, timezone or
//! unrelated environment.

use std::path::Path;
use std::process::Command;

fn workspace_root() -> String {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .expect("tests/ exists")
        .parent()
        .expect("workspace root exists")
        .to_string_lossy()
        .to_string()
}

fn run_variant(work_dir: &str, env_overrides: &[(&str, &str)]) -> String {
    let bin = env!("CARGO_BIN_EXE_bundle_fixture");
    let mut command = Command::new(bin);
    command
        .current_dir(work_dir)
        .env_remove("LC_ALL")
        .env_remove("LC_COLLATE")
        .env_remove("LANG")
        .env_remove("LANGUAGE")
        .env_remove("TZ");
    for &(key, val) in env_overrides {
        command.env(key, val);
    }

    let output = command.output().unwrap_or_else(|e| {
        panic!("failed to spawn {bin} (work_dir={work_dir}, overrides={env_overrides:?}): {e}")
    });
    assert!(
        output.status.success(),
        "bundle_fixture exited with {}: stderr={}",
        output.status,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout).expect("stdout is valid UTF-8")
}

#[test]
fn fixture_output_is_environment_independent() {
    let root = workspace_root();
    let baseline = run_variant(&root, &[]);

    assert!(baseline.contains("report_id=AER-v1:C1:U1:2026-01-01:2026-01-31\n"));
    assert!(baseline.contains("archive_verdict=PASS\n"));
    assert!(baseline.contains("dir_verdict=PASS\n"));
    assert_eq!(baseline.lines().count(), 6);

    let alt_cwd = std::env::temp_dir();
    let alt_cwd = alt_cwd.to_string_lossy();
    assert_eq!(baseline, run_variant(&alt_cwd, &[]), "output differs when cwd is {alt_cwd}");

    assert_eq!(
        baseline,
        run_variant(&root, &[("LC_ALL", "de_DE.UTF-8"), ("LANG", "de_DE.UTF-8")]),
        "output differs under a non-C locale"
    );

    for tz in ["America/New_York", "Asia/Kolkata", "Pacific/Kiritimati"] {
        assert_eq!(baseline, run_variant(&root, &[("TZ", tz)]), "output differs with TZ={tz}");
    }

    assert_eq!(
        baseline,
        run_variant(&root, &[("AER_NOISE", "should_not_matter"), ("HOME", "/nonexistent")]),
        "output differs with unrelated env vars"
    );
}
