use std::path::PathBuf;
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

fn bin_path() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_tricorr"))
}

fn tmp_path(filename: &str) -> PathBuf {
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
    let mut p = std::env::temp_dir();
    p.push(format!("tricorr_cli_{}_{}_{}", std::process::id(), nanos, filename));
    p
}

fn run(args: &[&str]) -> Output {
    Command::new(bin_path())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("failed to run {:?} {:?}: {}", bin_path(), args, e))
}

/// Clean two-bin-by-two-bin stream: two same and two mixed events in the
/// (low multiplicity, low vertex) bin, one trigger-only same event in the
/// (high, high) bin. The mixed associates sit at the trigger angle so the
/// triplets land in the peak low-angle cell.
fn write_clean_events(path: &PathBuf) {
    let lines = [
        r#"{"mult": 25.0, "vz": -5.0, "candidates": [{"pt": 9.0, "phi": 1.0, "eta": 0.2}, {"pt": 4.0, "phi": 0.3, "eta": 0.5}, {"pt": 5.0, "phi": 1.5, "eta": -0.3}]}"#,
        r#"{"mult": 25.0, "vz": -5.0, "sample": "mixed", "candidates": [{"pt": 9.0, "phi": 1.0, "eta": 0.2}, {"pt": 4.0, "phi": 1.0, "eta": 0.201}, {"pt": 5.0, "phi": 1.0, "eta": 0.199}]}"#,
        r#"{"mult": 25.0, "vz": -5.0, "candidates": [{"pt": 9.0, "phi": 1.0, "eta": 0.2}, {"pt": 4.0, "phi": 0.3, "eta": 0.5}, {"pt": 5.0, "phi": 1.5, "eta": -0.3}]}"#,
        r#"{"mult": 25.0, "vz": -5.0, "sample": "mixed", "candidates": [{"pt": 9.0, "phi": 1.0, "eta": 0.2}, {"pt": 4.0, "phi": 1.0, "eta": 0.201}, {"pt": 5.0, "phi": 1.0, "eta": 0.199}]}"#,
        r#"{"mult": 75.0, "vz": 5.0, "candidates": [{"pt": 10.0, "phi": 2.0, "eta": -0.1}]}"#,
    ];
    std::fs::write(path, lines.join("\n")).unwrap();
}

fn run_over(events: &PathBuf, snapshot: &PathBuf, output: &PathBuf) {
    let out = run(&[
        "run",
        "--events",
        events.to_string_lossy().as_ref(),
        "--mult-edges",
        "0,50,100",
        "--vz-edges",
        "-10,0,10",
        "--snapshot",
        snapshot.to_string_lossy().as_ref(),
        "--output",
        output.to_string_lossy().as_ref(),
    ]);
    assert!(
        out.status.success(),
        "run should succeed, stderr={}",
        String::from_utf8_lossy(&out.stderr)
    );
}

/// Check the result-store shape and return the "floor" variant group.
fn assert_results_contract(v: &serde_json::Value) -> &serde_json::Value {
    assert_eq!(
        v.get("schema_version").and_then(|x| x.as_str()),
        Some("1.0.0"),
        "schema_version mismatch"
    );
    let group = v
        .get("variants")
        .and_then(|x| x.get("floor"))
        .expect("variants should contain the floor group");
    assert_eq!(group.get("variant").and_then(|x| x.as_str()), Some("floor"));

    let totals = group.get("totals").and_then(|x| x.as_array()).expect("totals should be an array");
    assert_eq!(totals.len(), 9, "one total per diagnostic spectrum");
    assert_eq!(totals[0].get("name").and_then(|x| x.as_str()), Some("pt"));

    let bins = group.get("bins").and_then(|x| x.as_array()).expect("bins should be an array");
    assert_eq!(bins.len(), 4, "2x2 binning should produce 4 groups");
    for bin in bins {
        for key in ["mult_bin", "vz_bin", "same_event", "mixed_event", "peaks", "divided"] {
            assert!(bin.get(key).is_some(), "bin group missing '{key}'");
        }
        let stats = bin.get("bin_stats").and_then(|x| x.as_array()).expect("bin_stats array");
        assert_eq!(stats.len(), 10, "nine spectra plus the trigger count");
    }
    group
}

fn entries(hist: &serde_json::Value) -> f64 {
    hist.get("entries").and_then(|x| x.as_f64()).expect("histogram entries")
}

#[test]
fn version_smoke() {
    let out = run(&["--version"]);
    assert!(out.status.success(), "--version should succeed");
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("tricorr"), "unexpected stdout: {}", stdout);
}

#[test]
fn run_writes_results_and_snapshot() {
    let events = tmp_path("events.jsonl");
    let snapshot = tmp_path("snap.json");
    let output = tmp_path("results.json");
    write_clean_events(&events);

    run_over(&events, &snapshot, &output);

    let v: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&output).unwrap()).expect("results should be JSON");
    let group = assert_results_contract(&v);

    // Bin groups come out multiplicity-major, so (0, 0) is first.
    let bin = &group["bins"][0];
    assert_eq!(bin["mult_bin"], 0);
    assert_eq!(bin["vz_bin"], 0);
    assert_eq!(bin["mult_range"], serde_json::json!([0.0, 50.0]));
    assert_eq!(bin["vz_range"], serde_json::json!([-10.0, 0.0]));

    // Two mixed triplets in the peak cell, two accepted same-event triggers.
    assert_eq!(bin["peaks"]["dphi1_dphi2"], serde_json::json!(2.0));
    assert_eq!(entries(&bin["same_event"]["trigger_count"]), 2.0);

    let snap: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&snapshot).unwrap()).expect("snapshot should be JSON");
    assert_eq!(snap["schema_version"], "1.0.0");
    assert_eq!(snap["pair"]["same"]["name"], "tricorr_same");
    assert_eq!(snap["pair"]["mixed"]["name"], "tricorr_mixed");

    for p in [&events, &snapshot, &output] {
        let _ = std::fs::remove_file(p);
    }
}

#[test]
fn report_reproduces_the_run_output() {
    let events = tmp_path("events.jsonl");
    let snapshot = tmp_path("snap.json");
    let output = tmp_path("results.json");
    write_clean_events(&events);
    run_over(&events, &snapshot, &output);

    let out = run(&["report", "--snapshot", snapshot.to_string_lossy().as_ref()]);
    assert!(
        out.status.success(),
        "report should succeed, stderr={}",
        String::from_utf8_lossy(&out.stderr)
    );

    let reported: serde_json::Value =
        serde_json::from_slice(&out.stdout).expect("report stdout should be JSON");
    let ran: serde_json::Value = serde_json::from_slice(&std::fs::read(&output).unwrap()).unwrap();
    assert_eq!(reported, ran, "assembling a reloaded snapshot must match the original run");

    for p in [&events, &snapshot, &output] {
        let _ = std::fs::remove_file(p);
    }
}

#[test]
fn merge_folds_snapshots_and_skips_incompatible_binning() {
    let events = tmp_path("events.jsonl");
    let snap_a = tmp_path("snap_a.json");
    let snap_b = tmp_path("snap_b.json");
    let out_a = tmp_path("results_a.json");
    let out_b = tmp_path("results_b.json");
    write_clean_events(&events);
    run_over(&events, &snap_a, &out_a);
    run_over(&events, &snap_b, &out_b);

    // A snapshot with different bin edges must be skipped, not mixed in.
    let snap_c = tmp_path("snap_c.json");
    let out_c = tmp_path("results_c.json");
    let out = run(&[
        "run",
        "--events",
        events.to_string_lossy().as_ref(),
        "--mult-edges",
        "0,100",
        "--snapshot",
        snap_c.to_string_lossy().as_ref(),
        "--output",
        out_c.to_string_lossy().as_ref(),
    ]);
    assert!(out.status.success(), "stderr={}", String::from_utf8_lossy(&out.stderr));

    let merged = tmp_path("merged.json");
    let out = run(&[
        "merge",
        "-o",
        merged.to_string_lossy().as_ref(),
        snap_a.to_string_lossy().as_ref(),
        snap_b.to_string_lossy().as_ref(),
        snap_c.to_string_lossy().as_ref(),
    ]);
    assert!(out.status.success(), "merge should succeed, stderr={}", String::from_utf8_lossy(&out.stderr));

    let out = run(&[
        "report",
        "--snapshot",
        merged.to_string_lossy().as_ref(),
    ]);
    assert!(out.status.success(), "stderr={}", String::from_utf8_lossy(&out.stderr));
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    let group = assert_results_contract(&v);

    // Both compatible snapshots folded in, the incompatible one ignored.
    let bin = &group["bins"][0];
    assert_eq!(bin["peaks"]["dphi1_dphi2"], serde_json::json!(4.0));
    assert_eq!(entries(&bin["same_event"]["trigger_count"]), 4.0);

    for p in [&events, &snap_a, &snap_b, &snap_c, &out_a, &out_b, &out_c, &merged] {
        let _ = std::fs::remove_file(p);
    }
}

#[test]
fn run_tolerates_malformed_and_out_of_range_records() {
    let events = tmp_path("events.jsonl");
    let output = tmp_path("results.json");
    let mut lines = vec![
        r#"{"mult": 25.0, "vz": -5.0, "candidates": [{"pt": 9.0, "phi": 1.0, "eta": 0.2}]}"#.to_string(),
        "not json at all".to_string(),
        r#"{"mult": 150.0, "vz": 0.0}"#.to_string(),
        String::new(),
    ];
    lines.push(r#"{"mult": 25.0, "vz": -5.0, "candidates": []}"#.to_string());
    std::fs::write(&events, lines.join("\n")).unwrap();

    let out = run(&[
        "--log-level",
        "warn",
        "run",
        "--events",
        events.to_string_lossy().as_ref(),
        "--mult-edges",
        "0,50,100",
        "--vz-edges",
        "-10,0,10",
        "--output",
        output.to_string_lossy().as_ref(),
    ]);
    assert!(
        out.status.success(),
        "bad records should be skipped, not fatal, stderr={}",
        String::from_utf8_lossy(&out.stderr)
    );
    let logged = String::from_utf8_lossy(&out.stdout);
    assert!(
        logged.contains("skipping malformed event record"),
        "expected a skip warning, got: {}",
        logged
    );

    let v: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&output).unwrap()).expect("results should be JSON");
    assert_results_contract(&v);

    for p in [&events, &output] {
        let _ = std::fs::remove_file(p);
    }
}

#[test]
fn run_errors_on_missing_events() {
    let missing = tmp_path("does_not_exist.jsonl");
    let out = run(&["run", "--events", missing.to_string_lossy().as_ref()]);
    assert!(!out.status.success(), "expected failure for missing event stream");
}

#[test]
fn report_errors_on_missing_snapshot() {
    let missing = tmp_path("does_not_exist.json");
    let out = run(&["report", "--snapshot", missing.to_string_lossy().as_ref()]);
    assert!(!out.status.success(), "expected failure for missing snapshot");
}
