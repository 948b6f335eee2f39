use assert_fs::prelude::*;
use predicates::prelude::*;
use std::fs;

const FAILED_ONLY_JSON: &str = r#"{
  "generated_at": "2026-03-01T12:00:00Z",
  "mission": "drive-cycle",
  "ambient_temperature": 50.0,
  "mission_duration": 14.8,
  "devices": [
    {
      "name": "SPB20N60C3",
      "status": { "outcome": "failed", "kind": "cancelled", "message": "simulation cancelled", "failure": null },
      "series": {
        "time": [], "junction_temperature": [], "voltage": [], "current": [],
        "conduction_loss": [], "turn_on_loss": [], "turn_off_loss": [], "capacitive_loss": [],
        "reverse_recovery_loss": [], "total_loss": [], "stage_temperatures": []
      },
      "excursion": null,
      "lifetime": null
    }
  ]
}"#;

#[test]
fn plot_fails_without_trace_data() {
    let input = assert_fs::NamedTempFile::new("results.json").unwrap();
    input.write_str(FAILED_ONLY_JSON).unwrap();
    let output = assert_fs::NamedTempFile::new("traces.png").unwrap();

    let mut cmd = assert_cmd::cargo_bin_cmd!("mosfet-lifetime");
    cmd.args([
        "plot",
        "-i",
        input.path().to_str().unwrap(),
        "-o",
        output.path().to_str().unwrap(),
    ]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("no trace data"));
    output.assert(predicate::path::missing());
}

#[tokio::test]
async fn simulate_then_plot_creates_png() {
    let dir = assert_fs::TempDir::new().unwrap();
    let devices = dir.child("devices.yaml");
    devices
        .write_str(
            "devices:
  - name: fast-fet
    on_resistance: { nominal: 0.1 }
    switching: { turn_on_energy: 0, turn_off_energy: 0, test_voltage: 400, test_current: 10 }
    thermal_stages:
      - { resistance: 1.0, capacitance: 0.5 }
    max_temperature: 175
    lifetime: { prefactor: 3.5e5, exponent: 5.1, activation_energy: 0.54 }
",
        )
        .unwrap();
    let profile = dir.child("mission.yaml");
    profile
        .write_str("square_wave: { on_current: 10, voltage: 48, period: 1.0, periods: 3 }\n")
        .unwrap();
    let results = dir.child("results.json");
    let png = dir.child("traces.png");

    let mut simulate = assert_cmd::cargo_bin_cmd!("mosfet-lifetime");
    simulate.args([
        "simulate",
        "-d",
        devices.path().to_str().unwrap(),
        "-p",
        profile.path().to_str().unwrap(),
        "-o",
        results.path().to_str().unwrap(),
    ]);
    simulate.assert().success();

    let png_arg = png.path().to_str().unwrap().to_string();
    let mut plot = assert_cmd::cargo_bin_cmd!("mosfet-lifetime");
    plot.args(["plot", "-i", results.path().to_str().unwrap(), "-o", &png_arg]);

    plot.assert()
        .success()
        .stdout(predicate::str::contains("Trace plot written to"));
    let metadata = fs::metadata(png_arg).unwrap();
    assert!(metadata.len() > 0);
}
