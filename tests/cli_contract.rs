use std::fs;
use std::io::Cursor;
use std::path::Path;
use std::process::Command;

use image::codecs::gif::GifDecoder;
use image::AnimationDecoder;
use serde_json::Value;
use tempfile::tempdir;

const CONFIG: &str = "max_frames: 4\nfonts:\n  candidates: []\n";

fn write_config(dir: &Path, yaml: &str) {
    fs::write(dir.join("countdown.yaml"), yaml).expect("config should write");
}

fn run_countdown(cwd: &Path, args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_countdown"))
        .current_dir(cwd)
        .env_remove("RUST_LOG")
        .args(args)
        .output()
        .expect("countdown command should run")
}

#[test]
fn check_reports_remaining_breakdown_as_json() {
    let dir = tempdir().expect("tempdir should create");
    write_config(dir.path(), CONFIG);

    let output = run_countdown(
        dir.path(),
        &[
            "check",
            "--config",
            "countdown.yaml",
            "--now",
            "2025-01-01T00:00:00",
            "--end",
            "2025-01-02T01:01:01",
        ],
    );
    assert!(output.status.success(), "check should succeed");

    let parsed: Value = serde_json::from_slice(&output.stdout).expect("json should parse");
    assert_eq!(parsed["ok"], true);
    assert_eq!(parsed["timezone"], "America/Sao_Paulo");
    assert_eq!(parsed["total_seconds"], 90_061);
    assert_eq!(parsed["remaining"]["expired"], false);
    for field in ["days", "hours", "minutes", "seconds"] {
        assert_eq!(parsed["remaining"][field], 1, "{field}");
    }
}

#[test]
fn check_reports_expired_after_deadline() {
    let dir = tempdir().expect("tempdir should create");
    write_config(dir.path(), CONFIG);

    let output = run_countdown(
        dir.path(),
        &[
            "check",
            "--config",
            "countdown.yaml",
            "--now",
            "2025-12-31T23:59:00",
            "--end",
            "2025-12-31T23:59",
        ],
    );
    assert!(output.status.success());
    let parsed: Value = serde_json::from_slice(&output.stdout).expect("json should parse");
    assert_eq!(parsed["remaining"]["expired"], true);
    assert_eq!(parsed["total_seconds"], 0);
}

#[test]
fn caller_errors_print_envelope_and_exit_2() {
    let dir = tempdir().expect("tempdir should create");
    write_config(dir.path(), CONFIG);

    let missing = run_countdown(dir.path(), &["check", "--config", "countdown.yaml"]);
    assert_eq!(missing.status.code(), Some(2));
    let parsed: Value = serde_json::from_slice(&missing.stdout).expect("envelope should parse");
    assert_eq!(parsed["ok"], false);
    assert_eq!(parsed["error"]["code"], "MISSING_PARAMETER");

    let invalid = run_countdown(
        dir.path(),
        &["check", "--config", "countdown.yaml", "--end", "31-12-2025"],
    );
    assert_eq!(invalid.status.code(), Some(2));
    let parsed: Value = serde_json::from_slice(&invalid.stdout).expect("envelope should parse");
    assert_eq!(parsed["error"]["code"], "INVALID_FORMAT");
    assert_eq!(parsed["error"]["details"]["provided"], "31-12-2025");

    let color = run_countdown(
        dir.path(),
        &[
            "render",
            "--config",
            "countdown.yaml",
            "--end",
            "2025-12-31T23:59",
            "--digit",
            "not-a-color",
            "-o",
            "out.gif",
        ],
    );
    assert_eq!(color.status.code(), Some(2));
    let parsed: Value = serde_json::from_slice(&color.stdout).expect("envelope should parse");
    assert_eq!(parsed["error"]["code"], "INVALID_COLOR");
    assert!(!dir.path().join("out.gif").exists());
}

#[test]
fn render_writes_looping_gif_capped_by_config() {
    let dir = tempdir().expect("tempdir should create");
    write_config(dir.path(), CONFIG);

    let output = run_countdown(
        dir.path(),
        &[
            "render",
            "--config",
            "countdown.yaml",
            "--now",
            "2025-01-01T00:00:00",
            "--end",
            "2025-01-01T00:03:20",
            "--bg",
            "navy",
            "-o",
            "out.gif",
        ],
    );
    assert!(output.status.success(), "render should succeed");

    let bytes = fs::read(dir.path().join("out.gif")).expect("gif should exist");
    let decoder = GifDecoder::new(Cursor::new(bytes)).expect("gif should decode");
    let frames = decoder
        .into_frames()
        .collect_frames()
        .expect("frames should decode");
    assert_eq!(frames.len(), 4);
    assert_eq!(frames[0].buffer().dimensions(), (600, 150));
}

#[test]
fn render_still_writes_png() {
    let dir = tempdir().expect("tempdir should create");
    write_config(dir.path(), CONFIG);

    let output = run_countdown(
        dir.path(),
        &[
            "render",
            "--config",
            "countdown.yaml",
            "--end",
            "2099-01-01T00:00",
            "--still",
            "-o",
            "still.png",
        ],
    );
    assert!(output.status.success(), "render --still should succeed");

    let image = image::open(dir.path().join("still.png")).expect("png should open");
    assert_eq!((image.width(), image.height()), (600, 150));
    let pixel = image.to_rgba8().get_pixel(0, 0).0;
    assert_eq!(pixel, [0, 0, 0, 255]);
}

#[test]
fn invalid_config_fails_with_exit_1() {
    let dir = tempdir().expect("tempdir should create");
    write_config(dir.path(), "max_frames: 0\n");

    let output = run_countdown(
        dir.path(),
        &["check", "--config", "countdown.yaml", "--end", "2025-12-31T23:59"],
    );
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("max_frames"), "{stderr}");
}
