//! Video comparison against stub ffmpeg/ffprobe scripts.

#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use media_fidelity::{
    CompareConfig, CompareSession, Error, FidelityRecord, Modality, RowOutcome, render_report,
};

const FFPROBE: &str = r#"#!/bin/sh
echo '{"programs":[],"streams":[{"bits_per_raw_sample":"10"}]}'
"#;

const FFMPEG: &str = r#"#!/bin/sh
case "$4" in
  *broken*)
    echo "[in#1 @ 0x1] Error opening input: Invalid argument" >&2
    exit 1
    ;;
esac
echo "[Parsed_psnr_0 @ 0x1] PSNR y:39.5 u:41.0 v:41.2 average:40.000000 min:35.1 max:44.0" >&2
echo "[Parsed_ssim_1 @ 0x2] SSIM Y:0.990000 (20.0) U:0.991 (20.4) V:0.992 (21.0) All:0.985000 (18.239)" >&2
"#;

fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn touch(path: &Path) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, b"not really a video").unwrap();
}

#[test]
fn test_video_rows_with_stub_toolchain() {
    let tools = tempfile::tempdir().unwrap();
    let ffmpeg = write_script(tools.path(), "ffmpeg", FFMPEG);
    let ffprobe = write_script(tools.path(), "ffprobe", FFPROBE);

    let trees = tempfile::tempdir().unwrap();
    let input = trees.path().join("input");
    let output = trees.path().join("output");
    touch(&input.join("clips/a.mp4"));
    touch(&output.join("clips/a.mp4"));
    touch(&input.join("broken.mkv"));
    touch(&output.join("broken.mkv"));
    touch(&input.join("gone.mov"));

    let session = CompareSession::new(
        CompareConfig::builder()
            .ffmpeg(&ffmpeg)
            .ffprobe(&ffprobe)
            .build()
            .unwrap(),
    );
    let report = session.compare(Modality::Video, &input, &output).unwrap();

    let keys: Vec<&str> = report.rows.iter().map(|r| r.key.as_str()).collect();
    assert_eq!(keys, ["broken", "clips/a", "gone"]);

    match &report.rows[1].outcome {
        RowOutcome::Measured {
            record: FidelityRecord::Video(video),
        } => {
            assert_eq!(video.bit_depth, 10);
            assert!((video.psnr_avg - 40.0).abs() < 1e-9);
            assert!((video.ssim_avg - 0.985).abs() < 1e-9);
            let expected_mse = 1023.0 * 1023.0 / 1e4;
            assert!((video.mse_avg - expected_mse).abs() < 1e-6);
        }
        other => panic!("expected a video measurement, got {other:?}"),
    }

    match &report.rows[0].outcome {
        RowOutcome::Failed { reason } => assert!(reason.contains("Invalid argument")),
        other => panic!("expected a failed row, got {other:?}"),
    }
    assert_eq!(
        report.rows[2].outcome,
        RowOutcome::Missing {
            hint: "Missing".to_string()
        }
    );

    let table = render_report(&report);
    assert!(table.contains("FAILED"));
    assert!(table.contains("0.9850"));

    let summary = report.summary();
    assert_eq!((summary.ok, summary.failed, summary.missing), (1, 1, 1));

    // Without ffmpeg the run aborts instead of producing rows.
    let session = CompareSession::new(
        CompareConfig::builder()
            .ffmpeg(tools.path().join("no-such-ffmpeg"))
            .ffprobe(&ffprobe)
            .build()
            .unwrap(),
    );
    let err = session.compare(Modality::Video, &input, &output).unwrap_err();
    assert!(matches!(err, Error::ToolUnavailable { .. }));
    assert!(err.is_fatal());
}
