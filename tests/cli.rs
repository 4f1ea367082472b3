use std::process::ExitCode;

use clap::Parser;
use visualysium::cli::{self, CliArgs};
use visualysium::{ChannelLayout, PixelBuffer, io};

fn write_input(dir: &std::path::Path, name: &str) -> std::path::PathBuf {
    let buf = PixelBuffer::from_fn(40, 20, ChannelLayout::Rgb, |x, y| [(x * 6) as u8, (y * 12) as u8, 90, 255]);
    let path = dir.join(name);
    io::save_image(&buf, &path, 90).unwrap();
    path
}

#[test]
fn parses_full_flag_set() {
    let args = CliArgs::try_parse_from([
        "visualysium", "-i", "a.png", "b.png", "--output-dir", "out", "--format", "jpg", "--quality", "80",
        "--contrast", "-0.2", "--temperature", "5000", "--curve", "0:0,255:200", "--crop", "0,0,10,10",
        "--flip-h", "--sharpen", "0.5", "--denoise", "3", "--verbose",
    ])
    .unwrap();
    assert_eq!(args.input, vec!["a.png", "b.png"]);
    assert_eq!(args.contrast, Some(-0.2));
    assert_eq!(args.denoise, Some(3));
    assert!(args.flip_h && args.verbose && !args.flip_v);
    assert!(CliArgs::try_parse_from(["visualysium"]).is_err());
}

#[test]
fn batch_run_writes_every_output() {
    let dir = tempfile::tempdir().unwrap();
    write_input(dir.path(), "one.png");
    write_input(dir.path(), "two.png");
    let out = dir.path().join("out");

    let pattern = dir.path().join("*.png").to_string_lossy().into_owned();
    let args = CliArgs::parse_from([
        "visualysium",
        "-i",
        &pattern,
        "--output-dir",
        out.to_str().unwrap(),
        "--rotate-right",
        "--gamma",
        "0.8",
    ]);
    assert_eq!(cli::run(args), ExitCode::SUCCESS);

    for name in ["one.png", "two.png"] {
        let back = io::load_image(&out.join(name)).unwrap();
        assert_eq!(back.dimensions(), (20, 40));
    }
}

#[test]
fn bad_curve_fails_before_touching_files() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), "in.png");
    let output = dir.path().join("never.png");
    let args = CliArgs::parse_from([
        "visualysium",
        "-i",
        input.to_str().unwrap(),
        "-o",
        output.to_str().unwrap(),
        "--curve",
        "0:0,300:10",
    ]);
    assert_eq!(cli::run(args), ExitCode::FAILURE);
    assert!(!output.exists());
}

#[test]
fn missing_input_is_a_failure() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nothing-*.png").to_string_lossy().into_owned();
    assert_eq!(cli::run(CliArgs::parse_from(["visualysium", "-i", &missing])), ExitCode::FAILURE);
}

#[test]
fn info_without_edits_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), "look.png");
    let output = dir.path().join("look.jpg");
    let args = CliArgs::parse_from([
        "visualysium",
        "-i",
        input.to_str().unwrap(),
        "-o",
        output.to_str().unwrap(),
        "--info",
    ]);
    assert_eq!(cli::run(args), ExitCode::SUCCESS);
    assert!(!output.exists());
}

#[test]
fn unknown_format_falls_back_to_the_output_extension() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), "src.png");
    let output = dir.path().join("dst.bmp");
    let args = CliArgs::parse_from([
        "visualysium",
        "-i",
        input.to_str().unwrap(),
        "-o",
        output.to_str().unwrap(),
        "--format",
        "gif",
        "--flip-v",
    ]);
    assert_eq!(cli::run(args), ExitCode::SUCCESS);
    let bytes = std::fs::read(&output).unwrap();
    assert_eq!(image::guess_format(&bytes).ok(), Some(image::ImageFormat::Bmp));
    assert_eq!(io::load_image(&output).unwrap().dimensions(), (40, 20));
}
