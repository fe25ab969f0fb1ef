use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

fn discpack_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_discpack"))
}

fn run_cli(args: &[String], home: &Path) -> Output {
    Command::new(discpack_bin())
        .args(args)
        .env("DISCPACK_HOME", home)
        .env_remove("DISCPACK_CONFIG")
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to execute discpack CLI")
}

fn parse_json_output(output: &Output) -> serde_json::Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let json_start = stdout
        .find(|c| c == '{' || c == '[')
        .unwrap_or_else(|| {
            panic!(
                "no JSON payload found in output\nstdout:\n{}\nstderr:\n{}",
                stdout,
                String::from_utf8_lossy(&output.stderr)
            )
        });
    let mut deserializer = serde_json::Deserializer::from_str(&stdout[json_start..]);
    serde_json::Value::deserialize(&mut deserializer).unwrap_or_else(|err| {
        panic!(
            "failed to parse JSON output: {}\nstdout:\n{}\nstderr:\n{}",
            err,
            stdout,
            String::from_utf8_lossy(&output.stderr)
        )
    })
}

fn run_cli_json<T: DeserializeOwned>(args: &[String], home: &Path) -> T {
    let output = run_cli(args, home);
    assert!(
        output.status.success(),
        "command failed: {}\nstdout:\n{}\nstderr:\n{}",
        args.join(" "),
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_value(parse_json_output(&output)).unwrap_or_else(|err| {
        panic!(
            "failed to deserialize JSON output: {}\nstdout:\n{}",
            err,
            String::from_utf8_lossy(&output.stdout)
        )
    })
}

fn run_cli_json_error(args: &[String], home: &Path) -> serde_json::Value {
    let output = run_cli(args, home);
    assert!(
        !output.status.success(),
        "command unexpectedly succeeded: {}\nstdout:\n{}\nstderr:\n{}",
        args.join(" "),
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    parse_json_output(&output)
}

fn args(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|part| part.to_string()).collect()
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

#[derive(Debug, Deserialize)]
struct PlanOutput {
    tracks: Vec<PlannedTrack>,
    n_discs: u32,
    unused: Vec<UnusedSpec>,
    missing_numbers: Vec<(u32, u32)>,
    defaulted: Vec<PathBuf>,
    skipped: Vec<PathBuf>,
    permission: String,
}

#[derive(Debug, Deserialize)]
struct PlannedTrack {
    number: u32,
    name: String,
    path: PathBuf,
    license: String,
}

#[derive(Debug, Deserialize)]
struct UnusedSpec {
    path_spec: PathBuf,
    required: bool,
}

struct Fixture {
    home: TempDir,
    music: TempDir,
}

impl Fixture {
    fn new(files: &[&str]) -> Self {
        let home = TempDir::new().expect("create home dir");
        let music = TempDir::new().expect("create music dir");
        for file in files {
            let path = music.path().join(file);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).expect("create parent dir");
            }
            fs::write(&path, b"not really audio").expect("write file");
        }
        Self { home, music }
    }

    fn write_specs(&self, name: &str, content: &str) -> PathBuf {
        let path = self.home.path().join(name);
        fs::write(&path, content).expect("write spec file");
        path
    }
}

#[test]
fn plan_numbers_discovered_files() {
    let fixture = Fixture::new(&["b.ogg", "a.mp3", "notes.txt", "Album/finale.flac"]);
    let specs = fixture.write_specs(
        "specs.json",
        r#"[
            {"path_spec": "finale.flac", "num": 1, "description": "The End", "license": "attribution"},
            {"path_spec": "missing.mp3", "required": false}
        ]"#,
    );

    let output: PlanOutput = run_cli_json(
        &[
            args(&["plan", "--json", "-i"]),
            vec![path_arg(fixture.music.path())],
            args(&["-s"]),
            vec![path_arg(&specs)],
        ]
        .concat(),
        fixture.home.path(),
    );

    let numbers: Vec<u32> = output.tracks.iter().map(|t| t.number).collect();
    assert_eq!(numbers, vec![1, 2, 3]);
    assert_eq!(output.tracks[0].name, "The End");
    assert_eq!(output.tracks[0].license, "attribution");
    assert!(output.tracks[0].path.ends_with("Album/finale.flac"));
    assert!(output.tracks[1].path.ends_with("a.mp3"));
    assert!(output.tracks[2].path.ends_with("b.ogg"));
    assert_eq!(output.n_discs, 3);
    assert!(output.missing_numbers.is_empty());
    assert_eq!(output.defaulted.len(), 2);
    assert!(output.skipped.is_empty());
    assert_eq!(output.unused.len(), 1);
    assert_eq!(output.unused[0].path_spec, PathBuf::from("missing.mp3"));
    assert!(!output.unused[0].required);
    assert_eq!(output.permission, "personal");
}

#[test]
fn plan_skips_unspecified_files_under_error_policy() {
    let fixture = Fixture::new(&["keep.mp3", "stray.mp3"]);
    let specs = fixture.write_specs("specs.csv", "path_spec\nkeep.mp3\n");

    let output: PlanOutput = run_cli_json(
        &[
            args(&["plan", "--json", "-u", "error", "-i"]),
            vec![path_arg(fixture.music.path())],
            args(&["-s"]),
            vec![path_arg(&specs)],
        ]
        .concat(),
        fixture.home.path(),
    );

    assert_eq!(output.tracks.len(), 1);
    assert_eq!(output.skipped.len(), 1);
    assert!(output.skipped[0].ends_with("stray.mp3"));
}

#[test]
fn plan_reports_required_specs_that_matched_nothing() {
    let fixture = Fixture::new(&["a.mp3"]);
    let specs = fixture.write_specs("specs.toml", "[\"ghost.mp3\"]\nrequired = true\n");

    let value = run_cli_json_error(
        &[
            args(&["plan", "--json", "-i"]),
            vec![path_arg(fixture.music.path())],
            args(&["-s"]),
            vec![path_arg(&specs)],
        ]
        .concat(),
        fixture.home.path(),
    );

    let message = value["error"]["message"].as_str().unwrap();
    assert!(message.contains("ghost.mp3 (required)"), "{message}");
    let suggestions = value["error"]["suggestions"].as_array().unwrap();
    assert!(!suggestions.is_empty());
}

#[test]
fn plan_writes_registry_files() {
    let fixture = Fixture::new(&["one.mp3", "two.mp3"]);
    let out_dir = fixture.home.path().join("pack");

    let output: PlanOutput = run_cli_json(
        &[
            args(&["plan", "--json", "-i"]),
            vec![path_arg(fixture.music.path())],
            args(&["--out-dir"]),
            vec![path_arg(&out_dir)],
        ]
        .concat(),
        fixture.home.path(),
    );
    assert_eq!(output.tracks.len(), 2);

    assert!(out_dir.join("pack.mcmeta").is_file());
    assert!(out_dir.join("manifest.yaml").is_file());
    let sounds = fs::read_to_string(out_dir.join("assets/foxnap/sounds.json")).unwrap();
    let sounds: serde_json::Value = serde_json::from_str(&sounds).unwrap();
    assert!(sounds.get("track_1").is_some());
    assert!(sounds.get("track_2").is_some());
    assert!(out_dir.join("assets/foxnap/models/item/track_2.json").is_file());
}

#[test]
fn check_accepts_a_valid_spec_file() {
    let fixture = Fixture::new(&[]);
    let specs = fixture.write_specs(
        "specs.csv",
        "path_spec,num\nintro.mp3,1\noutro.mp3,2\nbonus.mp3,\n",
    );

    let value: serde_json::Value = run_cli_json(
        &[args(&["check", "--json", "-s"]), vec![path_arg(&specs)]].concat(),
        fixture.home.path(),
    );
    assert_eq!(value["valid"], serde_json::json!(true));
    assert_eq!(value["specs"].as_array().map(Vec::len), Some(3));
}

#[test]
fn check_rejects_overlapping_specs() {
    let fixture = Fixture::new(&[]);
    let specs = fixture.write_specs(
        "specs.json",
        r#"[{"path_spec": "Music/hello.mp3"}, {"path_spec": "hello.mp3"}]"#,
    );

    let value = run_cli_json_error(
        &[args(&["check", "--json", "-s"]), vec![path_arg(&specs)]].concat(),
        fixture.home.path(),
    );
    let message = value["error"]["message"].as_str().unwrap();
    assert!(message.contains("would also match"), "{message}");
    assert!(value["error"]["context"].is_string());
}

#[test]
fn check_reports_missing_spec_file() {
    let fixture = Fixture::new(&[]);
    let missing = fixture.home.path().join("nope.toml");

    let value = run_cli_json_error(
        &[args(&["check", "--json", "-s"]), vec![path_arg(&missing)]].concat(),
        fixture.home.path(),
    );
    let message = value["error"]["message"].as_str().unwrap();
    assert!(message.starts_with("File not found"), "{message}");
}

#[test]
fn config_shows_home_and_defaults() {
    let fixture = Fixture::new(&[]);

    let value: serde_json::Value =
        run_cli_json(&args(&["config", "--json"]), fixture.home.path());
    assert_eq!(
        value["home"].as_str().map(PathBuf::from),
        Some(fixture.home.path().to_path_buf())
    );
    assert_eq!(value["config_file"]["exists"], serde_json::json!(false));
    assert_eq!(value["options"]["start_at"], serde_json::json!(1));
    assert_eq!(
        value["options"]["unspecified_file_handling"],
        serde_json::json!("use-defaults")
    );
}
