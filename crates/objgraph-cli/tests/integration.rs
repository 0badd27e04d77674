//! Integration tests for the command-line tools.

use objgraph_model::{Document, DocumentWriter, ObjectStreamMode, ReadMode, WriteOptions};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

/// Builds a file with a classic xref table; object `i + 1` is `bodies[i]`.
fn classic_pdf(bodies: &[&str], trailer: &str) -> Vec<u8> {
    let mut out = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::new();
    for (i, body) in bodies.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
    }
    let xref_at = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n0000000000 65535 f \n", bodies.len() + 1).as_bytes());
    for offset in offsets {
        out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer\n<< /Size {} {} >>\nstartxref\n{}\n%%EOF\n",
            bodies.len() + 1,
            trailer,
            xref_at
        )
        .as_bytes(),
    );
    out
}

/// Page tree with a `/Parent` cycle, a content stream and one object
/// nothing refers to.
fn sample_pdf() -> Vec<u8> {
    classic_pdf(
        &[
            "<< /Type /Catalog /Pages 2 0 R >>",
            "<< /Type /Pages /Kids [3 0 R] /Count 1 >>",
            "<< /Type /Page /Parent 2 0 R /Contents 4 0 R /MediaBox [0 0 612 792] >>",
            "<< /Length 9 >>\nstream\nBT /F1 ET\nendstream",
            "(orphan)",
        ],
        "/Root 1 0 R",
    )
}

fn signed_pdf() -> Vec<u8> {
    classic_pdf(
        &[
            "<< /Type /Catalog /AcroForm << /Fields [2 0 R] >> >>",
            "<< /FT /Sig /V 3 0 R >>",
            "<< /Type /Sig /Contents <3082010a00ff> /ByteRange [0 10 20 30] >>",
        ],
        "/Root 1 0 R",
    )
}

/// `sample_pdf` with `startxref` pointing into the page tree.
fn wrong_startxref_pdf() -> Vec<u8> {
    let mut bytes = sample_pdf();
    let marker = b"startxref\n";
    let at = bytes
        .windows(marker.len())
        .rposition(|w| w == marker)
        .unwrap()
        + marker.len();
    bytes.truncate(at);
    bytes.extend_from_slice(b"40\n%%EOF\n");
    bytes
}

/// Cross-reference stream file whose row for object 3 has type 9.
fn unknown_entry_pdf() -> Vec<u8> {
    let mut out = b"%PDF-1.5\n".to_vec();
    let mut offsets = Vec::new();
    for (i, body) in [
        "<< /Type /Catalog /Pages 2 0 R >>",
        "<< /Type /Pages /Kids [] /Count 0 >>",
    ]
    .iter()
    .enumerate()
    {
        offsets.push(out.len() as u32);
        out.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
    }
    let xref_at = out.len() as u32;

    let mut rows = Vec::new();
    for (kind, field2, field3) in [
        (0u8, 0u32, 65535u16),
        (1, offsets[0], 0),
        (1, offsets[1], 0),
        (9, 0, 0),
        (1, xref_at, 0),
    ] {
        rows.push(kind);
        rows.extend_from_slice(&field2.to_be_bytes());
        rows.extend_from_slice(&field3.to_be_bytes());
    }
    out.extend_from_slice(
        format!(
            "4 0 obj\n<< /Type /XRef /Size 5 /W [1 4 2] /Root 1 0 R /Length {} >>\nstream\n",
            rows.len()
        )
        .as_bytes(),
    );
    out.extend_from_slice(&rows);
    out.extend_from_slice(format!("\nendstream\nendobj\nstartxref\n{}\n%%EOF\n", xref_at).as_bytes());
    out
}

fn write_file(dir: &TempDir, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, bytes).unwrap();
    path
}

/// Rewrites `input` into a file that uses object streams.
fn with_object_streams(dir: &TempDir, input: &Path) -> PathBuf {
    let doc = Document::open(input, ReadMode::Strict).unwrap();
    let output = DocumentWriter::new(WriteOptions {
        object_streams: ObjectStreamMode::Generate,
        ..Default::default()
    })
    .write(&doc)
    .unwrap();
    write_file(dir, "objstm.pdf", &output.bytes)
}

fn run_tool(bin: &str, args: &[&str]) -> (i32, String, String) {
    let output = Command::new(bin)
        .args(args)
        .env_remove("OBJGRAPH_LOG")
        .output()
        .expect("Failed to execute tool");

    let stdout = String::from_utf8(output.stdout).unwrap();
    let stderr = String::from_utf8(output.stderr).unwrap();
    (output.status.code().unwrap_or(-1), stdout, stderr)
}

fn get_renumber(args: &[&str]) -> (i32, String, String) {
    run_tool(env!("CARGO_BIN_EXE_get-renumber"), args)
}

fn parsed_offset(args: &[&str]) -> (i32, String, String) {
    run_tool(env!("CARGO_BIN_EXE_parsed-offset"), args)
}

fn sig_dict_contents(args: &[&str]) -> (i32, String, String) {
    run_tool(env!("CARGO_BIN_EXE_sig-dict-contents"), args)
}

#[test]
fn test_get_renumber_succeeds() {
    let temp_dir = TempDir::new().unwrap();
    let input = write_file(&temp_dir, "in.pdf", &sample_pdf());

    let (code, stdout, stderr) = get_renumber(&[input.to_str().unwrap()]);
    assert_eq!(code, 0, "{}", stderr);

    let lines: Vec<&str> = stdout.lines().collect();
    assert!(lines[0].starts_with("input 1/0 -> renumbered "));
    assert_eq!(lines.last(), Some(&"succeeded"));
    assert!(lines.contains(&"stream objects are not compared"));

    // object 5 is unreferenced and dropped
    let orphan = lines
        .iter()
        .position(|l| *l == "input 5/0 -> renumbered 0/0")
        .unwrap();
    assert_eq!(lines[orphan + 1], "deleted");
}

#[test]
fn test_get_renumber_all_modes() {
    let temp_dir = TempDir::new().unwrap();
    let input = write_file(&temp_dir, "in.pdf", &sample_pdf());
    let input = input.to_str().unwrap();

    for mode in ["preserve", "disable", "generate"] {
        let object_streams = format!("--object-streams={}", mode);
        for extra in [&[][..], &["--linearize"][..], &["--preserve-unreferenced"][..]] {
            let mut args = vec![object_streams.as_str()];
            args.extend_from_slice(extra);
            args.push(input);

            let (code, stdout, stderr) = get_renumber(&args);
            assert_eq!(code, 0, "{:?}: {}", args, stderr);
            assert!(stdout.ends_with("succeeded\n"), "{:?}", args);
        }
    }
}

#[test]
fn test_get_renumber_preserve_unreferenced_keeps_orphan() {
    let temp_dir = TempDir::new().unwrap();
    let input = write_file(&temp_dir, "in.pdf", &sample_pdf());

    let (code, stdout, _) = get_renumber(&["--preserve-unreferenced", input.to_str().unwrap()]);
    assert_eq!(code, 0);
    assert!(!stdout.lines().any(|l| l == "deleted"));
}

#[test]
fn test_get_renumber_json_output() {
    let temp_dir = TempDir::new().unwrap();
    let input = write_file(&temp_dir, "in.pdf", &sample_pdf());

    let (code, stdout, _) = get_renumber(&["--json", input.to_str().unwrap()]);
    assert_eq!(code, 0);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).expect("Invalid JSON");
    assert_eq!(parsed["verdict"], "succeeded");
    let records = parsed["records"].as_array().unwrap();
    assert_eq!(records.len(), 5);
    assert_eq!(records[4]["outcome"], "deleted");
}

#[test]
fn test_get_renumber_missing_input() {
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("missing.pdf");

    let (code, stdout, stderr) = get_renumber(&[missing.to_str().unwrap()]);
    assert_eq!(code, 2);
    assert!(stdout.is_empty());
    assert!(stderr.contains("missing.pdf"));
}

#[test]
fn test_get_renumber_bad_arguments() {
    let (code, _, stderr) = get_renumber(&["--object-streams=squash", "in.pdf"]);
    assert_eq!(code, 2);
    assert!(stderr.contains("squash"));

    let (code, _, _) = get_renumber(&[]);
    assert_eq!(code, 2);
}

#[test]
fn test_parsed_offset_classic_file() {
    let temp_dir = TempDir::new().unwrap();
    let input = write_file(&temp_dir, "in.pdf", &sample_pdf());

    let (code, stdout, stderr) = parsed_offset(&[input.to_str().unwrap()]);
    assert_eq!(code, 0, "{}", stderr);

    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines[0], "--- objects not in streams ---");
    // "%PDF-1.4\n1 0 obj\n" puts the catalog at 17
    assert_eq!(lines[1], "offset = 17 (0x11), indirect 1/0, dictionary");
    assert!(lines.iter().any(|l| l.ends_with(", indirect 4/0, stream")));
    assert!(lines.iter().any(|l| l.ends_with(", indirect 5/0, string")));
    assert_eq!(lines.last(), Some(&"succeeded"));
    assert!(!stdout.contains("objects in stream "));
}

#[test]
fn test_parsed_offset_object_streams() {
    let temp_dir = TempDir::new().unwrap();
    let input = write_file(&temp_dir, "in.pdf", &sample_pdf());
    let objstm = with_object_streams(&temp_dir, &input);

    let (code, stdout, stderr) = parsed_offset(&[objstm.to_str().unwrap()]);
    assert_eq!(code, 0, "{}", stderr);
    assert!(stdout.starts_with("--- objects not in streams ---\n"));
    assert!(stdout.contains("--- objects in stream "));
    assert!(stdout.ends_with("succeeded\n"));
}

#[test]
fn test_parsed_offset_json_output() {
    let temp_dir = TempDir::new().unwrap();
    let input = write_file(&temp_dir, "in.pdf", &sample_pdf());

    let (code, stdout, _) = parsed_offset(&["--json", input.to_str().unwrap()]);
    assert_eq!(code, 0);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).expect("Invalid JSON");
    let buckets = parsed.as_array().unwrap();
    assert_eq!(buckets.len(), 1);
    assert_eq!(buckets[0]["container"], 0);
    assert_eq!(buckets[0]["entries"][0]["offset"], 17);
    assert_eq!(buckets[0]["entries"][0]["identity"]["id"], 1);
    assert_eq!(buckets[0]["entries"][0]["object_type"], "dictionary");
}

#[test]
fn test_parsed_offset_unreadable_input() {
    let temp_dir = TempDir::new().unwrap();
    let input = write_file(&temp_dir, "garbage.pdf", b"not a document\n");

    let (code, stdout, stderr) = parsed_offset(&[input.to_str().unwrap()]);
    assert_eq!(code, 2);
    assert!(stdout.is_empty());
    assert!(!stderr.is_empty());
}

#[test]
fn test_sig_dict_contents_found() {
    let temp_dir = TempDir::new().unwrap();
    let input = write_file(&temp_dir, "signed.pdf", &signed_pdf());
    let expected = write_file(&temp_dir, "expected", b"/Contents <3082010a00ff>");

    for mode in ["preserve", "disable", "generate"] {
        let object_streams = format!("--object-streams={}", mode);
        let (code, stdout, stderr) = sig_dict_contents(&[
            &object_streams,
            input.to_str().unwrap(),
            expected.to_str().unwrap(),
        ]);
        assert_eq!(code, 0, "{}: {}", mode, stderr);
        assert_eq!(stdout, "succeeded\n");
    }
}

#[test]
fn test_sig_dict_contents_missing() {
    let temp_dir = TempDir::new().unwrap();
    let input = write_file(&temp_dir, "signed.pdf", &signed_pdf());
    let expected = write_file(&temp_dir, "expected", b"<3082010a00fe>");

    let (code, stdout, stderr) =
        sig_dict_contents(&[input.to_str().unwrap(), expected.to_str().unwrap()]);
    assert_eq!(code, 2);
    assert!(stdout.is_empty());
    assert_eq!(stderr, "failed\n");
}

#[test]
fn test_sig_dict_contents_missing_expected_file() {
    let temp_dir = TempDir::new().unwrap();
    let input = write_file(&temp_dir, "signed.pdf", &signed_pdf());
    let missing = temp_dir.path().join("nope");

    let (code, _, stderr) =
        sig_dict_contents(&[input.to_str().unwrap(), missing.to_str().unwrap()]);
    assert_eq!(code, 2);
    assert!(stderr.contains("nope"));
}

#[test]
fn test_wrong_startxref_is_recovered() {
    let temp_dir = TempDir::new().unwrap();
    let input = write_file(&temp_dir, "damaged.pdf", &wrong_startxref_pdf());
    let input = input.to_str().unwrap();

    let (code, stdout, stderr) = get_renumber(&[input]);
    assert_eq!(code, 0, "{}", stderr);
    assert!(stdout.ends_with("succeeded\n"));
    assert!(stdout.contains("input 1/0 -> renumbered 1/0\n"));

    let (code, stdout, stderr) = parsed_offset(&[input]);
    assert_eq!(code, 0, "{}", stderr);
    assert!(stdout.contains("offset = 17 (0x11), indirect 1/0, dictionary\n"));
    assert!(stdout.ends_with("succeeded\n"));
}

#[test]
fn test_wrong_startxref_fails_when_strict() {
    let temp_dir = TempDir::new().unwrap();
    let input = write_file(&temp_dir, "damaged.pdf", &wrong_startxref_pdf());
    let input = input.to_str().unwrap();

    let (code, stdout, stderr) = get_renumber(&["--strict", input]);
    assert_eq!(code, 2);
    assert!(stdout.is_empty());
    assert!(stderr.contains("damaged.pdf"));

    let (code, stdout, _) = parsed_offset(&["--strict", input]);
    assert_eq!(code, 2);
    assert!(stdout.is_empty());
}

#[test]
fn test_parsed_offset_unknown_entry_type() {
    let temp_dir = TempDir::new().unwrap();
    let input = write_file(&temp_dir, "unknown.pdf", &unknown_entry_pdf());

    let (code, stdout, stderr) = parsed_offset(&[input.to_str().unwrap()]);
    assert_eq!(code, 2);
    assert!(stdout.is_empty());
    // the loader's warning comes first, the tool's error last
    assert_eq!(stderr.lines().last(), Some("unknown xref entry type"));
}
