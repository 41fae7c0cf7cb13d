use assert_cmd::Command;

fn parlance() -> Command {
    Command::cargo_bin("parlance").unwrap()
}

#[test]
fn score_forgives_a_misspelt_word() {
    let output = parlance()
        .args([
            "score",
            "--target",
            "the quick brown fox",
            "--spoken",
            "the quik brown fox",
        ])
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert_eq!(stdout.trim(), "score 100 (4/4 words)");
}

#[test]
fn score_reports_missed_words_as_json() {
    let output = parlance()
        .args([
            "score",
            "--target",
            "one two three four",
            "--spoken",
            "one four",
            "--json",
        ])
        .output()
        .unwrap();

    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["score"], 50);
    assert_eq!(value["matched_indices"], serde_json::json!([0, 3]));
}

// Point the config lookup at an empty home so a developer's own key is not picked up.
fn without_credentials(home: &std::path::Path) -> Command {
    let mut cmd = parlance();
    cmd.env_remove("GEMINI_API_KEY")
        .env("HOME", home)
        .env("XDG_CONFIG_HOME", home);
    cmd
}

#[test]
fn speak_rejects_a_missing_recording() {
    let home = tempfile::tempdir().unwrap();
    let output = without_credentials(home.path())
        .args(["speak", "--audio", "/nonexistent/take.wav"])
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("Something went wrong on this machine."));
    assert!(!stderr.contains("Io("));
}

#[test]
fn lookup_without_a_key_explains_what_to_set() {
    let home = tempfile::tempdir().unwrap();
    let output = without_credentials(home.path())
        .args(["lookup", "serene"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("No API key found. Set GEMINI_API_KEY and try again."));
    assert!(!stderr.contains("MissingCredentials"));
}
