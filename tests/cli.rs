/// Drives the notescope binary the way a user would.
mod common;

use anyhow::Result;
use rexpect::spawn;
use std::process::Command;

const BIN: &str = env!("CARGO_BIN_EXE_notescope");

#[test]
fn extract_prints_page_counts_and_text() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let pdf = dir.path().join("notes.pdf");
    std::fs::write(&pdf, common::economics_pdf())?;

    let mut session = spawn(&format!("{BIN} extract {}", pdf.display()), Some(10_000))?;
    session.exp_string("Pages: 3/3")?;
    session.exp_string("Words:")?;
    session.exp_string("Market equilibrium is where supply meets demand.")?;
    session.exp_eof()?;
    Ok(())
}

#[test]
fn labels_lists_the_standard_topics() -> Result<()> {
    let mut session = spawn(&format!("{BIN} labels"), Some(10_000))?;
    for label in notescope::STANDARD_TOPICS {
        session.exp_string(label)?;
    }
    session.exp_eof()?;
    Ok(())
}

#[test]
fn labels_come_from_the_config_file() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let config = dir.path().join("notescope.toml");
    std::fs::write(&config, "[classifier]\nlabels = [\"Law\", \"Medicine\"]\n")?;

    let mut session = spawn(
        &format!("{BIN} --config {} labels", config.display()),
        Some(10_000),
    )?;
    session.exp_string("Law")?;
    session.exp_string("Medicine")?;
    session.exp_eof()?;
    Ok(())
}

#[test]
fn analyzing_a_non_pdf_fails_without_loading_the_model() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let file = dir.path().join("notes.pdf");
    std::fs::write(&file, "these are plain text notes")?;

    let output = Command::new(BIN)
        .args(["analyze", &file.display().to_string()])
        .env("NOTESCOPE_MODEL_DIR", dir.path())
        .output()?;

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("could not read this file"), "{stderr}");
    assert!(!stderr.contains("try again"));
    Ok(())
}
