//! `docker compose` process wrapper.
//!
//! Runs the orchestrator against a generated descriptor and streams
//! subprocess stdout line-by-line from a reader thread, so a long
//! `up` never blocks the caller.

use std::io::{BufRead, BufReader};
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::thread::JoinHandle;

use labforge_common::error::{LabError, Result};

/// A running `docker compose up`, with its output reader.
#[derive(Debug)]
pub struct ComposeProcess {
    child: Child,
    reader: Option<JoinHandle<()>>,
}

impl ComposeProcess {
    /// Waits for the process to exit and returns its exit code.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be awaited.
    pub fn wait(mut self) -> Result<i32> {
        let status = self.child.wait().map_err(|e| LabError::Io {
            path: "docker".into(),
            source: e,
        })?;
        if let Some(handle) = self.reader.take() {
            let _ = handle.join();
        }
        let code = status.code().unwrap_or(-1);
        tracing::info!(code, "compose process exited");
        Ok(code)
    }
}

/// Pulls and builds the images referenced by the descriptor.
///
/// # Errors
///
/// Returns an error if either step exits non-zero or docker cannot be
/// invoked.
pub fn prepare(compose_file: &Path) -> Result<()> {
    run_to_completion(compose_file, &["pull"])?;
    run_to_completion(compose_file, &["build"])
}

/// Spawns `docker compose up` in the background.
///
/// # Errors
///
/// Returns an error if docker cannot be spawned.
pub fn launch(compose_file: &Path) -> Result<ComposeProcess> {
    tracing::info!(file = %compose_file.display(), "starting compose project");
    let mut child = compose_command(compose_file)
        .args(["up", "--remove-orphans", "--force-recreate"])
        .stdout(Stdio::piped())
        .spawn()
        .map_err(|e| LabError::Io {
            path: "docker".into(),
            source: e,
        })?;

    let reader = child.stdout.take().map(|stdout| {
        std::thread::spawn(move || {
            for line in BufReader::new(stdout).lines() {
                match line {
                    Ok(line) => tracing::info!(target: "compose", "{line}"),
                    Err(_) => break,
                }
            }
        })
    });

    Ok(ComposeProcess { child, reader })
}

/// Stops the compose project.
///
/// # Errors
///
/// Returns an error if the stop command exits non-zero or docker
/// cannot be invoked.
pub fn stop(compose_file: &Path) -> Result<()> {
    tracing::info!(file = %compose_file.display(), "stopping compose project");
    run_to_completion(compose_file, &["stop"])
}

fn compose_command(compose_file: &Path) -> Command {
    let mut cmd = Command::new("docker");
    let _ = cmd.arg("compose").arg("-f").arg(compose_file);
    cmd
}

fn run_to_completion(compose_file: &Path, args: &[&str]) -> Result<()> {
    let mut child = compose_command(compose_file)
        .args(args)
        .stdout(Stdio::piped())
        .spawn()
        .map_err(|e| LabError::Io {
            path: "docker".into(),
            source: e,
        })?;

    if let Some(stdout) = child.stdout.take() {
        for line in BufReader::new(stdout).lines() {
            match line {
                Ok(line) => tracing::info!(target: "compose", "{line}"),
                Err(_) => break,
            }
        }
    }

    let status = child.wait().map_err(|e| LabError::Io {
        path: "docker".into(),
        source: e,
    })?;
    if status.success() {
        Ok(())
    } else {
        Err(LabError::Orchestrator {
            message: format!(
                "docker compose {} exited with code {}",
                args.join(" "),
                status.code().unwrap_or(-1)
            ),
        })
    }
}
