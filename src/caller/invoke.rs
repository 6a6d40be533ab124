//! Structured invocation of the external variant caller and the VCF
//! compression/indexing tools.

use crate::utils::Result;
use std::{
    fs,
    fs::File,
    io::Read as ioRead,
    path::{Path, PathBuf},
    process::{Child, Command, ExitStatus, Stdio},
    thread,
    time::{Duration, Instant},
};

const BGZIP: &str = "bgzip";
const TABIX: &str = "tabix";
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Runs the variant caller against one sample's BAM, restricted to the
/// targeted regions, writing the VCF to `vcf_path`. A non-zero exit, spawn
/// failure, timeout, or empty output file is an error.
pub fn call_variants(
    caller: &str,
    genome_path: &Path,
    min_coverage: u32,
    bam_path: &Path,
    targets_path: &Path,
    vcf_path: &Path,
    timeout: Option<Duration>,
) -> Result<()> {
    let vcf_file = File::create(vcf_path)
        .map_err(|e| format!("Failed to create VCF file {}: {}", vcf_path.display(), e))?;

    let mut command = Command::new(caller);
    command
        .arg("-f")
        .arg(genome_path)
        .arg("-C")
        .arg(min_coverage.to_string())
        .arg(bam_path)
        .arg("-t")
        .arg(targets_path)
        .stdout(Stdio::from(vcf_file));
    run_checked(command, timeout)?;

    let metadata = fs::metadata(vcf_path)
        .map_err(|e| format!("Failed to stat VCF file {}: {}", vcf_path.display(), e))?;
    if metadata.len() == 0 {
        return Err(format!(
            "Variant caller produced no output in {}",
            vcf_path.display()
        ));
    }
    Ok(())
}

/// Compresses the VCF into a bgzip sibling and builds a tabix index over it.
/// Returns the path of the compressed file.
pub fn compress_and_index(vcf_path: &Path, timeout: Option<Duration>) -> Result<PathBuf> {
    let mut gz_name = vcf_path.as_os_str().to_owned();
    gz_name.push(".gz");
    let gz_path = PathBuf::from(gz_name);

    let gz_file = File::create(&gz_path)
        .map_err(|e| format!("Failed to create {}: {}", gz_path.display(), e))?;
    let mut command = Command::new(BGZIP);
    command.arg("-c").arg(vcf_path).stdout(Stdio::from(gz_file));
    run_checked(command, timeout)?;

    let mut command = Command::new(TABIX);
    command.arg("-p").arg("vcf").arg(&gz_path);
    run_checked(command, timeout)?;

    Ok(gz_path)
}

/// Spawns the command, waits (optionally bounded), and turns any non-zero
/// exit status into an error carrying the captured stderr.
fn run_checked(mut command: Command, timeout: Option<Duration>) -> Result<()> {
    let program = command.get_program().to_string_lossy().into_owned();
    command.stderr(Stdio::piped());
    log::debug!("Invoking {:?}", command);

    let mut child = command
        .spawn()
        .map_err(|e| format!("Failed to start {}: {}", program, e))?;

    // Drain stderr off-thread so a chatty tool cannot block on a full pipe
    let stderr = child.stderr.take();
    let stderr_thread = thread::spawn(move || {
        let mut buf = String::new();
        if let Some(mut stream) = stderr {
            let _ = stream.read_to_string(&mut buf);
        }
        buf
    });

    let wait_result = wait_with_timeout(&mut child, timeout);
    let stderr_text = stderr_thread.join().unwrap_or_default();
    let stderr_text = stderr_text.trim();

    let status = wait_result.map_err(|e| format!("{} {}", program, e))?;
    if !status.success() {
        return Err(format!(
            "{} exited with {}: {}",
            program,
            status,
            if stderr_text.is_empty() {
                "<no stderr output>"
            } else {
                stderr_text
            }
        ));
    }

    if !stderr_text.is_empty() {
        log::debug!("{} stderr: {}", program, stderr_text);
    }
    Ok(())
}

fn wait_with_timeout(child: &mut Child, timeout: Option<Duration>) -> Result<ExitStatus> {
    let Some(limit) = timeout else {
        return child
            .wait()
            .map_err(|e| format!("could not be waited for: {}", e));
    };

    let start = Instant::now();
    loop {
        match child
            .try_wait()
            .map_err(|e| format!("could not be polled: {}", e))?
        {
            Some(status) => return Ok(status),
            None => {
                if start.elapsed() >= limit {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(format!("timed out after {} s and was killed", limit.as_secs()));
                }
                thread::sleep(POLL_INTERVAL);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_exit_status_is_ok() {
        assert!(run_checked(Command::new("true"), None).is_ok());
    }

    #[test]
    fn nonzero_exit_status_is_err() {
        let err = run_checked(Command::new("false"), None).unwrap_err();
        assert!(err.contains("exited with"), "unexpected message: {}", err);
    }

    #[test]
    fn missing_program_is_err() {
        let err = run_checked(Command::new("varcell-no-such-program"), None).unwrap_err();
        assert!(err.contains("Failed to start"), "unexpected message: {}", err);
    }

    #[test]
    fn slow_program_is_killed_after_timeout() {
        let mut command = Command::new("sleep");
        command.arg("5");
        let err = run_checked(command, Some(Duration::from_millis(200))).unwrap_err();
        assert!(err.contains("timed out"), "unexpected message: {}", err);
    }
}
