//! 外部工具执行
//!
//! 所有外部进程调用（ffprobe/ffmpeg）都经由 [`run_tool`]：
//! 有限等待，超时后杀死并回收子进程，stdout/stderr 由读线程排空避免管道阻塞。
//! Unix 下子进程自成进程组，超时时整组杀死（包装脚本派生的孙进程一并结束）。

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::debug;

use crate::tools::constants::process;

/// 外部工具可执行文件路径
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolPaths {
    pub ffprobe: PathBuf,
    pub ffmpeg: PathBuf,
}

impl Default for ToolPaths {
    fn default() -> Self {
        if cfg!(target_os = "windows") {
            Self {
                ffprobe: PathBuf::from("ffprobe.exe"),
                ffmpeg: PathBuf::from("ffmpeg.exe"),
            }
        } else {
            Self {
                ffprobe: PathBuf::from("ffprobe"),
                ffmpeg: PathBuf::from("ffmpeg"),
            }
        }
    }
}

/// 工具可用性（健康检查结果）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolStatus {
    pub ffprobe: bool,
    pub ffmpeg: bool,
}

impl ToolStatus {
    pub fn all_available(&self) -> bool {
        self.ffprobe && self.ffmpeg
    }
}

impl ToolPaths {
    /// 检测 ffprobe/ffmpeg 是否可执行（`-version`，每个工具最多等待 `timeout`）
    pub fn check_available(&self, timeout: Duration) -> ToolStatus {
        ToolStatus {
            ffprobe: Self::responds_to_version(&self.ffprobe, timeout),
            ffmpeg: Self::responds_to_version(&self.ffmpeg, timeout),
        }
    }

    fn responds_to_version(path: &Path, timeout: Duration) -> bool {
        let mut command = Command::new(path);
        command.arg("-version");
        run_tool(command, timeout)
            .map(|output| output.success)
            .unwrap_or(false)
    }
}

/// 外部工具执行结果
#[derive(Debug)]
pub struct ToolOutput {
    pub success: bool,
    pub status_text: String,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ToolOutput {
    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }

    /// stderr 前缀预览（只用于debug日志）
    pub fn stderr_preview(&self) -> String {
        String::from_utf8_lossy(&self.stderr)
            .chars()
            .take(process::STDERR_PREVIEW_CHARS)
            .collect()
    }
}

/// 外部工具执行错误
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("无法启动外部工具 / failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("外部工具超时 / {program} exceeded {}s", .timeout.as_secs())]
    Timeout { program: String, timeout: Duration },

    #[error("等待外部工具失败 / failed to wait for {program}: {reason}")]
    Wait { program: String, reason: String },
}

/// 执行外部命令，最多等待 `timeout`
///
/// 超时后子进程（Unix下为整个进程组）被 kill 并 wait 回收。
/// 读线程不再 join：残留的孙进程可能仍持有管道，读线程随管道关闭自行退出。
pub fn run_tool(mut command: Command, timeout: Duration) -> Result<ToolOutput, ToolError> {
    let program = command.get_program().to_string_lossy().into_owned();
    debug!(program = %program, args = ?command.get_args().collect::<Vec<_>>(), "spawning external tool");

    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }

    let mut child = command.spawn().map_err(|source| ToolError::Spawn {
        program: program.clone(),
        source,
    })?;

    let stdout_reader = drain_pipe(child.stdout.take());
    let stderr_reader = drain_pipe(child.stderr.take());

    let start = Instant::now();
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {}
            Err(e) => {
                kill_and_reap(&mut child);
                return Err(ToolError::Wait {
                    program,
                    reason: e.to_string(),
                });
            }
        }

        if start.elapsed() > timeout {
            kill_and_reap(&mut child);
            drop((stdout_reader, stderr_reader));
            debug!(program = %program, "external tool killed after timeout");
            return Err(ToolError::Timeout { program, timeout });
        }

        thread::sleep(process::POLL_INTERVAL);
    };

    let stdout = join_reader(stdout_reader, &program)?;
    let stderr = join_reader(stderr_reader, &program)?;

    debug!(
        program = %program,
        status = %status,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "external tool finished"
    );

    Ok(ToolOutput {
        success: status.success(),
        status_text: status.to_string(),
        stdout,
        stderr,
    })
}

fn drain_pipe<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<std::io::Result<Vec<u8>>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut reader) = pipe {
            reader.read_to_end(&mut buf)?;
        }
        Ok(buf)
    })
}

fn join_reader(
    handle: JoinHandle<std::io::Result<Vec<u8>>>,
    program: &str,
) -> Result<Vec<u8>, ToolError> {
    match handle.join() {
        Ok(Ok(buf)) => Ok(buf),
        Ok(Err(e)) => Err(ToolError::Wait {
            program: program.to_string(),
            reason: e.to_string(),
        }),
        Err(_) => Err(ToolError::Wait {
            program: program.to_string(),
            reason: "pipe reader panicked".to_string(),
        }),
    }
}

fn kill_and_reap(child: &mut Child) {
    #[cfg(unix)]
    kill_process_group(child.id());
    let _ = child.kill();
    let _ = child.wait();
}

/// 向整个进程组发送 SIGKILL（组号即子进程pid）
///
/// 通过 `kill(1)` 发送；它本身不会阻塞，但仍只等待有限时间。
#[cfg(unix)]
fn kill_process_group(pgid: u32) {
    let spawned = Command::new("kill")
        .args(["-KILL", "--", &format!("-{pgid}")])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn();

    let Ok(mut killer) = spawned else {
        debug!(pgid, "kill(1) unavailable, falling back to direct child kill");
        return;
    };

    let start = Instant::now();
    while start.elapsed() < process::GROUP_KILL_WAIT {
        if let Ok(Some(_)) | Err(_) = killer.try_wait() {
            return;
        }
        thread::sleep(process::POLL_INTERVAL);
    }
    let _ = killer.kill();
    let _ = killer.wait();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_program_is_spawn_error() {
        let command = Command::new("definitely-not-a-real-tool-7f3a9");
        let err = run_tool(command, Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, ToolError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_kills_child() {
        let mut command = Command::new("sleep");
        command.arg("5");
        let start = Instant::now();
        let err = run_tool(command, Duration::from_millis(200)).unwrap_err();
        assert!(matches!(err, ToolError::Timeout { .. }));
        // 被kill后应远早于sleep结束返回
        assert!(start.elapsed() < Duration::from_secs(4));
    }

    /// 非 exec 的 shell：sleep 是孙进程，仍持有输出管道
    #[cfg(unix)]
    #[test]
    fn test_timeout_bounded_when_grandchild_holds_pipes() {
        let mut command = Command::new("sh");
        command.args(["-c", "sleep 5; echo done"]);
        let start = Instant::now();
        let err = run_tool(command, Duration::from_millis(200)).unwrap_err();
        assert!(matches!(err, ToolError::Timeout { .. }));
        assert!(
            start.elapsed() < Duration::from_secs(2),
            "returned after {:?}",
            start.elapsed()
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_captures_stdout_and_status() {
        let mut command = Command::new("sh");
        command.args(["-c", "echo hello; echo oops 1>&2; exit 3"]);
        let output = run_tool(command, Duration::from_secs(5)).unwrap();
        assert!(!output.success);
        assert_eq!(output.stdout_lossy().trim(), "hello");
        assert_eq!(output.stderr_lossy().trim(), "oops");
    }

    #[test]
    fn test_missing_tools_reported_unavailable() {
        let paths = ToolPaths {
            ffprobe: PathBuf::from("no-such-ffprobe-7f3a9"),
            ffmpeg: PathBuf::from("no-such-ffmpeg-7f3a9"),
        };
        let status = paths.check_available(Duration::from_secs(1));
        assert!(!status.ffprobe);
        assert!(!status.ffmpeg);
        assert!(!status.all_available());
    }
}
