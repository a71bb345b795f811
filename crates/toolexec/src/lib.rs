//! Invocation helper for the external command-line tools photomatrix drives.
//! （photomatrix 呼叫外部命令列工具的共用輔助模組。）
//!
//! Both the camera bridge (`gphoto2`) and the metadata reader (`exiftool`) are
//! plain synchronous programs: spawn, wait, inspect the exit code and parse
//! stdout. This crate wraps `std::process::Command` so the callers only deal
//! with a [`ToolCommand`] description and a captured [`ToolOutput`].
//! 相機橋接（`gphoto2`）與中繼資料讀取（`exiftool`）皆為同步程式：啟動、等待、
//! 檢查結束碼並解析標準輸出。本模組將 `std::process::Command` 包裝成
//! [`ToolCommand`] 與 [`ToolOutput`]。

use std::borrow::Cow;
use std::fmt;
use std::process::{Command, Stdio};
use std::time::Instant;

use thiserror::Error;

/// Errors raised while invoking an external tool.
/// （呼叫外部工具時可能發生的錯誤。）
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to collect output of `{program}`: {source}")]
    Output {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("`{command}` exited with {}: {stderr}", describe_code(.code))]
    Failed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },
}

fn describe_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("code {code}"),
        None => "a signal".to_string(),
    }
}

/// Description of a single tool invocation.
/// （單次工具呼叫的描述。）
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolCommand {
    program: String,
    args: Vec<String>,
}

impl ToolCommand {
    /// Creates a command for the given program.
    /// （以指定程式建立指令。）
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Appends one argument.
    /// （加入一個參數。）
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments at once.
    /// （一次加入多個參數。）
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    /// Spawns the tool, waits for it, and captures stdout/stderr.
    /// （啟動工具並等待結束，擷取標準輸出與錯誤輸出。）
    pub fn run(&self) -> Result<ToolOutput, ToolError> {
        run(self)
    }

    /// Runs the tool and turns a non-zero exit into [`ToolError::Failed`].
    /// （執行工具；非零結束碼視為錯誤。）
    pub fn run_checked(&self) -> Result<ToolOutput, ToolError> {
        self.run()?.into_checked(self)
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Captured result of a finished tool invocation.
/// （工具執行結束後擷取的結果。）
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolOutput {
    pub exit_code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ToolOutput {
    /// True only when the tool exited with code `0`.
    /// （僅在結束碼為 0 時回傳 true。）
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Exit code as reported to callers; termination by signal maps to `-1`.
    pub fn code(&self) -> i32 {
        self.exit_code.unwrap_or(-1)
    }

    pub fn stdout_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stdout)
    }

    pub fn stderr_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stderr)
    }

    /// Converts a failed exit into [`ToolError::Failed`].
    /// （將失敗的結束狀態轉為 [`ToolError::Failed`]。）
    pub fn into_checked(self, command: &ToolCommand) -> Result<Self, ToolError> {
        if self.success() {
            Ok(self)
        } else {
            Err(ToolError::Failed {
                command: command.to_string(),
                code: self.exit_code,
                stderr: self.stderr_text().trim().to_string(),
            })
        }
    }
}

/// Executes the command with stdin closed. There is no timeout: a hung tool
/// blocks the caller.
/// （以關閉的標準輸入執行指令；不設逾時，工具卡住時呼叫端會一併阻塞。）
pub fn run(command: &ToolCommand) -> Result<ToolOutput, ToolError> {
    let mut process = Command::new(&command.program);
    process
        .args(&command.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let start = Instant::now();
    let child = process.spawn().map_err(|source| ToolError::Spawn {
        program: command.program.clone(),
        source,
    })?;
    let output = child.wait_with_output().map_err(|source| ToolError::Output {
        program: command.program.clone(),
        source,
    })?;
    log::debug!(
        "`{}` finished with {:?} in {} ms",
        command,
        output.status.code(),
        start.elapsed().as_millis()
    );

    Ok(ToolOutput {
        exit_code: output.status.code(),
        stdout: output.stdout,
        stderr: output.stderr,
    })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn captures_stdout_and_exit_code() {
        let command = ToolCommand::new("sh").args(["-c", "printf 'Model: Nikon'"]);
        let output = command.run().expect("sh should run");
        assert!(output.success());
        assert_eq!(output.stdout_text(), "Model: Nikon");
        assert!(output.stderr.is_empty());
    }

    #[test]
    fn non_zero_exit_is_reported_by_checked_run() {
        let command = ToolCommand::new("sh").args(["-c", "echo 'no camera' >&2; exit 3"]);
        let output = command.run().expect("sh should run");
        assert_eq!(output.code(), 3);

        let err = command.run_checked().unwrap_err();
        match err {
            ToolError::Failed { code, stderr, .. } => {
                assert_eq!(code, Some(3));
                assert_eq!(stderr, "no camera");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn missing_program_is_a_spawn_error() {
        let err = ToolCommand::new("photomatrix-definitely-missing-tool")
            .run()
            .unwrap_err();
        assert!(matches!(err, ToolError::Spawn { .. }));
    }

    #[test]
    fn display_joins_program_and_arguments() {
        let command = ToolCommand::new("gphoto2").args(["--show-info", "3"]);
        assert_eq!(command.to_string(), "gphoto2 --show-info 3");
        assert_eq!(command.arguments(), ["--show-info", "3"]);
    }
}
