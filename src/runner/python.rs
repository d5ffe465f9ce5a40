//! Long-running Python interpreter for one episode
//!
//! A [`PythonSession`] owns a `python3` child running a small driver. The
//! driver keeps one globals dict for the session's lifetime and answers
//! one JSON request per line: each fragment is evaluated as an expression
//! when it compiles as one and executed as statements otherwise, with its
//! standard output captured. The child is killed when the session drops.

use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Error, Result};

/// Interpreter used when none is configured
pub const DEFAULT_INTERPRETER: &str = "python3";

/// Driver run with `-c`; requests come in on stdin, replies go out on the
/// original stdout, and fd 1 is pointed at stderr so stray writes from
/// fragments cannot corrupt the reply stream.
const DRIVER: &str = r#"
import importlib
import io
import json
import os
import sys

requests = os.fdopen(os.dup(0), "r", encoding="utf-8")
replies = os.fdopen(os.dup(1), "w", encoding="utf-8")
os.dup2(2, 1)
null = os.open(os.devnull, os.O_RDONLY)
os.dup2(null, 0)
os.close(null)
sys.stdin = io.StringIO()

namespace = {"__name__": "__main__", "__builtins__": __builtins__}


def fragment(code):
    try:
        return compile(code.lstrip(" \t"), "<fragment>", "eval")
    except SyntaxError:
        return compile(code, "<fragment>", "exec")


def run(request):
    reply = {"value": None, "value_is_str": False, "stdout": "", "error_kind": None, "message": None}
    buffer = io.StringIO()
    sys.stdout = buffer
    try:
        if "import" in request:
            importlib.import_module(request["import"])
        else:
            value = eval(fragment(request["code"]), namespace)
            if value is not None:
                reply["value"] = str(value)
                reply["value_is_str"] = isinstance(value, str)
    except BaseException as e:
        reply["error_kind"] = type(e).__name__
        reply["message"] = str(e)
    finally:
        sys.stdout = sys.__stdout__
    reply["stdout"] = buffer.getvalue()
    return reply


while True:
    line = requests.readline()
    if not line:
        break
    replies.write(json.dumps(run(json.loads(line))) + "\n")
    replies.flush()
"#;

#[derive(Serialize)]
#[serde(untagged)]
enum Request<'a> {
    Code { code: &'a str },
    Import { import: &'a str },
}

/// What the interpreter reported for one request
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Reply {
    /// `str()` of the expression's value; `None` for statements and `None`
    pub value: Option<String>,
    /// Whether the value was a `str`
    #[serde(default)]
    pub value_is_str: bool,
    /// Everything the fragment printed
    #[serde(default)]
    pub stdout: String,
    /// Exception class name, e.g. `NameError`
    pub error_kind: Option<String>,
    /// `str()` of the exception
    pub message: Option<String>,
}

/// One interpreter process and its globals
#[derive(Debug)]
pub struct PythonSession {
    interpreter: String,
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

impl PythonSession {
    /// Start `interpreter` running the driver
    ///
    /// # Errors
    ///
    /// Returns [`Error::Interpreter`] if the process cannot be started.
    pub fn spawn(interpreter: &str) -> Result<Self> {
        let mut child = Command::new(interpreter)
            .arg("-c")
            .arg(DRIVER)
            .env("MPLBACKEND", "Agg")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| Error::Interpreter(format!("failed to start {interpreter}: {e}")))?;

        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(Error::Interpreter(format!(
                "{interpreter} started without piped stdio"
            )));
        };
        debug!(interpreter, pid = child.id(), "started interpreter");

        Ok(Self {
            interpreter: interpreter.to_string(),
            child,
            stdin,
            stdout: BufReader::new(stdout),
        })
    }

    /// Interpreter command this session runs
    #[must_use]
    pub fn interpreter(&self) -> &str {
        &self.interpreter
    }

    /// Run `code` against the session's globals
    ///
    /// # Errors
    ///
    /// Returns [`Error::Interpreter`] if the child has died or answers with
    /// something other than a reply.
    pub fn execute(&mut self, code: &str) -> Result<Reply> {
        self.request(&Request::Code { code })
    }

    /// Import `module` without binding it in the session's globals
    ///
    /// # Errors
    ///
    /// See [`PythonSession::execute`].
    pub fn import(&mut self, module: &str) -> Result<Reply> {
        self.request(&Request::Import { import: module })
    }

    fn request(&mut self, request: &Request<'_>) -> Result<Reply> {
        let mut line = serde_json::to_string(request)?;
        line.push('\n');
        self.stdin
            .write_all(line.as_bytes())
            .and_then(|()| self.stdin.flush())
            .map_err(|e| self.lost(&e.to_string()))?;

        let mut reply = String::new();
        let read = self
            .stdout
            .read_line(&mut reply)
            .map_err(|e| self.lost(&e.to_string()))?;
        if read == 0 {
            return Err(self.lost("exited unexpectedly"));
        }
        serde_json::from_str(&reply)
            .map_err(|e| Error::Interpreter(format!("unreadable reply from {}: {e}", self.interpreter)))
    }

    fn lost(&mut self, reason: &str) -> Error {
        let status = match self.child.try_wait() {
            Ok(Some(status)) => format!(" ({status})"),
            _ => String::new(),
        };
        Error::Interpreter(format!("{} {reason}{status}", self.interpreter))
    }
}

impl Drop for PythonSession {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Whether `interpreter --version` runs successfully
#[must_use]
pub fn is_available(interpreter: &str) -> bool {
    Command::new(interpreter)
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}
