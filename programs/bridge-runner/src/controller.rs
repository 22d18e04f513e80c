//! Line-delimited JSON transport to a controller process.

use std::{
    io::{BufRead, BufReader, Write},
    process::{Child, ChildStdin, ChildStdout, Command, ExitStatus, Stdio},
};

use dibc_bridge::{Controller, ControllerError, PortDispatch};
use serde::{Deserialize, Serialize};

use crate::config::ControllerCommand;

/// Frames written to the controller.
#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
enum OutboundFrame<'a> {
    Call {
        message: &'a str,
    },
    PortReply {
        #[serde(skip_serializing_if = "Option::is_none")]
        response: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

/// Frames read from the controller.
#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
enum InboundFrame {
    PortCall { port: String, request: String },
    Return { response: String },
    Fail { error: String },
}

/// A [`Controller`] speaking one JSON frame per line over a reader/writer pair.
///
/// A call writes a `call` frame, then serves `port-call` frames through the
/// re-entry handle until the controller sends `return` or `fail`.
#[derive(Debug)]
pub struct LineController<R, W> {
    reader: R,
    writer: W,
}

impl<R: BufRead, W: Write> LineController<R, W> {
    /// A controller reading frames from `reader` and writing them to `writer`.
    pub const fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    /// Give up the transport.
    pub fn into_inner(self) -> (R, W) {
        (self.reader, self.writer)
    }

    fn send(&mut self, frame: &OutboundFrame<'_>) -> Result<(), ControllerError> {
        let line =
            serde_json::to_string(frame).map_err(|e| ControllerError::Protocol(e.to_string()))?;
        writeln!(self.writer, "{line}")?;
        self.writer.flush()?;
        Ok(())
    }

    fn receive(&mut self) -> Result<InboundFrame, ControllerError> {
        let mut line = String::new();
        loop {
            line.clear();
            if self.reader.read_line(&mut line)? == 0 {
                return Err(ControllerError::Disconnected);
            }
            if !line.trim().is_empty() {
                break;
            }
        }
        serde_json::from_str(line.trim())
            .map_err(|e| ControllerError::Protocol(format!("bad frame {}: {e}", line.trim())))
    }
}

impl<R: BufRead, W: Write> Controller for LineController<R, W> {
    fn call(
        &mut self,
        message: &str,
        ports: &mut dyn PortDispatch,
    ) -> Result<String, ControllerError> {
        self.send(&OutboundFrame::Call { message })?;

        loop {
            match self.receive()? {
                InboundFrame::PortCall { port, request } => {
                    let reply = match ports.call_port(&port, &request) {
                        Ok(response) => OutboundFrame::PortReply {
                            response: Some(response),
                            error: None,
                        },
                        Err(err) => {
                            tracing::debug!(port, %err, "port request failed");
                            OutboundFrame::PortReply {
                                response: None,
                                error: Some(err.to_string()),
                            }
                        }
                    };
                    self.send(&reply)?;
                }
                InboundFrame::Return { response } => return Ok(response),
                InboundFrame::Fail { error } => return Err(ControllerError::Rejected(error)),
            }
        }
    }
}

/// A controller running as a child process, framed over its stdin/stdout.
#[derive(Debug)]
pub struct ProcessController {
    child: Child,
    line: LineController<BufReader<ChildStdout>, ChildStdin>,
}

impl ProcessController {
    /// Start `command` with piped stdin and stdout.
    ///
    /// # Errors
    /// Returns an error if the process cannot be started.
    pub fn spawn(command: &ControllerCommand) -> Result<Self, ControllerError> {
        let mut child = Command::new(&command.command)
            .args(&command.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()?;

        let stdin = child.stdin.take().ok_or(ControllerError::Disconnected)?;
        let stdout = child.stdout.take().ok_or(ControllerError::Disconnected)?;
        tracing::info!(command = %command.command, pid = child.id(), "controller started");

        Ok(Self {
            child,
            line: LineController::new(BufReader::new(stdout), stdin),
        })
    }

    /// Close the controller's stdin and wait for it to exit.
    ///
    /// # Errors
    /// Returns an error if waiting on the process fails.
    pub fn finish(self) -> std::io::Result<ExitStatus> {
        let Self { mut child, line } = self;
        drop(line);
        child.wait()
    }
}

impl Controller for ProcessController {
    fn call(
        &mut self,
        message: &str,
        ports: &mut dyn PortDispatch,
    ) -> Result<String, ControllerError> {
        self.line.call(message, ports)
    }
}
