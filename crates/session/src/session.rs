//! Driving one program through one connection.
//!
//! The driver walks the program in order: interactive input is written when
//! its instruction is reached, and every declared output must arrive
//! verbatim, newline included, before the next instruction is considered.
//! The first divergence fails the whole program.

use crate::error::{SessionError, SessionResult};
use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use veighty_config::TargetConfig;
use veighty_isa::protocol::{BYTECODE_PROMPT, GREETING, LENGTH_PROMPT};
use veighty_isa::Program;

/// Opens connections to a target.
#[async_trait]
pub trait Connect: Send + Sync {
    type Stream: AsyncRead + AsyncWrite + Unpin + Send;

    async fn connect(&self) -> SessionResult<Self::Stream>;

    /// Address shown in logs.
    fn address(&self) -> String;
}

/// TCP connector with a connect timeout.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    address: String,
    connect_timeout: Duration,
}

impl TcpConnector {
    pub fn new(address: impl Into<String>, connect_timeout: Duration) -> Self {
        Self {
            address: address.into(),
            connect_timeout,
        }
    }

    pub fn from_config(config: &TargetConfig) -> Self {
        Self::new(
            config.address(),
            Duration::from_millis(config.connect_timeout_ms),
        )
    }
}

#[async_trait]
impl Connect for TcpConnector {
    type Stream = TcpStream;

    async fn connect(&self) -> SessionResult<TcpStream> {
        let stream = match timeout(self.connect_timeout, TcpStream::connect(&self.address)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => {
                warn!("Failed to connect to {}: {}", self.address, source);
                return Err(SessionError::Connect {
                    address: self.address.clone(),
                    source,
                });
            }
            Err(_) => {
                return Err(SessionError::ConnectTimeout {
                    address: self.address.clone(),
                    timeout_ms: self.connect_timeout.as_millis() as u64,
                });
            }
        };
        stream.set_nodelay(true)?;
        debug!("TCP connection established to {}", self.address);
        Ok(stream)
    }

    fn address(&self) -> String {
        self.address.clone()
    }
}

/// One connection to the target.
pub struct Session<S> {
    stream: BufReader<S>,
    io_timeout: Duration,
}

impl<S: AsyncRead + AsyncWrite + Unpin> Session<S> {
    pub fn new(stream: S, io_timeout: Duration) -> Self {
        Self {
            stream: BufReader::new(stream),
            io_timeout,
        }
    }

    /// Sends `program` and checks every declared output. Mismatches,
    /// timeouts and early disconnects yield `Ok(false)`.
    pub async fn run(&mut self, program: &Program) -> SessionResult<bool> {
        match self.drive(program).await {
            Ok(matched) => Ok(matched),
            Err(e) if e.is_interrupted() => {
                info!("Program failed: {}", e);
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    async fn drive(&mut self, program: &Program) -> SessionResult<bool> {
        if !self.handshake(program.encoded_len()).await? {
            return Ok(false);
        }
        debug!(bytes = program.encoded_len(), "sending payload");
        self.send(&program.encode()).await?;

        for (index, instruction) in program.instructions().iter().enumerate() {
            if let Some(input) = instruction.input() {
                debug!(index, len = input.len(), "sending input");
                self.send(input).await?;
            }
            if let Some(output) = instruction.expected_output() {
                let mut expected = output.to_vec();
                expected.push(b'\n');
                if !self.expect(&expected, "instruction output").await? {
                    info!(index, %instruction, "unexpected output");
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }

    /// Greeting, length line and bytecode prompt.
    pub async fn handshake(&mut self, program_len: usize) -> SessionResult<bool> {
        for block in GREETING {
            if !self.expect(block.as_bytes(), "greeting").await? {
                return Ok(false);
            }
        }
        if !self.expect(LENGTH_PROMPT.as_bytes(), "length prompt").await? {
            return Ok(false);
        }
        self.send(format!("{}\n", program_len).as_bytes()).await?;
        self.expect(BYTECODE_PROMPT.as_bytes(), "bytecode prompt").await
    }

    /// Reads exactly `expected.len()` bytes and compares them.
    pub async fn expect(&mut self, expected: &[u8], context: &str) -> SessionResult<bool> {
        let mut received = vec![0u8; expected.len()];
        self.read_exact_slice(&mut received, context).await?;
        if received != expected {
            info!(
                "Didn't receive expected {}. Expected: {:?} Received: {:?}",
                context,
                String::from_utf8_lossy(expected),
                String::from_utf8_lossy(&received)
            );
            return Ok(false);
        }
        Ok(true)
    }

    /// Everything the target prints until it closes the connection or stays
    /// silent for the I/O timeout.
    pub async fn read_remaining(&mut self) -> SessionResult<Vec<u8>> {
        let mut buffer = Vec::new();
        match timeout(self.io_timeout, self.stream.read_to_end(&mut buffer)).await {
            Ok(result) => {
                result?;
            }
            Err(_) => debug!(len = buffer.len(), "target kept the connection open"),
        }
        Ok(buffer)
    }

    async fn send(&mut self, bytes: &[u8]) -> SessionResult<()> {
        let stream = self.stream.get_mut();
        timeout(self.io_timeout, async {
            stream.write_all(bytes).await?;
            stream.flush().await
        })
        .await
        .map_err(|_| SessionError::Timeout {
            context: "write".into(),
        })?
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::BrokenPipe | std::io::ErrorKind::ConnectionReset => {
                SessionError::Disconnected {
                    context: "write".into(),
                }
            }
            _ => SessionError::Io(e),
        })
    }

    async fn read_exact_slice(&mut self, buf: &mut [u8], context: &str) -> SessionResult<()> {
        timeout(self.io_timeout, self.stream.read_exact(buf))
            .await
            .map_err(|_| SessionError::Timeout {
                context: context.to_string(),
            })?
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::UnexpectedEof | std::io::ErrorKind::ConnectionReset => {
                    SessionError::Disconnected {
                        context: context.to_string(),
                    }
                }
                _ => SessionError::Io(e),
            })?;
        Ok(())
    }
}
