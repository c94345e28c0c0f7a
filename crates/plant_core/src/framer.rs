//! Enquadramento de linhas sobre um fluxo de bytes (link serial).
//!
//! Cada chamada a [`LineFramer::next_line`] faz no máximo um `read` no
//! dispositivo. Linhas parciais ficam no buffer entre chamadas.

use std::io::{ErrorKind, Read};
use tracing::{debug, warn};

/// Tamanho do bloco lido por chamada.
const READ_CHUNK: usize = 512;

/// Tamanho máximo padrão de uma linha.
pub const DEFAULT_MAX_LINE_BYTES: usize = 4096;

/// Erros fatais da fonte de bytes.
#[derive(Debug, thiserror::Error)]
pub enum FramerError {
    #[error("Conexão perdida: {0}")]
    ConnectionLost(String),
}

/// Como interpretar um `read` que devolve 0 bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ZeroReadPolicy {
    /// Serial com timeout: 0 bytes = nada chegou ainda.
    #[default]
    Idle,
    /// Pipe/arquivo: 0 bytes = EOF, a fonte acabou.
    Disconnect,
}

/// Transforma um `Read` em linhas de texto aparadas e não vazias.
pub struct LineFramer<R> {
    source: R,
    buf: Vec<u8>,
    max_line_bytes: usize,
    zero_read: ZeroReadPolicy,
    /// Bytes após o último `\n` do buffer
    partial: usize,
    /// Descartando o resto de uma linha grande demais até o próximo `\n`
    discarding: bool,
    closed: bool,
}

impl<R: Read> LineFramer<R> {
    pub fn new(source: R) -> Self {
        Self {
            source,
            buf: Vec::with_capacity(READ_CHUNK),
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
            zero_read: ZeroReadPolicy::Idle,
            partial: 0,
            discarding: false,
            closed: false,
        }
    }

    pub fn with_max_line_bytes(mut self, max: usize) -> Self {
        self.max_line_bytes = max.max(1);
        self
    }

    pub fn with_zero_read_policy(mut self, policy: ZeroReadPolicy) -> Self {
        self.zero_read = policy;
        self
    }

    /// Próxima linha, se houver.
    ///
    /// - `Ok(Some(line))` – linha completa, aparada e não vazia
    /// - `Ok(None)` – nada disponível neste poll (timeout); tente de novo
    /// - `Err(ConnectionLost)` – a fonte não volta mais
    pub fn next_line(&mut self) -> Result<Option<String>, FramerError> {
        if let Some(line) = self.take_buffered_line() {
            return Ok(Some(line));
        }
        if self.closed {
            return Err(FramerError::ConnectionLost("fonte encerrada".into()));
        }

        let mut chunk = [0u8; READ_CHUNK];
        match self.source.read(&mut chunk) {
            Ok(0) => match self.zero_read {
                ZeroReadPolicy::Idle => Ok(None),
                ZeroReadPolicy::Disconnect => {
                    self.closed = true;
                    // Última linha sem `\n` ainda vale
                    match self.flush_partial() {
                        Some(line) => Ok(Some(line)),
                        None => Err(FramerError::ConnectionLost("fim do fluxo (EOF)".into())),
                    }
                }
            },
            Ok(n) => {
                self.push_bytes(&chunk[..n]);
                Ok(self.take_buffered_line())
            }
            Err(e)
                if matches!(
                    e.kind(),
                    ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted
                ) =>
            {
                Ok(None)
            }
            Err(e) => Err(FramerError::ConnectionLost(e.to_string())),
        }
    }

    fn push_bytes(&mut self, bytes: &[u8]) {
        for &b in bytes {
            if self.discarding {
                if b == b'\n' {
                    self.discarding = false;
                }
                continue;
            }
            self.buf.push(b);
            if b == b'\n' {
                self.partial = 0;
                continue;
            }
            self.partial += 1;
            if self.partial > self.max_line_bytes {
                warn!(
                    "Linha maior que {} bytes sem terminador, descartando",
                    self.max_line_bytes
                );
                self.buf.truncate(self.buf.len() - self.partial);
                self.partial = 0;
                self.discarding = true;
            }
        }
    }

    fn take_buffered_line(&mut self) -> Option<String> {
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.buf.drain(..=pos).collect();
            if let Some(line) = to_line(&raw) {
                return Some(line);
            }
        }
        None
    }

    fn flush_partial(&mut self) -> Option<String> {
        let raw = std::mem::take(&mut self.buf);
        self.partial = 0;
        to_line(&raw)
    }
}

/// Decodifica com substituição de UTF-8 inválido, apara e descarta vazias.
fn to_line(raw: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(raw);
    let trimmed = text.trim();
    if trimmed.is_empty() {
        debug!("Linha vazia ignorada");
        None
    } else {
        Some(trimmed.to_string())
    }
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────
