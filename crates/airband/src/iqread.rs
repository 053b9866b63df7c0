//! I/Q Data Reading Module
//!
//! This module provides functionality to read blocks of raw I/Q bytes from
//! files, standard input, and TCP streams. The downstream conditioner works
//! on offset-127 unsigned pairs, so signed 8-bit recordings are re-biased
//! while reading.

use std::io::Read;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::IqFormat;

/**
 * Synchronous I/Q Reader
 */
pub struct IqRead<R: Read> {
    format: IqFormat,
    reader: R,
}

impl IqRead<std::io::BufReader<std::fs::File>> {
    pub fn from_file<P: AsRef<Path>>(path: P, format: IqFormat) -> Result<Self> {
        let path = expanduser(path.as_ref().to_path_buf());
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        Ok(Self { format, reader })
    }
}

impl IqRead<std::io::BufReader<std::io::Stdin>> {
    pub fn from_stdin(format: IqFormat) -> Self {
        let reader = std::io::BufReader::new(std::io::stdin());
        Self { format, reader }
    }
}

impl IqRead<std::io::BufReader<std::net::TcpStream>> {
    pub fn from_tcp(addr: &str, port: u16, format: IqFormat) -> Result<Self> {
        let stream = std::net::TcpStream::connect((addr, port))?;
        let reader = std::io::BufReader::new(stream);
        Ok(Self { format, reader })
    }
}

impl<R: Read> IqRead<R> {
    /// Fill `out` with IQ bytes, converting to offset-127 unsigned form.
    /// Returns the number of bytes read; zero means end of stream.
    pub fn read_block(&mut self, out: &mut [u8]) -> Result<usize> {
        let mut total = 0;
        while total < out.len() {
            match self.reader.read(&mut out[total..]) {
                Ok(0) => break,
                Ok(n) => total += n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        if self.format == IqFormat::Cs8 {
            for b in out[..total].iter_mut() {
                *b ^= 0x80;
            }
        }
        Ok(total)
    }
}

fn expanduser(path: PathBuf) -> PathBuf {
    if let Some(stripped) = path.to_str().and_then(|p| p.strip_prefix('~')) {
        if let Some(home_dir) = dirs::home_dir() {
            return home_dir.join(stripped.trim_start_matches('/'));
        }
    }
    path
}
