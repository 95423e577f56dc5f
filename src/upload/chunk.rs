//! Chunking and hashing
//!
//! Files are transmitted in fixed 5 MiB blocks. Each block carries the
//! SHA-256 of exactly its own bytes; finalize carries the SHA-256 of the
//! whole file.
//!
//! # Example
//!
//! ```no_run
//! use asset_uploadr::upload::{ChunkReader, FileId};
//!
//! # async fn example() -> std::io::Result<()> {
//! let file = tokio::fs::File::open("photo.jpg").await?;
//! let mut reader = ChunkReader::new(file, FileId::new("file-id"));
//!
//! while let Some(chunk) = reader.next_chunk().await? {
//!     println!("chunk {} ({} bytes): {}", chunk.index, chunk.data.len(), chunk.digest);
//! }
//! # Ok(())
//! # }
//! ```

use super::FileId;
use bytes::Bytes;
use sha2::{Digest, Sha256};
use std::io;
use std::path::Path;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Chunk size (5 MiB), fixed by the protocol
pub const CHUNK_SIZE: usize = 5 * 1024 * 1024;

/// Number of chunks a file of `size` bytes is split into
pub fn chunk_count(size: u64) -> u64 {
    size.div_ceil(CHUNK_SIZE as u64)
}

/// Compute hex encoded SHA-256 of data
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Compute hex encoded SHA-256 of a whole file
///
/// Reads in `CHUNK_SIZE` blocks so memory use stays bounded.
pub async fn file_digest<P: AsRef<Path>>(path: P) -> io::Result<String> {
    let mut file = tokio::fs::File::open(path).await?;
    reader_digest(&mut file).await
}

/// Compute hex encoded SHA-256 of everything left in `reader`
pub async fn reader_digest<R: AsyncRead + Unpin>(reader: &mut R) -> io::Result<String> {
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let n = read_block(reader, &mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Fill `buf` from `reader`, stopping early only at EOF
async fn read_block<R: AsyncRead + Unpin>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]).await {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// One chunk in flight; dropped once acknowledged
#[derive(Debug, Clone)]
pub struct ChunkDescriptor {
    pub file_id: FileId,
    /// Sequence index, starting at 0
    pub index: u64,
    pub data: Bytes,
    /// Hex SHA-256 of `data`
    pub digest: String,
}

impl ChunkDescriptor {
    pub fn new(file_id: FileId, index: u64, data: Bytes) -> Self {
        let digest = sha256_hex(&data);
        Self {
            file_id,
            index,
            data,
            digest,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Sequential reader producing hashed chunks
pub struct ChunkReader<R> {
    reader: R,
    file_id: FileId,
    chunk_size: usize,
    next_index: u64,
}

impl<R: AsyncRead + Unpin> ChunkReader<R> {
    /// Create a reader using the protocol chunk size
    pub fn new(reader: R, file_id: FileId) -> Self {
        Self::with_chunk_size(reader, file_id, CHUNK_SIZE)
    }

    /// Create a reader with a custom chunk size (minimum 1 byte)
    pub fn with_chunk_size(reader: R, file_id: FileId, chunk_size: usize) -> Self {
        Self {
            reader,
            file_id,
            chunk_size: chunk_size.max(1),
            next_index: 0,
        }
    }

    /// Read the next chunk
    ///
    /// Every chunk but the last is exactly `chunk_size` bytes. Returns
    /// `None` once a read yields zero bytes; the index is not advanced then.
    pub async fn next_chunk(&mut self) -> io::Result<Option<ChunkDescriptor>> {
        let mut buf = vec![0u8; self.chunk_size];
        let n = read_block(&mut self.reader, &mut buf).await?;
        if n == 0 {
            return Ok(None);
        }
        buf.truncate(n);

        let chunk = ChunkDescriptor::new(self.file_id.clone(), self.next_index, Bytes::from(buf));
        self.next_index += 1;
        Ok(Some(chunk))
    }

    /// Number of chunks produced so far
    pub fn chunks_read(&self) -> u64 {
        self.next_index
    }
}
