// RouterOS API framing.
//
// A word is a variable-width length prefix followed by that many bytes.
// A sentence is a run of words terminated by a zero-length word. The
// length prefix uses the high bits of the first byte to signal width:
//
//   0xxxxxxx                  -- 1 byte,  len < 0x80
//   10xxxxxx + 1 byte         -- 2 bytes, len < 0x4000
//   110xxxxx + 2 bytes        -- 3 bytes, len < 0x20_0000
//   1110xxxx + 3 bytes        -- 4 bytes, len < 0x1000_0000
//   11110000 + 4 bytes        -- 5 bytes, full u32
//
// First bytes >= 0xF8 are reserved control bytes and rejected.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::Error;

/// Largest reply word we will buffer. Router replies are command output
/// lines and certificate text, well under this; a larger advertised
/// length means a corrupt or hostile peer.
pub const MAX_WORD_LEN: u32 = 8 * 1024 * 1024;

/// Encode a word length into its wire form.
///
/// Returns the prefix bytes and how many of them are valid.
#[allow(clippy::cast_possible_truncation)]
pub fn encode_length(len: u32) -> ([u8; 5], usize) {
    let mut buf = [0u8; 5];
    if len < 0x80 {
        buf[0] = len as u8;
        (buf, 1)
    } else if len < 0x4000 {
        let v = len | 0x8000;
        buf[0] = (v >> 8) as u8;
        buf[1] = v as u8;
        (buf, 2)
    } else if len < 0x20_0000 {
        let v = len | 0xC0_0000;
        buf[0] = (v >> 16) as u8;
        buf[1] = (v >> 8) as u8;
        buf[2] = v as u8;
        (buf, 3)
    } else if len < 0x1000_0000 {
        let v = len | 0xE000_0000;
        buf[0] = (v >> 24) as u8;
        buf[1] = (v >> 16) as u8;
        buf[2] = (v >> 8) as u8;
        buf[3] = v as u8;
        (buf, 4)
    } else {
        buf[0] = 0xF0;
        buf[1..5].copy_from_slice(&len.to_be_bytes());
        (buf, 5)
    }
}

/// Read a word length prefix from the stream.
pub async fn read_length<R>(reader: &mut R) -> Result<u32, Error>
where
    R: AsyncRead + Unpin,
{
    let first = reader.read_u8().await?;

    let (mut value, extra) = match first {
        b if b < 0x80 => (u32::from(b), 0usize),
        b if b < 0xC0 => (u32::from(b & 0x3F), 1),
        b if b < 0xE0 => (u32::from(b & 0x1F), 2),
        b if b < 0xF0 => (u32::from(b & 0x0F), 3),
        0xF0 => (0, 4),
        b => {
            return Err(Error::Protocol {
                message: format!("reserved control byte {b:#04x} in length prefix"),
            });
        }
    };

    for _ in 0..extra {
        value = (value << 8) | u32::from(reader.read_u8().await?);
    }

    Ok(value)
}

/// Write a single word (length prefix + bytes).
pub async fn write_word<W>(writer: &mut W, word: &[u8]) -> Result<(), Error>
where
    W: AsyncWrite + Unpin,
{
    let len = u32::try_from(word.len()).map_err(|_| Error::Protocol {
        message: format!("word of {} bytes exceeds protocol maximum", word.len()),
    })?;
    let (prefix, n) = encode_length(len);
    writer.write_all(&prefix[..n]).await?;
    writer.write_all(word).await?;
    Ok(())
}

/// Write a full sentence: every word, then the zero-length terminator.
pub async fn write_sentence<W, I, S>(writer: &mut W, words: I) -> Result<(), Error>
where
    W: AsyncWrite + Unpin,
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    for word in words {
        write_word(writer, word.as_ref().as_bytes()).await?;
    }
    writer.write_all(&[0]).await?;
    writer.flush().await?;
    Ok(())
}

/// Read a full sentence (until the zero-length terminator).
///
/// Words must be valid UTF-8; RouterOS replies always are.
pub async fn read_sentence<R>(reader: &mut R) -> Result<Vec<String>, Error>
where
    R: AsyncRead + Unpin,
{
    let mut words = Vec::new();
    loop {
        let len = read_length(reader).await?;
        if len == 0 {
            if words.is_empty() {
                // Keepalive-style empty sentence; skip it.
                continue;
            }
            return Ok(words);
        }
        if len > MAX_WORD_LEN {
            return Err(Error::Protocol {
                message: format!("reply word of {len} bytes exceeds the {MAX_WORD_LEN} byte limit"),
            });
        }
        let mut buf = vec![0u8; len as usize];
        reader.read_exact(&mut buf).await?;
        let word = String::from_utf8(buf).map_err(|e| Error::Protocol {
            message: format!("non-UTF-8 word in reply: {e}"),
        })?;
        words.push(word);
    }
}
