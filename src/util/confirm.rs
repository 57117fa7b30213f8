//! Interactive y/n confirmation (spec §6), shared by the delete and
//! update action drivers before they touch any data. Ported from the
//! original tool's `input("Are you sure you want to continue? (y/n)")`
//! loop, which re-prompts on anything but `y` or `n`.

use tokio::io::{AsyncBufReadExt, BufReader};

use crate::error::{Result, TriremeError};

/// Prompts on stdout and blocks on stdin until the user answers `y` or
/// `n`. Returns `Ok(true)` to proceed, `Ok(false)` to abort; an I/O error
/// reading stdin (e.g. it was closed) is reported rather than looped on.
pub async fn confirm(prompt: &str) -> Result<bool> {
    let mut reader = BufReader::new(tokio::io::stdin());
    let mut line = String::new();
    loop {
        print!("{} (y/n) ", prompt);
        std::io::Write::flush(&mut std::io::stdout()).map_err(TriremeError::Io)?;

        line.clear();
        let bytes_read = reader
            .read_line(&mut line)
            .await
            .map_err(TriremeError::Io)?;
        if bytes_read == 0 {
            return Err(TriremeError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "stdin closed while awaiting confirmation",
            )));
        }

        match line.trim().to_lowercase().as_str() {
            "y" => return Ok(true),
            "n" => return Ok(false),
            _ => continue,
        }
    }
}
