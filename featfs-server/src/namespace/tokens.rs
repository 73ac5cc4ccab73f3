//! Comma-separated token intake for parameter files

use featfs_utils::{FeatfsError, Result};

/// Feed every token of `data` to `accept`, `chunk_size - 1` bytes at a time
///
/// Tokens are split on `,` and trimmed of ASCII whitespace; empty tokens are
/// skipped. The unterminated tail of a chunk is carried into the next chunk
/// when more input follows, and parsed as-is at the end of the input.
///
/// Returns the number of bytes consumed, which is `data.len()` unless
/// `accept` fails. Tokens accepted before a failure stay accepted.
pub fn feed_tokens<F>(data: &[u8], chunk_size: usize, mut accept: F) -> Result<usize>
where
    F: FnMut(&str) -> Result<()>,
{
    let window = chunk_size.saturating_sub(1).max(1);
    let mut done = 0;

    while done < data.len() {
        let end = data.len().min(done + window);
        let more_after = end < data.len();
        let mut rest = &data[done..end];
        let mut consumed = 0;

        loop {
            match rest.iter().position(|&b| b == b',') {
                Some(pos) => {
                    take_token(&rest[..pos], &mut accept)?;
                    consumed += pos + 1;
                    rest = &rest[pos + 1..];
                }
                None if more_after => {
                    if ends_token(&data[end..]) {
                        take_token(rest, &mut accept)?;
                        consumed += rest.len();
                    } else {
                        // Leading blanks never belong to the carried token
                        consumed += rest.len() - rest.trim_ascii_start().len();
                    }
                    break;
                }
                None => {
                    take_token(rest, &mut accept)?;
                    consumed += rest.len();
                    break;
                }
            }
        }

        if consumed == 0 {
            return Err(FeatfsError::invalid_input(format!(
                "value longer than {} bytes",
                window
            )));
        }
        done += consumed;
    }

    Ok(done)
}

/// Whether the input after a chunk closes the token at the chunk's end
fn ends_token(after: &[u8]) -> bool {
    matches!(
        after.iter().find(|b| !b.is_ascii_whitespace()),
        None | Some(b',')
    )
}

fn take_token<F>(raw: &[u8], accept: &mut F) -> Result<()>
where
    F: FnMut(&str) -> Result<()>,
{
    let token = raw.trim_ascii();
    if token.is_empty() {
        return Ok(());
    }
    let token = std::str::from_utf8(token)
        .map_err(|_| FeatfsError::invalid_input("value is not valid UTF-8"))?;
    accept(token)
}
