//! JSON-lines input source
//!
//! Each line is one [`KeyEvent`], e.g. `{"type":"press","key":"Control"}`.
//! Useful for driving the daemon from scripts or another input stack.

use flowkeys::KeyEvent;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::KeyEventStream;

/// Read key events from `reader`, one JSON object per line.
///
/// Blank lines are skipped and malformed lines are logged and skipped. The
/// stream ends at EOF or on a read error.
pub fn json_lines<R>(reader: R) -> KeyEventStream
where
    R: AsyncBufRead + Send + Unpin + 'static,
{
    let stream = futures::stream::unfold(reader.lines(), |mut lines| async move {
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<KeyEvent>(line) {
                        Ok(event) => return Some((event, lines)),
                        Err(e) => tracing::warn!("Ignoring malformed event {:?}: {}", line, e),
                    }
                }
                Ok(None) => return None,
                Err(e) => {
                    tracing::warn!("Stopped reading input: {}", e);
                    return None;
                }
            }
        }
    });

    Box::pin(stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_reads_events() {
        let input: &'static [u8] = b"{\"type\":\"press\",\"key\":\"Control\"}\n\
              \n\
              {\"type\":\"release\",\"key\":\"Control\"}\n";

        let events: Vec<KeyEvent> = json_lines(input).collect().await;
        assert_eq!(
            events,
            vec![KeyEvent::press("Control"), KeyEvent::release("Control")]
        );
    }

    #[tokio::test]
    async fn test_skips_malformed_lines() {
        let input: &'static [u8] = b"not json\n\
              {\"type\":\"hold\",\"key\":\"a\"}\n\
              {\"type\":\"press\",\"key\":\"a\"}\n";

        let events: Vec<KeyEvent> = json_lines(input).collect().await;
        assert_eq!(events, vec![KeyEvent::press("a")]);
    }
}
