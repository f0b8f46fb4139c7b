use futures::{Stream, StreamExt};
use log::trace;

use crate::error::{BootstrapError, BootstrapResult};

/// Resolves with the first item of `channel` accepted by `predicate`.
///
/// Items that do not match are dropped. The channel is consumed and dropped
/// when the future resolves, which tears down whatever listener backs it, so
/// nothing stays armed after the single resolution.
pub async fn await_once<S, P>(mut channel: S, mut predicate: P) -> BootstrapResult<S::Item>
where
    S: Stream + Unpin,
    P: FnMut(&S::Item) -> bool,
{
    let mut skipped = 0usize;
    while let Some(item) = channel.next().await {
        if predicate(&item) {
            if skipped > 0 {
                trace!("await_once: ignored {skipped} unrelated message(s)");
            }
            return Ok(item);
        }
        skipped += 1;
    }
    Err(BootstrapError::ChannelClosed)
}
