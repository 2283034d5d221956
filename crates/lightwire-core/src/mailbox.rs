//! Latest-value forwarding between rendezvous channels
//!
//! A mailbox always accepts on its input and offers only the newest value it
//! holds on its output. Producers never wait on a slow consumer; a consumer
//! that falls behind simply skips the values it never read.

use crossbeam_channel::{select, Receiver, Sender};
use std::thread::{self, JoinHandle};
use tracing::trace;

use crate::error::Result;

/// Spawn a mailbox worker forwarding `input` to `output`.
///
/// The worker exits when `input` disconnects (discarding any undelivered
/// value) or when `output` disconnects on a delivery attempt.
pub fn spawn_mailbox<T: Send + 'static>(
    name: &str,
    input: Receiver<T>,
    output: Sender<T>,
) -> Result<JoinHandle<()>> {
    let handle = thread::Builder::new()
        .name(format!("mailbox-{}", name))
        .spawn(move || run_mailbox(input, output))?;
    Ok(handle)
}

fn run_mailbox<T>(input: Receiver<T>, output: Sender<T>) {
    let mut pending: Option<T> = None;

    loop {
        match pending.take() {
            Some(value) => {
                select! {
                    recv(input) -> msg => match msg {
                        Ok(newer) => pending = Some(newer),
                        Err(_) => break,
                    },
                    send(output, value) -> res => {
                        if res.is_err() {
                            break;
                        }
                    }
                }
            }
            None => match input.recv() {
                Ok(value) => pending = Some(value),
                Err(_) => break,
            },
        }
    }

    trace!("Mailbox worker exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;
    use std::time::Duration;

    #[test]
    fn test_delivers_value() {
        let (in_tx, in_rx) = bounded(0);
        let (out_tx, out_rx) = bounded(0);
        spawn_mailbox("test", in_rx, out_tx).unwrap();

        in_tx.send(123).unwrap();
        assert_eq!(out_rx.recv_timeout(Duration::from_secs(1)), Ok(123));
    }

    #[test]
    fn test_skips_unread_values() {
        let (in_tx, in_rx) = bounded(0);
        let (out_tx, out_rx) = bounded(0);
        spawn_mailbox("test", in_rx, out_tx).unwrap();

        in_tx.send(100).unwrap();
        in_tx.send(200).unwrap();

        assert_eq!(out_rx.recv_timeout(Duration::from_secs(1)), Ok(200));
    }

    #[test]
    fn test_exits_when_input_closes() {
        let (in_tx, in_rx) = bounded::<u8>(0);
        let (out_tx, _out_rx) = bounded(0);
        let worker = spawn_mailbox("test", in_rx, out_tx).unwrap();

        drop(in_tx);
        worker.join().unwrap();
    }
}
