//! Direct patching of sources into sinks
//!
//! A patch is a proxy worker that copies every value from a source's output
//! port into a sink's input port until it is unpatched or the source goes
//! away. Kinds are checked before any port is touched, so a rejected patch
//! leaves both endpoints exactly as they were.

use crossbeam_channel::{select, Receiver, Sender};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use tracing::{debug, info};

use crate::error::{CoreError, Result};
use crate::port::{FrameSink, FrameSource, InputHandle, OutputPort, ValueKind};

/// Identifier of an active patch
pub type PatchId = u64;

struct ActivePatch {
    label: String,
    // Dropping this sender stops the proxy
    stop: Option<Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

impl ActivePatch {
    fn shutdown(&mut self) {
        self.stop.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

/// Registry of live patches
#[derive(Default)]
pub struct Patchbay {
    next_id: AtomicU64,
    patches: Mutex<HashMap<PatchId, ActivePatch>>,
}

impl Patchbay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Patch `source` into `sink`.
    ///
    /// Returns [`CoreError::IncompatibleEndpoint`] when the kinds differ.
    pub fn patch(&self, source: &dyn FrameSource, sink: &dyn FrameSink) -> Result<PatchId> {
        let label = format!("{} -> {}", source.label(), sink.label());

        if source.output_kind() != sink.input_kind() {
            return Err(mismatch(source, sink, source.output_kind(), sink.input_kind()));
        }

        // A claim taken here is released again on every early return
        let output = source.output()?;
        if output.kind() != source.output_kind() {
            return Err(mismatch(source, sink, output.kind(), sink.input_kind()));
        }
        let input = sink.input()?;
        let (port, claim) = output.into_parts();
        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(0);

        let builder = thread::Builder::new().name(format!("patch-{}", label));
        let worker = match (port, input) {
            (OutputPort::Frame(rx), InputHandle::Frame(tx)) => builder.spawn(move || {
                let _claim = claim;
                proxy(rx, tx, stop_rx)
            })?,
            (OutputPort::Level(rx), InputHandle::Level(tx)) => builder.spawn(move || {
                let _claim = claim;
                proxy(rx, tx, stop_rx)
            })?,
            (port, input) => {
                // Sink handed out a different kind than it declared
                return Err(mismatch(source, sink, port.kind(), input.kind()));
            }
        };

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        info!("Patched {} (id {})", label, id);

        self.patches.lock().insert(
            id,
            ActivePatch {
                label,
                stop: Some(stop_tx),
                worker: Some(worker),
            },
        );

        Ok(id)
    }

    /// Stop a patch. Returns `false` if the id is unknown.
    pub fn unpatch(&self, id: PatchId) -> bool {
        let removed = self.patches.lock().remove(&id);
        match removed {
            Some(mut patch) => {
                patch.shutdown();
                info!("Unpatched {} (id {})", patch.label, id);
                true
            }
            None => false,
        }
    }

    /// Number of patches registered, including ones whose source has closed
    pub fn len(&self) -> usize {
        self.patches.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.patches.lock().is_empty()
    }
}

impl Drop for Patchbay {
    fn drop(&mut self) {
        for (_, mut patch) in self.patches.lock().drain() {
            patch.shutdown();
        }
    }
}

fn mismatch(
    source: &dyn FrameSource,
    sink: &dyn FrameSink,
    output: ValueKind,
    input: ValueKind,
) -> CoreError {
    CoreError::IncompatibleEndpoint {
        output: format!("{} ({})", source.label(), output),
        input: format!("{} ({})", sink.label(), input),
    }
}

fn proxy<T>(output: Receiver<T>, input: Sender<T>, stop: Receiver<()>) {
    loop {
        select! {
            recv(output) -> msg => match msg {
                Ok(value) => {
                    select! {
                        send(input, value) -> res => {
                            if res.is_err() {
                                break;
                            }
                        }
                        recv(stop) -> _ => break,
                    }
                }
                Err(_) => {
                    debug!("Patch source closed");
                    break;
                }
            },
            recv(stop) -> _ => break,
        }
    }
}
