//! In-memory transport that records traffic, for tests.

use std::sync::Arc;

use parking_lot::Mutex;
use url::Url;

use crate::error::{Error, Result};
use crate::transport::{Transport, TransportFactory, TransportSink};

/// Everything the mock transports saw, shared with the test.
#[derive(Debug, Default)]
pub struct Recorder {
    /// One sink per opened transport, in open order.
    pub sinks: Vec<TransportSink>,
    /// `(generation, frame)` per successful send.
    pub sent: Vec<(u64, String)>,
    /// `(generation, code, reason)` per close.
    pub closed: Vec<(u64, u16, String)>,
    /// Makes the factory refuse to open.
    pub fail_open: bool,
    /// Makes every send fail.
    pub fail_send: bool,
}

impl Recorder {
    pub fn shared() -> Arc<Mutex<Self>> {
        Arc::new(Mutex::new(Self::default()))
    }
}

/// Factory handing out [`MockTransport`]s.
#[derive(Debug, Clone)]
pub struct MockFactory(pub Arc<Mutex<Recorder>>);

impl TransportFactory for MockFactory {
    fn open(&self, _url: &Url, sink: TransportSink) -> Result<Box<dyn Transport>> {
        let mut recorder = self.0.lock();
        if recorder.fail_open {
            return Err(Error::connection("refused"));
        }
        let generation = sink.generation();
        recorder.sinks.push(sink);
        Ok(Box::new(MockTransport {
            generation,
            recorder: Arc::clone(&self.0),
        }))
    }
}

/// Transport writing into a [`Recorder`].
#[derive(Debug)]
pub struct MockTransport {
    generation: u64,
    recorder: Arc<Mutex<Recorder>>,
}

impl Transport for MockTransport {
    fn send(&mut self, data: String) -> Result<()> {
        let mut recorder = self.recorder.lock();
        if recorder.fail_send {
            return Err(Error::connection("broken pipe"));
        }
        recorder.sent.push((self.generation, data));
        Ok(())
    }

    fn close(&mut self, code: u16, reason: &str) {
        self.recorder
            .lock()
            .closed
            .push((self.generation, code, reason.to_string()));
    }
}
