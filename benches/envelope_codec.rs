//! Envelope codec and handshake benchmarks.
//!
//! Measures the per-frame cost of the wire codec and of driving the state
//! machine through a full handshake:
//! - Encode/decode of each envelope kind
//! - `msg` bodies of increasing size
//! - Early -> Open with an in-memory transport
//!
//! Run with: cargo bench --bench envelope_codec
//! Results saved to: target/criterion/

use std::hint::black_box;
use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio::time::Instant;
use url::Url;

use resilient_signaling::protocol::{Busy, Hello, Welcome, decode, encode};
use resilient_signaling::transport::TransportNotice;
use resilient_signaling::{
    ConnectionMachine, ConnectionOptions, Envelope, HelloId, NoopObserver, Result, Transport,
    TransportEvent, TransportFactory, TransportSink,
};

// ============================================================================
// Benchmark Parameters
// ============================================================================

const BODY_FIELDS: &[usize] = &[1, 16, 256];

// ============================================================================
// In-memory Transport
// ============================================================================

struct NullTransport;

impl Transport for NullTransport {
    fn send(&mut self, data: String) -> Result<()> {
        black_box(data);
        Ok(())
    }

    fn close(&mut self, _code: u16, _reason: &str) {}
}

struct NullFactory;

impl TransportFactory for NullFactory {
    fn open(&self, _url: &Url, sink: TransportSink) -> Result<Box<dyn Transport>> {
        sink.open();
        Ok(Box::new(NullTransport))
    }
}

fn body(fields: usize) -> Value {
    let map = (0..fields)
        .map(|i| (format!("field_{i}"), json!({ "index": i, "label": "candidate" })))
        .collect::<serde_json::Map<_, _>>();
    Value::Object(map)
}

// ============================================================================
// Benchmark: Codec
// ============================================================================

fn bench_control_envelopes(c: &mut Criterion) {
    let mut group = c.benchmark_group("control_envelopes");

    let envelopes = [
        (
            "hello",
            Envelope::Hello(Hello {
                id: HelloId::generate(),
                timeout: 5000,
                version: 2,
                cookie: Some("resume-token".into()),
                body: None,
            }),
        ),
        (
            "welcome",
            Envelope::Welcome(Welcome {
                negotiated_timeout: 5000,
            }),
        ),
        (
            "busy",
            Envelope::Busy(Busy {
                keep_alive: true,
                retry_after: 250,
                cookie: Some("resume-token".into()),
            }),
        ),
        ("heartbeat", Envelope::Heartbeat),
    ];

    for (name, envelope) in &envelopes {
        let text = encode(envelope).unwrap();

        group.bench_with_input(BenchmarkId::new("encode", name), envelope, |b, envelope| {
            b.iter(|| encode(black_box(envelope)).unwrap());
        });
        group.bench_with_input(BenchmarkId::new("decode", name), &text, |b, text| {
            b.iter(|| decode(black_box(text)).unwrap());
        });
    }

    group.finish();
}

fn bench_msg_bodies(c: &mut Criterion) {
    let mut group = c.benchmark_group("msg_bodies");

    for &fields in BODY_FIELDS {
        let envelope = Envelope::msg(body(fields));
        let text = encode(&envelope).unwrap();
        group.throughput(Throughput::Bytes(text.len() as u64));

        group.bench_with_input(BenchmarkId::new("encode", fields), &envelope, |b, envelope| {
            b.iter(|| encode(black_box(envelope)).unwrap());
        });
        group.bench_with_input(BenchmarkId::new("decode", fields), &text, |b, text| {
            b.iter(|| decode(black_box(text)).unwrap());
        });
    }

    group.finish();
}

// ============================================================================
// Benchmark: Handshake
// ============================================================================

fn bench_handshake(c: &mut Criterion) {
    let url = Url::parse("wss://signaling.example.com/v2").unwrap();
    let welcome = json!({ "type": "welcome", "negotiatedTimeout": 5000 }).to_string();

    c.bench_function("handshake_to_open", |b| {
        b.iter(|| {
            let (tx, mut rx) = mpsc::unbounded_channel();
            let options = ConnectionOptions::new()
                .with_transport_factory(Arc::new(NullFactory))
                .with_event_observer(Arc::new(NoopObserver));
            let now = Instant::now();
            let mut machine = ConnectionMachine::new(url.clone(), options, tx, now).unwrap();

            let open = rx.try_recv().unwrap();
            machine.handle_transport_event(open.clone(), now);
            machine.handle_transport_event(
                TransportNotice {
                    generation: open.generation,
                    event: TransportEvent::Message(welcome.clone()),
                },
                now,
            );

            while let Some(event) = machine.poll_event() {
                black_box(event);
            }
            black_box(machine.state())
        });
    });
}

criterion_group!(benches, bench_control_envelopes, bench_msg_bodies, bench_handshake);
criterion_main!(benches);
