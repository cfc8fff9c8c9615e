use std::hint::black_box;

use bencher::RESPONSES;
use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use micro_client::codec::{PayloadItem, ResponseHeadDecoder};
use micro_client::response_builder::ResponseBuilder;
use tokio_util::bytes::BytesMut;
use tokio_util::codec::Decoder;

fn benchmark_response_decoder(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("response_decoder");

    for fixture in &RESPONSES {
        group.throughput(Throughput::Bytes(fixture.len()));
        group.bench_with_input(BenchmarkId::from_parameter(fixture.name()), fixture, |b, fixture| {
            let mut head_decoder = ResponseHeadDecoder::default();
            b.iter_batched_ref(
                || BytesMut::from(fixture.content()),
                |bytes_mut| {
                    let head = head_decoder.decode(bytes_mut).expect("input should be a valid response head").unwrap();
                    let mut payload_decoder = head.payload_decoder(false).expect("input should have valid framing");
                    let mut received = 0;
                    while let Some(item) = payload_decoder.decode_eof(bytes_mut).expect("input should have a valid body") {
                        match item {
                            PayloadItem::Chunk(bytes) => received += bytes.len(),
                            PayloadItem::Eof => break,
                        }
                    }
                    black_box((head, received));
                },
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

fn benchmark_response_builder(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("response_builder");

    for fixture in &RESPONSES {
        let (head, body) = fixture.content().split_once("\r\n\r\n").expect("fixture should contain a head");
        group.throughput(Throughput::Bytes(fixture.len()));
        group.bench_with_input(BenchmarkId::from_parameter(fixture.name()), &(head, body), |b, (head, body)| {
            b.iter(|| {
                let mut builder = ResponseBuilder::new().unwrap();
                for line in head.split("\r\n") {
                    builder.header_line(line).expect("fixture lines should be valid");
                }
                builder.write_body(body.as_bytes()).unwrap();
                black_box(builder.into_response().unwrap())
            });
        });
    }

    group.finish();
}

criterion_group!(decoder, benchmark_response_decoder, benchmark_response_builder);
criterion_main!(decoder);
