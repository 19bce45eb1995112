use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use radius_proto::auth::{
    decrypt_user_password, encrypt_user_password, generate_request_authenticator,
};
use radius_proto::{Attribute, AttributeType, Code, Packet};

const SECRET: &[u8] = b"testing123";

/// Access-Request padded with `extra` opaque attributes
fn access_request(extra: usize) -> Packet {
    let req_auth = generate_request_authenticator();
    let mut packet = Packet::new(Code::AccessRequest, 1, req_auth);

    packet.add_attribute(
        Attribute::string(AttributeType::UserName as u8, "testuser")
            .expect("Failed to create User-Name attribute"),
    );
    packet.add_attribute(
        Attribute::new(
            AttributeType::UserPassword as u8,
            encrypt_user_password("testpassword", SECRET, &req_auth),
        )
        .expect("Failed to create User-Password attribute"),
    );

    for i in 0..extra {
        packet.add_attribute(
            Attribute::string(AttributeType::CallingStationId as u8, format!("00-11-22-33-44-{:02x}", i))
                .expect("Failed to create Calling-Station-Id attribute"),
        );
    }

    packet
}

fn bench_request_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("request_decode");

    for extra in [0usize, 5, 20] {
        let encoded = access_request(extra).encode().expect("Failed to encode");
        group.bench_with_input(BenchmarkId::from_parameter(extra), &encoded, |b, encoded| {
            b.iter(|| Packet::decode(black_box(encoded)).expect("Failed to decode packet"));
        });
    }

    group.finish();
}

fn bench_response_encode(c: &mut Criterion) {
    let req_auth = generate_request_authenticator();
    let proxy_state = vec![
        Attribute::new(AttributeType::ProxyState as u8, vec![0xab; 8])
            .expect("Failed to create Proxy-State"),
    ];

    c.bench_function("response_encode_signed", |b| {
        b.iter(|| {
            Packet::encode_response(
                Code::AccessAccept,
                black_box(7),
                black_box(&req_auth),
                black_box(&proxy_state),
                SECRET,
            )
            .expect("Failed to encode response")
        });
    });
}

fn bench_password_decryption(c: &mut Criterion) {
    let mut group = c.benchmark_group("password_decryption");

    for (name, password) in [
        ("short", "test"),
        ("medium", "testpassword123"),
        ("long", "this_is_a_very_long_password_to_test_performance"),
    ] {
        let req_auth = generate_request_authenticator();
        let encrypted = encrypt_user_password(password, SECRET, &req_auth);
        group.bench_with_input(BenchmarkId::from_parameter(name), &encrypted, |b, encrypted| {
            b.iter(|| {
                decrypt_user_password(black_box(encrypted), SECRET, black_box(&req_auth))
                    .expect("Failed to decrypt password")
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_request_decode,
    bench_response_encode,
    bench_password_decryption
);
criterion_main!(benches);
