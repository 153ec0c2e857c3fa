//! Behaviour of sealed values as seen by a caller of the public API.

use base64::{Engine, engine::general_purpose::STANDARD};
use credseal::secretcrypt::{self, MIN_SEALED_LEN, NONCE_LEN, SALT_LEN};
use credseal::{ErrorKind, Sealer, looks_encrypted};
use proptest::prelude::*;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct KnownAnswer {
    secret: String,
    plaintext: String,
    salt: String,
    nonce: String,
    blob: String,
    comment: String,
}

fn load_known_answers() -> Vec<KnownAnswer> {
    let json_data = include_str!("../testdata/known-answers.json");
    serde_json::from_str(json_data).expect("failed to parse known answers")
}

#[test]
fn test_end_to_end_scenario() {
    let blob = Sealer::new("s3cr3t").encrypt("imap-pass-123").unwrap();

    assert_eq!(Sealer::new("s3cr3t").decrypt(&blob).unwrap(), "imap-pass-123");

    let err = Sealer::new("wrong").decrypt(&blob).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Decryption);
}

#[test]
fn test_roundtrip_edge_cases() {
    let sealer = Sealer::new("s3cr3t");
    for plaintext in ["", "a", "pässwörd", "🔐🔑", "日本語のパスワード", "line\nbreak\ttab"] {
        let blob = sealer.encrypt(plaintext).unwrap();
        assert_eq!(sealer.decrypt(&blob).unwrap(), plaintext);
    }
}

#[test]
fn test_encryption_is_not_deterministic() {
    let sealer = Sealer::new("s3cr3t");
    let b1 = sealer.encrypt("hunter2").unwrap();
    let b2 = sealer.encrypt("hunter2").unwrap();
    assert_ne!(b1, b2);
}

#[test]
fn test_blob_layout() {
    let blob = Sealer::new("s3cr3t").encrypt("hunter2").unwrap();
    let bytes = STANDARD.decode(&blob).unwrap();
    assert_eq!(bytes.len(), MIN_SEALED_LEN + "hunter2".len());
    assert!(!blob.chars().any(char::is_whitespace));
}

#[test]
fn test_tamper_detection_every_region() {
    let sealer = Sealer::new("s3cr3t");
    let blob = sealer.encrypt("imap-pass-123").unwrap();
    let bytes = STANDARD.decode(&blob).unwrap();

    let regions = [
        ("salt", 0, SALT_LEN),
        ("nonce", SALT_LEN, SALT_LEN + NONCE_LEN),
        ("tag", SALT_LEN + NONCE_LEN, MIN_SEALED_LEN),
        ("ciphertext", MIN_SEALED_LEN, bytes.len()),
    ];
    for (name, start, end) in regions {
        for pos in [start, (start + end) / 2, end - 1] {
            let mut tampered = bytes.clone();
            tampered[pos] ^= 0x80;
            let err = sealer.decrypt(&STANDARD.encode(&tampered)).unwrap_err();
            assert_eq!(err.kind, ErrorKind::Decryption, "{} byte {}", name, pos);
        }
    }
}

#[test]
fn test_decryption_errors_are_indistinguishable() {
    let sealer = Sealer::new("s3cr3t");
    let blob = sealer.encrypt("imap-pass-123").unwrap();

    let mut tampered = STANDARD.decode(&blob).unwrap();
    tampered[MIN_SEALED_LEN] ^= 0x01;

    let errors = [
        sealer.decrypt("not base64 at all!").unwrap_err(),
        sealer.decrypt(&STANDARD.encode([0u8; 10])).unwrap_err(),
        sealer.decrypt(&STANDARD.encode(&tampered)).unwrap_err(),
        Sealer::new("wrong").decrypt(&blob).unwrap_err(),
    ];
    for err in &errors {
        assert_eq!(err.kind, ErrorKind::Decryption);
        assert_eq!(err.to_string(), errors[0].to_string());
        assert!(err.source_error().is_none());
    }
}

#[test]
fn test_minimum_length_rejection() {
    let sealer = Sealer::new("s3cr3t");
    for len in [0, 1, 64, 80, MIN_SEALED_LEN - 1] {
        let err = sealer.decrypt(&STANDARD.encode(vec![0u8; len])).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Decryption, "length {}", len);
    }
}

#[test]
fn test_classifier_sanity() {
    let blob = Sealer::new("s3cr3t").encrypt("hunter2").unwrap();
    assert!(looks_encrypted(&blob));
    assert!(!looks_encrypted("hunter2"));
    assert!(!looks_encrypted(""));
}

#[test]
fn test_concurrent_use() {
    let sealer = Sealer::new("s3cr3t");
    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let sealer = &sealer;
                scope.spawn(move || {
                    let plaintext = format!("password-{}", i);
                    let blob = sealer.encrypt(&plaintext).unwrap();
                    assert_eq!(sealer.decrypt(&blob).unwrap(), plaintext);
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
    });
}

#[test]
fn test_known_answers() {
    let vectors = load_known_answers();
    assert!(!vectors.is_empty(), "no known answers were loaded");

    for (i, vector) in vectors.iter().enumerate() {
        let secret = STANDARD.decode(&vector.secret).unwrap();
        let salt: [u8; SALT_LEN] = STANDARD.decode(&vector.salt).unwrap().try_into().unwrap();
        let nonce: [u8; NONCE_LEN] = STANDARD.decode(&vector.nonce).unwrap().try_into().unwrap();

        let sealed =
            secretcrypt::seal_deterministic(&secret, vector.plaintext.as_bytes(), &salt, &nonce)
                .unwrap();
        assert_eq!(
            STANDARD.encode(&sealed),
            vector.blob,
            "vector {} ({}): blob mismatch",
            i,
            vector.comment
        );

        let opened = Sealer::new(secret).decrypt(&vector.blob).unwrap();
        assert_eq!(opened, vector.plaintext, "vector {} ({})", i, vector.comment);
        assert!(looks_encrypted(&vector.blob));
    }
}

proptest! {
    // Each case runs two 100k-round key derivations.
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_roundtrip(plaintext in any::<String>()) {
        let sealer = Sealer::new("s3cr3t");
        let blob = sealer.encrypt(&plaintext).unwrap();
        prop_assert!(looks_encrypted(&blob));
        prop_assert_eq!(sealer.decrypt(&blob).unwrap(), plaintext);
    }
}
