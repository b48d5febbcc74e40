#![no_main]

use auth_service::crypto::verify_token;
use common::jwt::{check_token_shape, decode_payload_unverified};
use common::secret::SecretString;
use libfuzzer_sys::fuzz_target;
use std::time::Duration;

fuzz_target!(|data: &[u8]| {
    let Ok(token) = std::str::from_utf8(data) else {
        return;
    };

    // Shape check must never panic, whatever the input
    let shape_ok = check_token_shape(token).is_ok();

    // Unverified decode is used for diagnostics and must tolerate garbage
    let _ = decode_payload_unverified::<serde_json::Value>(token);

    // Full HS256 verification against a fixed secret
    let secret = SecretString::from("fuzz-secret-0123456789abcdef".to_string());
    let verified = verify_token(token, &secret, Duration::from_secs(300));

    // Anything that fails the shape check is rejected before HMAC work
    if !shape_ok {
        assert!(verified.is_err());
    }
});
