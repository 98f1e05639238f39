// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn resolve_known_handle_returns_bytes() {
    let source = FakeSecretSource::new();
    source.put("vault://t1/api-key", b"super-secret".to_vec());

    let resolved = source.resolve("vault://t1/api-key").await.unwrap();
    assert_eq!(resolved.expose(), b"super-secret");
}

#[tokio::test]
async fn resolve_unknown_handle_is_not_found() {
    let source = FakeSecretSource::new();
    let result = source.resolve("vault://missing").await;
    assert!(matches!(result, Err(SecretSourceError::NotFound)));
}

#[tokio::test]
async fn resolved_handles_are_recorded_without_values() {
    let source = FakeSecretSource::new();
    source.put("vault://t1/api-key", b"super-secret".to_vec());
    source.resolve("vault://t1/api-key").await.unwrap();

    assert_eq!(source.resolved_handles(), vec!["vault://t1/api-key".to_string()]);
}
