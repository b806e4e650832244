use super::*;

fn key(pairs: &[(&str, KeyAttribute)]) -> LastKey {
    pairs
        .iter()
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect()
}

fn id_key(id: &str) -> LastKey {
    key(&[("id", KeyAttribute::S(id.to_string()))])
}

#[derive(Debug, Clone, PartialEq)]
struct Row {
    id: i64,
}

// ============================================================================
// Codec
// ============================================================================

#[test]
fn test_encode_is_unpadded_base64url_of_dynamo_json() {
    let token = encode(&id_key("2")).unwrap();
    assert_eq!(token.as_str(), "eyJpZCI6eyJTIjoiMiJ9fQ");
}

#[test]
fn test_round_trip_composite_key() {
    let k = key(&[
        ("PK", KeyAttribute::S("P#42".to_string())),
        ("SK", KeyAttribute::S("POST#42#0202".to_string())),
        ("views", KeyAttribute::N("17".to_string())),
        ("raw", KeyAttribute::B(vec![0, 255, 7, 62, 63])),
        ("flag", KeyAttribute::Bool(true)),
        ("gone", KeyAttribute::Null(true)),
    ]);

    let token = encode(&k).unwrap();
    assert_eq!(decode(token.as_str()).unwrap(), k);
}

#[test]
fn test_round_trip_empty_key() {
    let k = LastKey::new();
    let token = encode(&k).unwrap();
    assert_eq!(decode(token.as_str()).unwrap(), k);
}

#[test]
fn test_round_trip_unicode_values() {
    let k = id_key("publicação/ção?&=");
    let token = encode(&k).unwrap();
    assert!(!token.as_str().contains(['+', '/', '=']));
    assert_eq!(decode(token.as_str()).unwrap(), k);
}

#[test]
fn test_decode_accepts_padded_token() {
    assert_eq!(decode("eyJpZCI6eyJTIjoiMiJ9fQ==").unwrap(), id_key("2"));
}

#[test]
fn test_decode_rejects_bad_base64() {
    let result = decode("not a token!");
    assert!(matches!(result, Err(PaginationError::InvalidToken(_))));
}

#[test]
fn test_decode_rejects_non_json_payload() {
    // base64url("hello")
    let result = decode("aGVsbG8");
    assert!(matches!(result, Err(PaginationError::InvalidToken(_))));
}

#[test]
fn test_decode_rejects_untyped_json() {
    // base64url({"id":"2"}): a plain string is not a typed attribute
    let result = decode("eyJpZCI6IjIifQ");
    assert!(matches!(result, Err(PaginationError::InvalidToken(_))));
}

#[test]
fn test_decode_rejects_json_array() {
    // base64url([1,2])
    let result = decode("WzEsMl0");
    assert!(matches!(result, Err(PaginationError::InvalidToken(_))));
}

#[test]
fn test_decode_rejects_empty_string() {
    assert!(matches!(decode(""), Err(PaginationError::InvalidToken(_))));
}

// ============================================================================
// Envelope mapping
// ============================================================================

#[test]
fn test_map_result_with_continuation() {
    let raw = RawQueryOutput {
        items: Some(vec![Row { id: 1 }, Row { id: 2 }]),
        last_evaluated_key: Some(id_key("2")),
        count: Some(2),
        scanned_count: None,
        consumed_capacity: None,
    };

    let envelope = map_paginated_result(raw, |row| row.id).unwrap();

    assert_eq!(envelope.items, vec![1, 2]);
    assert_eq!(envelope.next_token, Some(encode(&id_key("2")).unwrap()));
    assert_eq!(
        envelope.metadata,
        PageMetadata {
            count: 2,
            scanned_count: None,
            capacity_units: None,
        }
    );
}

#[test]
fn test_map_result_without_last_key_has_no_token() {
    let raw = RawQueryOutput::from_items(vec![Row { id: 9 }]);
    let envelope = map_paginated_result(raw, |row| row.id).unwrap();
    assert!(envelope.next_token.is_none());
    assert_eq!(envelope.metadata.count, 1);
}

#[test]
fn test_map_result_absent_items_is_empty() {
    let raw: RawQueryOutput<Row> = RawQueryOutput::default();
    let envelope = map_paginated_result(raw, |row| row.id).unwrap();
    assert!(envelope.items.is_empty());
    assert_eq!(envelope.metadata.count, 0);
    assert!(envelope.next_token.is_none());
}

#[test]
fn test_map_result_preserves_backend_order() {
    let raw = RawQueryOutput::from_items(vec![Row { id: 3 }, Row { id: 1 }, Row { id: 2 }]);
    let envelope = map_paginated_result(raw, |row| row.id).unwrap();
    assert_eq!(envelope.items, vec![3, 1, 2]);
}

#[test]
fn test_map_result_copies_scan_metadata() {
    let raw = RawQueryOutput {
        items: Some(vec![Row { id: 1 }]),
        last_evaluated_key: None,
        count: Some(1),
        scanned_count: Some(25),
        consumed_capacity: Some(0.5),
    };
    let envelope = map_paginated_result(raw, |row| row.id).unwrap();
    assert_eq!(envelope.metadata.scanned_count, Some(25));
    assert_eq!(envelope.metadata.capacity_units, Some(0.5));
}

#[derive(Debug, thiserror::Error)]
enum MapError {
    #[error("odd row {0}")]
    Odd(i64),
    #[error(transparent)]
    Pagination(#[from] PaginationError),
}

#[test]
fn test_try_map_propagates_mapper_error() {
    let raw = RawQueryOutput::from_items(vec![Row { id: 2 }, Row { id: 3 }, Row { id: 4 }]);
    let result = try_map_paginated_result(raw, |row| {
        if row.id % 2 == 1 {
            Err(MapError::Odd(row.id))
        } else {
            Ok(row.id)
        }
    });
    assert!(matches!(result, Err(MapError::Odd(3))));
}

#[test]
fn test_envelope_wire_shape() {
    let raw = RawQueryOutput::from_items(vec![Row { id: 1 }]).with_last_key(id_key("1"));
    let envelope = map_paginated_result(raw, |row| row.id).unwrap();
    let json = serde_json::to_value(&envelope).unwrap();

    assert_eq!(json["items"], serde_json::json!([1]));
    assert_eq!(json["nextToken"], "eyJpZCI6eyJTIjoiMSJ9fQ");
    assert_eq!(json["metadata"], serde_json::json!({ "count": 1 }));

    let last = map_paginated_result(RawQueryOutput::from_items(vec![Row { id: 1 }]), |r| r.id)
        .unwrap();
    let json = serde_json::to_value(&last).unwrap();
    assert!(json["nextToken"].is_null());
}

// ============================================================================
// Page requests
// ============================================================================

#[test]
fn test_page_request_limit_defaults_and_caps() {
    assert_eq!(PageRequest::new(None, None).limit, DEFAULT_PAGE_LIMIT);
    assert_eq!(PageRequest::new(Some(0), None).limit, DEFAULT_PAGE_LIMIT);
    assert_eq!(PageRequest::new(Some(5), None).limit, 5);
    assert_eq!(PageRequest::new(Some(500), None).limit, MAX_PAGE_LIMIT);
}

#[test]
fn test_page_request_blank_token_is_first_page() {
    let request = PageRequest::new(Some(10), Some("  ".to_string()));
    assert!(request.next_token.is_none());
    assert_eq!(request.start_key().unwrap(), None);
    assert_eq!(request.cache_fragment(), "10:start");
}

#[test]
fn test_page_request_decodes_start_key() {
    let token = encode(&id_key("7")).unwrap().into_inner();
    let request = PageRequest::new(Some(10), Some(token.clone()));
    assert_eq!(request.start_key().unwrap(), Some(id_key("7")));
    assert_eq!(request.cache_fragment(), format!("10:{}", token));
}

#[test]
fn test_page_request_rejects_malformed_token() {
    let request = PageRequest::new(None, Some("%%%".to_string()));
    assert!(matches!(
        request.start_key(),
        Err(PaginationError::InvalidToken(_))
    ));
}
