//! Row → record assembly and reference-list decoding.

use registry_storage::{
    deserialize_references, serialize_references, ArtifactReference, ContentHandle, ContentId,
    GlobalId, StorageError, StoredArtifact, StoredArtifactRow,
};

fn customer_ref() -> ArtifactReference {
    ArtifactReference::new(Some("com.example"), "customer", Some("1"), "customer.json")
}

fn address_ref() -> ArtifactReference {
    ArtifactReference::new(None, "address", None, "address.json")
}

#[test]
fn null_and_empty_reference_columns_decode_empty() {
    assert!(deserialize_references(None).unwrap().is_empty());
    assert!(deserialize_references(Some("")).unwrap().is_empty());
}

#[test]
fn two_references_decode_in_order() {
    let refs = vec![customer_ref(), address_ref()];
    let encoded = serialize_references(&refs).unwrap();

    let decoded = deserialize_references(encoded.as_deref()).unwrap();
    assert_eq!(decoded.len(), 2);
    assert_eq!(decoded, refs);
}

#[test]
fn row_fields_carry_through_to_record() {
    let encoded = serialize_references(&[customer_ref()]).unwrap();
    let row = StoredArtifactRow {
        content: b"{}".to_vec(),
        content_id: 3,
        global_id: 5,
        version: "1.0".to_string(),
        version_order: 0,
        artifact_references: encoded,
    };

    let record = StoredArtifact::try_from(row).unwrap();
    assert_eq!(
        record,
        StoredArtifact {
            content: ContentHandle::from("{}"),
            content_id: ContentId(3),
            global_id: GlobalId(5),
            version: "1.0".to_string(),
            version_order: 0,
            references: vec![customer_ref()],
        }
    );
}

#[test]
fn row_with_malformed_references_fails_to_assemble() {
    let row = StoredArtifactRow {
        content: b"{}".to_vec(),
        content_id: 1,
        global_id: 1,
        version: "1".to_string(),
        version_order: 1,
        artifact_references: Some("[{\"artifactId\":\"a\",\"name\":".to_string()),
    };

    let err = row.into_stored_artifact().unwrap_err();
    assert!(matches!(err, StorageError::MalformedData { .. }));
}

#[test]
fn one_bad_entry_fails_the_whole_list() {
    let encoded = r#"[
        {"groupId":"g","artifactId":"a","version":"1","name":"a.json"},
        {"groupId":"g","version":"1","name":"b.json"}
    ]"#;
    let err = deserialize_references(Some(encoded)).unwrap_err();
    assert!(matches!(err, StorageError::MalformedData { .. }));
}
