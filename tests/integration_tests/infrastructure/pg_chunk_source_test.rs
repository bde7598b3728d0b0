use chunk_analyst::application::ports::ChunkSource;
use chunk_analyst::domain::DocumentId;

use crate::helpers::TestPostgres;

#[tokio::test]
#[ignore = "requires Docker"]
async fn given_stored_chunks_when_listing_then_ordered_by_index() {
    let test_pg = TestPostgres::new().await;
    let document_id = DocumentId::new();
    test_pg
        .insert_chunks(document_id, &["first", "second", "third"])
        .await;
    test_pg
        .insert_chunks(DocumentId::new(), &["other document"])
        .await;

    let chunks = test_pg
        .chunk_source
        .list_chunks(document_id)
        .await
        .expect("Failed to list chunks");

    let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(texts, vec!["first", "second", "third"]);
    assert_eq!(chunks[2].index, 2);
    assert!(chunks.iter().all(|c| c.document_id == document_id));
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn given_unknown_document_when_listing_then_empty() {
    let test_pg = TestPostgres::new().await;

    let chunks = test_pg
        .chunk_source
        .list_chunks(DocumentId::new())
        .await
        .expect("Failed to list chunks");

    assert!(chunks.is_empty());
}
