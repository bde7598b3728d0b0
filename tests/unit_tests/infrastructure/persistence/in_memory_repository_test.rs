use chrono::Utc;
use chunk_analyst::application::ports::{ChunkSource, JobFilter, JobRepository, RepositoryError};
use chunk_analyst::domain::{
    AnalysisResult, DocumentId, Job, JobCommand, JobConfig, JobId, JobProgress, JobStatus,
    LlmProvider, PromptTemplate,
};
use chunk_analyst::infrastructure::persistence::{InMemoryChunkSource, InMemoryJobRepository};
use rust_decimal::Decimal;

fn processing_job(document_id: DocumentId, total_chunks: u32) -> Job {
    let mut job = Job::new(
        JobConfig {
            document_id,
            provider: LlmProvider::Anthropic,
            model: "claude-3-haiku".to_string(),
            llm_config_id: Some("cfg-1".to_string()),
            base_url: None,
            prompt_template: PromptTemplate::parse("Classify: {chunk_text}").unwrap(),
            chunk_batch_size: 4,
            pause_after_batch: false,
            max_tokens: 200,
            temperature: 0.3,
        },
        total_chunks,
    );
    job.apply(JobCommand::Start).unwrap();
    job
}

fn result(job_id: JobId, chunk_index: u32) -> AnalysisResult {
    AnalysisResult {
        job_id,
        chunk_index,
        chunk_text: "text".to_string(),
        llm_response: "label".to_string(),
        tokens_used: 10,
        input_tokens: 8,
        output_tokens: 2,
        cost_usd: Decimal::new(123456, 8),
        processing_time_ms: 3,
        created_at: Utc::now(),
    }
}

fn progress(total: u32, processed: u32, cost: Decimal) -> JobProgress {
    JobProgress {
        total_chunks: total,
        processed_chunks: processed,
        total_tokens_used: u64::from(processed) * 10,
        total_cost_usd: cost,
    }
}

#[tokio::test]
async fn given_created_job_when_loading_then_same_job_is_returned() {
    let repository = InMemoryJobRepository::new();
    let job = processing_job(DocumentId::new(), 3);

    repository.create(&job).await.unwrap();
    let loaded = repository.get_by_id(job.id).await.unwrap().unwrap();

    assert_eq!(loaded.id, job.id);
    assert_eq!(loaded.status, JobStatus::Processing);
    assert_eq!(loaded.config, job.config);
}

#[tokio::test]
async fn given_existing_id_when_creating_again_then_constraint_violation() {
    let repository = InMemoryJobRepository::new();
    let job = processing_job(DocumentId::new(), 3);
    repository.create(&job).await.unwrap();

    let err = repository.create(&job).await.unwrap_err();

    assert!(matches!(err, RepositoryError::ConstraintViolation(_)));
}

#[tokio::test]
async fn given_stale_expected_status_when_updating_lifecycle_then_nothing_changes() {
    let repository = InMemoryJobRepository::new();
    let mut job = processing_job(DocumentId::new(), 3);
    repository.create(&job).await.unwrap();

    job.apply(JobCommand::Pause).unwrap();
    assert!(
        repository
            .update_lifecycle(&job, JobStatus::Processing)
            .await
            .unwrap()
    );

    let mut stale = job.clone();
    stale.status = JobStatus::Completed;
    assert!(
        !repository
            .update_lifecycle(&stale, JobStatus::Processing)
            .await
            .unwrap()
    );

    let loaded = repository.get_by_id(job.id).await.unwrap().unwrap();
    assert_eq!(loaded.status, JobStatus::Paused);
    assert!(loaded.paused_at.is_some());
}

#[tokio::test]
async fn given_lifecycle_update_when_applied_then_counters_are_not_overwritten() {
    let repository = InMemoryJobRepository::new();
    let mut job = processing_job(DocumentId::new(), 3);
    repository.create(&job).await.unwrap();
    repository
        .append_result(&result(job.id, 0), &progress(3, 1, Decimal::new(5, 3)))
        .await
        .unwrap();

    job.apply(JobCommand::Cancel).unwrap();
    repository
        .update_lifecycle(&job, JobStatus::Processing)
        .await
        .unwrap();

    let loaded = repository.get_by_id(job.id).await.unwrap().unwrap();
    assert_eq!(loaded.status, JobStatus::Cancelled);
    assert_eq!(loaded.progress.processed_chunks, 1);
}

#[tokio::test]
async fn given_appended_result_when_reading_then_counters_and_cost_are_stored_at_four_decimals() {
    let repository = InMemoryJobRepository::new();
    let job = processing_job(DocumentId::new(), 3);
    repository.create(&job).await.unwrap();

    repository
        .append_result(&result(job.id, 0), &progress(3, 1, Decimal::new(123456, 8)))
        .await
        .unwrap();

    let loaded = repository.get_by_id(job.id).await.unwrap().unwrap();
    assert_eq!(loaded.progress.processed_chunks, 1);
    assert_eq!(loaded.progress.total_tokens_used, 10);
    assert_eq!(loaded.progress.total_cost_usd, Decimal::new(12, 4));
    assert_eq!(repository.processed_indices(job.id).await.unwrap(), vec![0]);
}

#[tokio::test]
async fn given_duplicate_chunk_result_when_appending_then_rejected_and_counters_kept() {
    let repository = InMemoryJobRepository::new();
    let job = processing_job(DocumentId::new(), 3);
    repository.create(&job).await.unwrap();
    repository
        .append_result(&result(job.id, 1), &progress(3, 1, Decimal::ZERO))
        .await
        .unwrap();

    let err = repository
        .append_result(&result(job.id, 1), &progress(3, 2, Decimal::ZERO))
        .await
        .unwrap_err();

    assert!(matches!(err, RepositoryError::ConstraintViolation(_)));
    let loaded = repository.get_by_id(job.id).await.unwrap().unwrap();
    assert_eq!(loaded.progress.processed_chunks, 1);
}

#[tokio::test]
async fn given_unknown_job_when_appending_then_not_found() {
    let repository = InMemoryJobRepository::new();

    let err = repository
        .append_result(&result(JobId::new(), 0), &progress(1, 1, Decimal::ZERO))
        .await
        .unwrap_err();

    assert!(matches!(err, RepositoryError::NotFound(_)));
}

#[tokio::test]
async fn given_results_out_of_order_when_listing_then_sorted_by_chunk_index() {
    let repository = InMemoryJobRepository::new();
    let job = processing_job(DocumentId::new(), 4);
    repository.create(&job).await.unwrap();
    for (n, index) in [3, 0, 2, 1].into_iter().enumerate() {
        repository
            .append_result(
                &result(job.id, index),
                &progress(4, n as u32 + 1, Decimal::ZERO),
            )
            .await
            .unwrap();
    }

    let page = repository.list_results(job.id, 1, 2).await.unwrap();

    assert_eq!(page.total, 4);
    let indices: Vec<u32> = page.items.iter().map(|r| r.chunk_index).collect();
    assert_eq!(indices, vec![1, 2]);
    assert_eq!(
        repository.processed_indices(job.id).await.unwrap(),
        vec![0, 1, 2, 3]
    );
}

#[tokio::test]
async fn given_jobs_when_listing_with_filters_then_newest_first() {
    let repository = InMemoryJobRepository::new();
    let document_id = DocumentId::new();

    let mut older = processing_job(document_id, 1);
    older.created_at = Utc::now() - chrono::Duration::minutes(5);
    let newer = processing_job(document_id, 1);
    let elsewhere = processing_job(DocumentId::new(), 1);
    for job in [&older, &newer, &elsewhere] {
        repository.create(job).await.unwrap();
    }

    let page = repository
        .list(
            &JobFilter {
                status: Some(JobStatus::Processing),
                document_id: Some(document_id),
            },
            0,
            10,
        )
        .await
        .unwrap();

    assert_eq!(page.total, 2);
    assert_eq!(page.items[0].id, newer.id);
    assert_eq!(page.items[1].id, older.id);

    let none_paused = repository
        .list(
            &JobFilter {
                status: Some(JobStatus::Paused),
                document_id: None,
            },
            0,
            10,
        )
        .await
        .unwrap();
    assert_eq!(none_paused.total, 0);
}

#[tokio::test]
async fn given_job_with_results_when_deleting_then_results_go_too() {
    let repository = InMemoryJobRepository::new();
    let job = processing_job(DocumentId::new(), 2);
    repository.create(&job).await.unwrap();
    repository
        .append_result(&result(job.id, 0), &progress(2, 1, Decimal::ZERO))
        .await
        .unwrap();

    assert!(repository.delete(job.id).await.unwrap());
    assert!(!repository.delete(job.id).await.unwrap());
    assert!(repository.get_by_id(job.id).await.unwrap().is_none());
    assert!(repository.processed_indices(job.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn given_inserted_document_when_listing_chunks_then_indexed_from_zero() {
    let source = InMemoryChunkSource::new();
    let document_id = DocumentId::new();
    source
        .insert_document(document_id, ["first", "second"])
        .unwrap();

    let chunks = source.list_chunks(document_id).await.unwrap();

    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[1].index, 1);
    assert_eq!(chunks[1].text, "second");
    assert!(source.list_chunks(DocumentId::new()).await.unwrap().is_empty());
}
