use std::sync::Arc;

use chrono::Utc;
use chunk_analyst::application::ports::{JobRepository, RepositoryError};
use chunk_analyst::application::services::ProgressRecorder;
use chunk_analyst::domain::{AnalysisResult, Job, JobId};
use rust_decimal::Decimal;

use crate::helpers::{TestHarness, create_request};

fn result_for(job_id: JobId, chunk_index: u32, cost_usd: Decimal) -> AnalysisResult {
    AnalysisResult {
        job_id,
        chunk_index,
        chunk_text: format!("chunk {chunk_index}"),
        llm_response: "ok".to_string(),
        tokens_used: 30,
        input_tokens: 10,
        output_tokens: 20,
        cost_usd,
        processing_time_ms: 5,
        created_at: Utc::now(),
    }
}

async fn created_job(harness: &TestHarness, chunks: usize) -> Job {
    let document_id = harness.document((0..chunks).map(|i| format!("text {i}")));
    harness
        .service
        .create_job(create_request(document_id, 5, false))
        .await
        .unwrap()
}

#[tokio::test]
async fn given_recorded_results_when_reading_ledger_then_counters_match_snapshot() {
    let harness = TestHarness::new();
    let job = created_job(&harness, 3).await;
    let recorder = ProgressRecorder::new(job.id, harness.repository.clone(), job.progress);

    recorder
        .record(&result_for(job.id, 0, Decimal::new(15, 4)))
        .await
        .unwrap();
    let progress = recorder
        .record(&result_for(job.id, 1, Decimal::new(25, 4)))
        .await
        .unwrap();

    assert_eq!(progress.processed_chunks, 2);
    assert_eq!(progress.total_tokens_used, 60);
    assert_eq!(progress.total_cost_usd, Decimal::new(40, 4));
    assert_eq!(recorder.snapshot().await, progress);

    let stored = harness.repository.get_by_id(job.id).await.unwrap().unwrap();
    assert_eq!(stored.progress, progress);
}

#[tokio::test]
async fn given_failed_write_when_recording_then_snapshot_is_unchanged() {
    let harness = TestHarness::new();
    let job = created_job(&harness, 3).await;
    let recorder = ProgressRecorder::new(job.id, harness.repository.clone(), job.progress);

    recorder
        .record(&result_for(job.id, 0, Decimal::new(1, 3)))
        .await
        .unwrap();
    let before = recorder.snapshot().await;

    let err = recorder
        .record(&result_for(job.id, 0, Decimal::new(1, 3)))
        .await
        .unwrap_err();

    assert!(matches!(err, RepositoryError::ConstraintViolation(_)));
    assert_eq!(recorder.snapshot().await, before);
}

#[tokio::test]
async fn given_concurrent_records_when_all_finish_then_no_update_is_lost() {
    let harness = TestHarness::new();
    let job = created_job(&harness, 20).await;
    let recorder = Arc::new(ProgressRecorder::new(
        job.id,
        harness.repository.clone(),
        job.progress,
    ));

    let tasks: Vec<_> = (0..20)
        .map(|i| {
            let recorder = recorder.clone();
            tokio::spawn(async move {
                recorder
                    .record(&result_for(job.id, i, Decimal::new(1, 4)))
                    .await
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let stored = harness.repository.get_by_id(job.id).await.unwrap().unwrap();
    assert_eq!(stored.progress.processed_chunks, 20);
    assert_eq!(stored.progress.total_tokens_used, 600);
    assert_eq!(stored.progress.total_cost_usd, Decimal::new(20, 4));
}
