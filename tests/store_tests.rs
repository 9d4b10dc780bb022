//! Store contract battery, run identically against the in-memory and
//! SQLite implementations.

mod common;

use chrono::{Duration, Utc};
use common::job_record;
use settlement_engine::{
    JobStatus, JobStore, MemoryStore, SqliteStore, SubmissionRecord, VerdictKind,
};
use std::sync::Arc;
use uuid::Uuid;

fn submission(job_id: u64, verdict: VerdictKind, age_secs: i64) -> SubmissionRecord {
    SubmissionRecord {
        id: Uuid::new_v4(),
        chain_job_id: job_id,
        freelancer_name: "Dana".to_string(),
        notes: "notes".to_string(),
        files: vec!["code.py".to_string()],
        payload_digest: "deadbeef".to_string(),
        verdict,
        reason: "because".to_string(),
        tx_hash: None,
        created_at: Utc::now() - Duration::seconds(age_secs),
    }
}

async fn battery(store: Arc<dyn JobStore>) {
    // Insert-if-absent on the job id.
    assert!(store.insert_job(job_record(1, "first")).await.unwrap());
    assert!(!store.insert_job(job_record(1, "duplicate")).await.unwrap());
    assert!(store.insert_job(job_record(2, "second")).await.unwrap());

    let job = store.get_job(1).await.unwrap().unwrap();
    assert_eq!(job.description, "first");
    assert!(store.get_job(99).await.unwrap().is_none());

    // Newest first by job id, with limit.
    let jobs = store.list_jobs(50).await.unwrap();
    assert_eq!(
        jobs.iter().map(|j| j.chain_job_id).collect::<Vec<_>>(),
        vec![2, 1]
    );
    assert_eq!(store.list_jobs(1).await.unwrap().len(), 1);

    // Add-to-set applicants.
    assert!(store.add_applicant(1, "alex").await.unwrap());
    assert!(store.add_applicant(1, "alex").await.unwrap());
    assert!(store.add_applicant(1, "sam").await.unwrap());
    assert!(!store.add_applicant(99, "ghost").await.unwrap());
    let job = store.get_job(1).await.unwrap().unwrap();
    assert_eq!(job.applicants, vec!["alex".to_string(), "sam".to_string()]);

    // Assignment sets status and identity.
    assert!(store
        .assign_freelancer(1, "sam", Some("0xabc"))
        .await
        .unwrap());
    let job = store.get_job(1).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Assigned);
    assert_eq!(job.freelancer_name.as_deref(), Some("sam"));
    assert_eq!(job.freelancer_address.as_deref(), Some("0xabc"));

    // PAID compare-and-set: first wins, second is refused, and the
    // terminal state refuses assignment too.
    assert!(store.mark_paid(1, "0xtx1").await.unwrap());
    assert!(!store.mark_paid(1, "0xtx2").await.unwrap());
    assert!(!store.assign_freelancer(1, "late", None).await.unwrap());
    let job = store.get_job(1).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Paid);
    assert_eq!(job.settlement_tx.as_deref(), Some("0xtx1"));

    // Append-only submissions, newest first, filtered and limited.
    store
        .append_submission(submission(1, VerdictKind::Fail, 30))
        .await
        .unwrap();
    store
        .append_submission(submission(1, VerdictKind::Pass, 10))
        .await
        .unwrap();
    store
        .append_submission(submission(2, VerdictKind::Pass, 40))
        .await
        .unwrap();
    store
        .append_submission(submission(2, VerdictKind::Fail, 20))
        .await
        .unwrap();

    let all = store.list_submissions(100).await.unwrap();
    assert_eq!(all.len(), 4);
    for pair in all.windows(2) {
        assert!(pair[0].created_at >= pair[1].created_at);
    }

    let for_one = store.submissions_for_job(1, 100).await.unwrap();
    assert_eq!(for_one.len(), 2);
    assert_eq!(for_one[0].verdict, VerdictKind::Pass);
    assert_eq!(store.submissions_for_job(1, 1).await.unwrap().len(), 1);

    // The standing PASS is found even when failures are more recent,
    // and regardless of how the recency pagination is bounded.
    let pass = store.latest_passing_submission(2).await.unwrap().unwrap();
    assert_eq!(pass.verdict, VerdictKind::Pass);
    assert_eq!(pass.chain_job_id, 2);
    assert!(store.latest_passing_submission(99).await.unwrap().is_none());
}

#[tokio::test]
async fn test_memory_store_contract() {
    battery(Arc::new(MemoryStore::new())).await;
}

#[tokio::test]
async fn test_sqlite_store_contract() {
    battery(Arc::new(SqliteStore::in_memory().unwrap())).await;
}

#[tokio::test]
async fn test_sqlite_store_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settlement.db");

    {
        let store = SqliteStore::new(path.clone()).unwrap();
        store.insert_job(job_record(5, "durable")).await.unwrap();
        store.mark_paid(5, "0xtx5").await.unwrap();
        store
            .append_submission(submission(5, VerdictKind::Pass, 0))
            .await
            .unwrap();
    }

    let store = SqliteStore::new(path).unwrap();
    let job = store.get_job(5).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Paid);
    assert_eq!(job.settlement_tx.as_deref(), Some("0xtx5"));
    assert_eq!(store.submissions_for_job(5, 10).await.unwrap().len(), 1);
}
