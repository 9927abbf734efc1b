//! Protocol-level tests for the multipart upload flow against the
//! in-memory store: plan first, then create, presign, complete.

use std::time::Duration;

use ufdr_storage::{plan_parts, CompletedPart, InMemoryStore, MultipartStore};

const DEFAULT_PART_SIZE: i64 = 64 * 1024 * 1024;
const MAX_PARTS: i64 = 10_000;

#[tokio::test]
async fn planning_runs_before_any_store_call() {
    let store = InMemoryStore::new();

    // 1 TiB with a 64 MiB default needs 16384 parts; the plan grows the
    // part size so the count lands under the cap, and no store call is
    // made until the plan is settled.
    let size = 1024_i64 * 1024 * 1024 * 1024;
    let plan = plan_parts(size, None, DEFAULT_PART_SIZE, MAX_PARTS).unwrap();
    assert!(i64::from(plan.total_parts) <= MAX_PARTS);
    assert!(plan.part_size > DEFAULT_PART_SIZE);
    assert_eq!(store.calls.total(), 0);

    let upload_id = store
        .create_multipart("uploads/u0/case.ufdr", "application/octet-stream")
        .await
        .unwrap();
    assert!(!upload_id.is_empty());
    assert_eq!(store.calls.total(), 1);
}

#[tokio::test]
async fn presign_failure_leaves_no_pending_upload_after_abort() {
    let store = InMemoryStore::new();
    let key = "uploads/u1/case.ufdr";
    let upload_id = store.create_multipart(key, "application/octet-stream").await.unwrap();
    store.fail_presign_after(2);

    let mut presigned = Vec::new();
    let mut failed = false;
    for part_number in 1..=4 {
        match store
            .presign_part(key, &upload_id, part_number, Duration::from_secs(60))
            .await
        {
            Ok(url) => presigned.push(url),
            Err(_) => {
                store.abort_multipart(key, &upload_id).await.unwrap();
                failed = true;
                break;
            }
        }
    }

    assert!(failed);
    assert_eq!(presigned.len(), 2);
    assert_eq!(store.pending_upload_count(), 0);
}

#[tokio::test]
async fn shuffled_parts_sorted_before_finalize() {
    let store = InMemoryStore::new();
    let key = "uploads/u2/case.ufdr";
    let upload_id = store.create_multipart(key, "application/octet-stream").await.unwrap();

    let mut parts = Vec::new();
    for part_number in [3, 1, 2] {
        let etag = store.put_part(&upload_id, part_number, format!("part-{part_number}"));
        parts.push(CompletedPart { part_number, etag });
    }

    // The caller sorts; the store rejects anything else.
    parts.sort_by_key(|p| p.part_number);
    store.complete_multipart(key, &upload_id, &parts).await.unwrap();

    assert_eq!(store.last_completed_order(), vec![1, 2, 3]);
    assert!(store.object_exists(key));
}

#[tokio::test]
async fn completing_with_a_missing_part_fails_and_keeps_the_upload() {
    let store = InMemoryStore::new();
    let key = "uploads/u3/case.ufdr";
    let upload_id = store.create_multipart(key, "application/octet-stream").await.unwrap();
    let etag = store.put_part(&upload_id, 1, &b"only part"[..]);

    let parts = vec![
        CompletedPart {
            part_number: 1,
            etag,
        },
        CompletedPart {
            part_number: 2,
            etag: "\"etag-2\"".to_string(),
        },
    ];
    assert!(store.complete_multipart(key, &upload_id, &parts).await.is_err());
    // The upload survives so the client can retry the missing part.
    assert_eq!(store.pending_upload_count(), 1);
    assert!(!store.object_exists(key));
}
