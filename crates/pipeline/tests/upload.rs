//! Upload Pairing Engine tests.

mod common;

use assert_matches::assert_matches;
use common::{part, Harness};
use sheetflow_core::error::CoreError;
use sheetflow_core::types::{new_id, EntityId};
use sheetflow_db::EntityStore;
use sheetflow_pipeline::upload::{upload_cad_files, UploadPart, UploadRequest};
use sheetflow_pipeline::PipelineError;

fn request(owner_id: EntityId, project_id: EntityId, parts: Vec<UploadPart>) -> UploadRequest {
    UploadRequest {
        owner_id,
        project_id,
        material: "steel".into(),
        parts,
    }
}

// ---------------------------------------------------------------------------
// Pairing
// ---------------------------------------------------------------------------

#[tokio::test]
async fn two_pairs_produce_two_complete_records() {
    let h = Harness::new();
    let owner = new_id();
    let project = h.project(owner).await;

    let parts = vec![
        part("part.stp", b"part-body"),
        part("part.obj", b"part-mesh"),
        part("bracket.stp", b"bracket-body"),
        part("bracket.obj", b"bracket-mesh"),
    ];
    let records = upload_cad_files(&h.ctx, request(owner, project.id, parts))
        .await
        .unwrap();

    let names: Vec<&str> = records.iter().map(|r| r.file_name.as_str()).collect();
    assert_eq!(names, ["part.stp", "bracket.stp"]);
    for record in &records {
        assert!(record.is_complete(), "{} should be paired", record.file_name);
        assert_eq!(record.material, "steel");
        assert_eq!(record.project_id, project.id);
    }

    let stats = h.store.stats().await;
    assert_eq!(stats.cad_file_creates, 2);
    assert_eq!(stats.cad_file_updates, 2);
    assert_eq!(h.stored_file_count(), 4);
}

#[tokio::test]
async fn halves_share_a_storage_key_and_land_in_the_project_directory() {
    let h = Harness::new();
    let owner = new_id();
    let project = h.project(owner).await;

    let records = upload_cad_files(
        &h.ctx,
        request(
            owner,
            project.id,
            vec![part("hinge.STEP", b"body"), part("hinge.obj", b"mesh!")],
        ),
    )
    .await
    .unwrap();
    let record = &records[0];

    let step = record.step_url.as_deref().unwrap();
    let mesh = record.obj_url.as_deref().unwrap();
    let scope = format!("{owner}/{}", project.id);
    assert!(step.contains(&scope), "{step} should be under {scope}");
    assert!(step.ends_with(".step"));
    assert!(mesh.ends_with(".obj"));
    assert_eq!(
        step.trim_end_matches(".step"),
        mesh.trim_end_matches(".obj"),
        "both halves should use one storage key"
    );

    assert_eq!(record.file_name, "hinge.stp");
    assert_eq!(record.file_size, 9);
    assert_eq!(h.storage_read(step).await, b"body");
}

#[tokio::test]
async fn interleaved_parts_still_pair_by_base_name() {
    let h = Harness::new();
    let owner = new_id();
    let project = h.project(owner).await;

    let parts = vec![
        part("a.stp", b"a"),
        part("b.obj", b"b"),
        part("c.obj", b"c"),
        part("b.stp", b"b"),
        part("a.obj", b"a"),
        part("c.step", b"c"),
    ];
    let records = upload_cad_files(&h.ctx, request(owner, project.id, parts))
        .await
        .unwrap();

    let names: Vec<&str> = records.iter().map(|r| r.file_name.as_str()).collect();
    assert_eq!(names, ["b.stp", "a.stp", "c.stp"]);
    assert!(records.iter().all(|r| r.is_complete()));
    assert_eq!(h.store.cad_file_count().await, 3);
}

#[tokio::test]
async fn n_pairs_yield_n_records() {
    for n in 1..=5usize {
        let h = Harness::new();
        let owner = new_id();
        let project = h.project(owner).await;

        let mut parts = Vec::new();
        for i in 0..n {
            parts.push(UploadPart {
                file_name: format!("p{i}.stp"),
                bytes: bytes::Bytes::from(vec![1u8; 16]),
            });
            parts.push(UploadPart {
                file_name: format!("p{i}.obj"),
                bytes: bytes::Bytes::from(vec![2u8; 8]),
            });
        }

        let records = upload_cad_files(&h.ctx, request(owner, project.id, parts))
            .await
            .unwrap();
        assert_eq!(records.len(), n);
        assert!(records.iter().all(|r| r.is_complete() && r.file_size == 24));
    }
}

// ---------------------------------------------------------------------------
// Rejections
// ---------------------------------------------------------------------------

async fn assert_rejected(h: &Harness, req: UploadRequest) {
    let result = upload_cad_files(&h.ctx, req).await;
    assert_matches!(result, Err(PipelineError::Core(CoreError::Validation(_))));
    assert_eq!(h.store.cad_file_count().await, 0);
    assert_eq!(h.stored_file_count(), 0);
}

#[tokio::test]
async fn empty_upload_is_rejected() {
    let h = Harness::new();
    let owner = new_id();
    let project = h.project(owner).await;
    assert_rejected(&h, request(owner, project.id, vec![])).await;
}

#[tokio::test]
async fn odd_part_count_is_rejected_without_writes() {
    let h = Harness::new();
    let owner = new_id();
    let project = h.project(owner).await;
    let parts = vec![
        part("part.stp", b"x"),
        part("part.obj", b"x"),
        part("bracket.stp", b"x"),
    ];
    assert_rejected(&h, request(owner, project.id, parts)).await;
}

#[tokio::test]
async fn foreign_extension_fails_whole_batch() {
    let h = Harness::new();
    let owner = new_id();
    let project = h.project(owner).await;
    let parts = vec![
        part("part.stp", b"x"),
        part("part.obj", b"x"),
        part("notes.txt", b"x"),
        part("notes.obj", b"x"),
    ];
    assert_rejected(&h, request(owner, project.id, parts)).await;
}

#[tokio::test]
async fn oversized_part_is_rejected() {
    let h = Harness::new();
    let owner = new_id();
    let project = h.project(owner).await;
    let big = UploadPart {
        file_name: "big.stp".into(),
        bytes: bytes::Bytes::from(vec![0u8; (1 << 20) + 1]),
    };
    assert_rejected(&h, request(owner, project.id, vec![big, part("big.obj", b"x")])).await;
}

#[tokio::test]
async fn two_bodies_without_mesh_are_unbalanced() {
    let h = Harness::new();
    let owner = new_id();
    let project = h.project(owner).await;
    let parts = vec![part("part.stp", b"x"), part("part.step", b"x")];
    assert_rejected(&h, request(owner, project.id, parts)).await;
}

#[tokio::test]
async fn blank_material_is_rejected() {
    let h = Harness::new();
    let owner = new_id();
    let project = h.project(owner).await;
    let mut req = request(
        owner,
        project.id,
        vec![part("part.stp", b"x"), part("part.obj", b"x")],
    );
    req.material = "  ".into();
    assert_rejected(&h, req).await;
}

#[tokio::test]
async fn upload_into_someone_elses_project_is_forbidden() {
    let h = Harness::new();
    let project = h.project(new_id()).await;

    let result = upload_cad_files(
        &h.ctx,
        request(
            new_id(),
            project.id,
            vec![part("part.stp", b"x"), part("part.obj", b"x")],
        ),
    )
    .await;

    assert_matches!(result, Err(PipelineError::Core(CoreError::Forbidden(_))));
    assert!(h.store.list_cad_files(project.id).await.unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Storage failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn write_failure_aborts_batch_and_keeps_earlier_files() {
    let h = Harness::with_write_budget(2);
    let owner = new_id();
    let project = h.project(owner).await;

    let parts = vec![
        part("part.stp", b"part-body"),
        part("part.obj", b"part-mesh"),
        part("bracket.stp", b"bracket-body"),
        part("bracket.obj", b"bracket-mesh"),
    ];
    let result = upload_cad_files(&h.ctx, request(owner, project.id, parts)).await;

    assert_matches!(result, Err(PipelineError::Io(_)));
    let stats = h.store.stats().await;
    assert_eq!(stats.cad_file_creates, 1);
    assert_eq!(stats.cad_file_updates, 1);
    assert_eq!(h.stored_file_count(), 2);

    let stored = h.store.list_cad_files(project.id).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].file_name, "part.stp");
    let step = stored[0].step_url.as_deref().unwrap();
    assert_eq!(h.storage_read(step).await, b"part-body");
}
