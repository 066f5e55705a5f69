//! Integration tests for section drafts and version history.
//!
//! Exercises the repositories against a real database:
//! - Draft upsert keeps one row per section
//! - Explicit version numbers are unique per section
//! - The atomic creation function numbers, inserts and prunes
//! - History listing order and limits

use folio_db::models::page_section::CreatePageSection;
use folio_db::models::profile::CreateProfile;
use folio_db::models::section_draft::UpsertSectionDraft;
use folio_db::models::section_version::CreateSectionVersion;
use folio_db::repositories::{
    PageSectionRepo, ProfileRepo, SectionDraftRepo, SectionVersionRepo,
};
use serde_json::json;
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Create a profile and a section. Returns (profile_id, section_id).
async fn setup_section(pool: &PgPool, key: &str) -> (i64, i64) {
    let profile = ProfileRepo::create(
        pool,
        &CreateProfile {
            full_name: Some("Grace Hopper".to_string()),
            email: Some("grace@example.com".to_string()),
        },
    )
    .await
    .unwrap();
    let section = PageSectionRepo::create(
        pool,
        &CreatePageSection {
            section_key: key.to_string(),
            content: json!({"title": "Initial"}),
        },
    )
    .await
    .unwrap();
    (profile.id, section.id)
}

fn new_version(section_id: i64, number: i32, created_by: i64) -> CreateSectionVersion {
    CreateSectionVersion {
        section_id,
        version_number: number,
        content: json!({"n": number}),
        created_by,
    }
}

// ---------------------------------------------------------------------------
// Drafts
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_draft_upsert_replaces_existing(pool: PgPool) {
    let (user_id, section_id) = setup_section(&pool, "hero").await;

    let first = SectionDraftRepo::upsert(
        &pool,
        &UpsertSectionDraft {
            section_id,
            content: json!({"title": "A"}),
            status: "draft".to_string(),
            updated_by: user_id,
            updated_at: chrono::Utc::now(),
        },
    )
    .await
    .unwrap();

    let second = SectionDraftRepo::upsert(
        &pool,
        &UpsertSectionDraft {
            section_id,
            content: json!({"title": "B"}),
            status: "draft".to_string(),
            updated_by: user_id,
            updated_at: chrono::Utc::now(),
        },
    )
    .await
    .unwrap();

    assert_eq!(first.id, second.id, "upsert must reuse the row");
    let loaded = SectionDraftRepo::find_by_section(&pool, section_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(loaded.content, json!({"title": "B"}));

    assert!(SectionDraftRepo::delete_by_section(&pool, section_id).await.unwrap());
    assert!(SectionDraftRepo::find_by_section(&pool, section_id)
        .await
        .unwrap()
        .is_none());
}

// ---------------------------------------------------------------------------
// Client-driven versions
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_duplicate_version_number_rejected(pool: PgPool) {
    let (user_id, section_id) = setup_section(&pool, "features").await;

    SectionVersionRepo::create(&pool, &new_version(section_id, 1, user_id))
        .await
        .unwrap();
    let err = SectionVersionRepo::create(&pool, &new_version(section_id, 1, user_id))
        .await
        .unwrap_err();

    assert_eq!(
        folio_db::unique_violation_constraint(&err).as_deref(),
        Some("uq_page_section_versions_section_version")
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_max_version_and_listing(pool: PgPool) {
    let (user_id, section_id) = setup_section(&pool, "faq").await;
    assert_eq!(
        SectionVersionRepo::max_version_number(&pool, section_id).await.unwrap(),
        None
    );

    for n in 1..=3 {
        SectionVersionRepo::create(&pool, &new_version(section_id, n, user_id))
            .await
            .unwrap();
    }

    assert_eq!(
        SectionVersionRepo::max_version_number(&pool, section_id).await.unwrap(),
        Some(3)
    );

    let all = SectionVersionRepo::list_for_section(&pool, section_id, None)
        .await
        .unwrap();
    let numbers: Vec<i32> = all.iter().map(|v| v.version_number).collect();
    assert_eq!(numbers, vec![3, 2, 1]);

    let limited = SectionVersionRepo::list_for_section(&pool, section_id, Some(2))
        .await
        .unwrap();
    assert_eq!(limited.len(), 2);

    let removed = SectionVersionRepo::delete_by_ids(&pool, &[all[2].id]).await.unwrap();
    assert_eq!(removed, 1);
    assert!(SectionVersionRepo::find_by_id(&pool, all[2].id)
        .await
        .unwrap()
        .is_none());
}

// ---------------------------------------------------------------------------
// Atomic creation function
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_atomic_function_installed(pool: PgPool) {
    assert!(SectionVersionRepo::atomic_function_available(&pool).await.unwrap());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_atomic_creation_numbers_and_prunes(pool: PgPool) {
    let (user_id, section_id) = setup_section(&pool, "pricing").await;

    for n in 1..=6 {
        let version = SectionVersionRepo::create_atomic(
            &pool,
            section_id,
            &json!({"n": n}),
            user_id,
            5,
        )
        .await
        .unwrap();
        assert_eq!(version.version_number, n);
    }

    let history = SectionVersionRepo::list_for_section(&pool, section_id, None)
        .await
        .unwrap();
    let numbers: Vec<i32> = history.iter().map(|v| v.version_number).collect();
    assert_eq!(numbers, vec![6, 5, 4, 3, 2]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_sections_over_retention(pool: PgPool) {
    let (user_id, crowded) = setup_section(&pool, "crowded").await;
    let (_, sparse) = setup_section(&pool, "sparse").await;

    for n in 1..=4 {
        SectionVersionRepo::create(&pool, &new_version(crowded, n, user_id))
            .await
            .unwrap();
    }
    SectionVersionRepo::create(&pool, &new_version(sparse, 1, user_id))
        .await
        .unwrap();

    let over = SectionVersionRepo::list_sections_over_retention(&pool, 3)
        .await
        .unwrap();
    assert_eq!(over, vec![crowded]);
}

// ---------------------------------------------------------------------------
// Profiles
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_profile_labels(pool: PgPool) {
    let named = ProfileRepo::create(
        &pool,
        &CreateProfile {
            full_name: Some("Ada".to_string()),
            email: None,
        },
    )
    .await
    .unwrap();
    let anonymous = ProfileRepo::create(&pool, &CreateProfile { full_name: None, email: None })
        .await
        .unwrap();

    let profiles = ProfileRepo::find_by_ids(&pool, &[named.id, anonymous.id, 999_999])
        .await
        .unwrap();
    assert_eq!(profiles.len(), 2);

    let label_of = |id: i64| profiles.iter().find(|p| p.id == id).unwrap().label();
    assert_eq!(label_of(named.id), "Ada");
    assert_eq!(label_of(anonymous.id), "Unknown");
}
