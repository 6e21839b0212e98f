use feedback_core::db::StorageGateway;
use feedback_core::{
    ErrorKind, FeedbackRepository, FeedbackSubmission, NotFound, RepoError,
    SqliteFeedbackRepository, ValidationError,
};
use rusqlite::params;
use serde_json::{json, Value};

const PACKAGE: &str = "com.example.myapp";

fn submit(repo: &SqliteFeedbackRepository<'_>, fields: Value) -> feedback_core::Feedback {
    repo.create_feedback(&submission(fields)).unwrap()
}

fn submission(fields: Value) -> FeedbackSubmission {
    let mut base = json!({
        "package_name": PACKAGE,
        "app_version": "2.3.1",
        "form_id": "form-a",
        "user_id": "user-1"
    });
    if let (Some(target), Value::Object(extra)) = (base.as_object_mut(), fields) {
        target.extend(extra);
    }
    serde_json::from_value(base).unwrap()
}

fn set_created_at(gateway: &StorageGateway, id: &str, created_at: i64) {
    gateway
        .connection()
        .unwrap()
        .execute(
            "UPDATE feedback SET created_at = ?2 WHERE id = ?1;",
            params![id, created_at],
        )
        .unwrap();
}

#[test]
fn create_stores_rating_exactly_for_every_valid_value() {
    let gateway = StorageGateway::in_memory();
    let repo = SqliteFeedbackRepository::new(&gateway);

    for rating in 1..=5 {
        let created = submit(&repo, json!({ "rating": rating }));
        assert_eq!(created.rating, Some(rating));

        let loaded = repo.get_feedback(PACKAGE, &created.id).unwrap();
        assert_eq!(loaded.rating, Some(rating));
        assert_eq!(loaded.message, None);
    }
}

#[test]
fn create_generates_identity_and_keeps_optional_fields() {
    let gateway = StorageGateway::in_memory();
    let repo = SqliteFeedbackRepository::new(&gateway);

    let created = submit(
        &repo,
        json!({ "message": "Love it", "rating": "4", "device_info": "Pixel 8" }),
    );
    assert!(!created.id.is_empty());
    assert!(created.created_at > 0);
    assert_eq!(created.package_name, PACKAGE);
    assert_eq!(created.rating, Some(4));
    assert_eq!(created.device_info.as_deref(), Some("Pixel 8"));

    let other = submit(&repo, json!({ "message": "again" }));
    assert_ne!(created.id, other.id);
}

#[test]
fn create_rejects_invalid_ratings() {
    let gateway = StorageGateway::in_memory();
    let repo = SqliteFeedbackRepository::new(&gateway);

    for rating in [json!(0), json!(6), json!("abc"), json!(2.5)] {
        let err = repo
            .create_feedback(&submission(json!({ "message": "x", "rating": rating })))
            .unwrap_err();
        assert!(
            matches!(
                err,
                RepoError::Validation(ValidationError::InvalidRating(_))
            ),
            "unexpected error: {err}"
        );
    }
    assert!(repo.list_packages().unwrap().is_empty());
}

#[test]
fn create_rejects_each_missing_required_field() {
    let gateway = StorageGateway::in_memory();
    let repo = SqliteFeedbackRepository::new(&gateway);

    for field in ["package_name", "app_version", "form_id", "user_id"] {
        let mut fields = json!({
            "package_name": PACKAGE,
            "app_version": "2.3.1",
            "form_id": "form-a",
            "user_id": "user-1",
            "message": "hello"
        });
        fields.as_object_mut().unwrap().remove(field);
        let input: FeedbackSubmission = serde_json::from_value(fields).unwrap();

        let err = repo.create_feedback(&input).unwrap_err();
        match err {
            RepoError::Validation(ValidationError::MissingFields(missing)) => {
                assert_eq!(missing, vec![field]);
            }
            other => panic!("unexpected error for {field}: {other}"),
        }
    }
}

#[test]
fn create_requires_message_or_rating() {
    let gateway = StorageGateway::in_memory();
    let repo = SqliteFeedbackRepository::new(&gateway);

    let err = repo.create_feedback(&submission(json!({}))).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ValidationError::MissingMessageAndRating)
    ));

    let err = repo
        .create_feedback(&submission(json!({ "rating": null })))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    assert!(repo
        .create_feedback(&submission(json!({ "message": "only text" })))
        .is_ok());
    assert!(repo
        .create_feedback(&submission(json!({ "rating": 3 })))
        .is_ok());
}

#[test]
fn create_rejects_structural_package_names() {
    let gateway = StorageGateway::in_memory();
    let repo = SqliteFeedbackRepository::new(&gateway);

    let err = repo
        .create_feedback(&submission(
            json!({ "package_name": "../escape", "message": "x" }),
        ))
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ValidationError::InvalidPackageName(_))
    ));
}

#[test]
fn unknown_package_is_not_found_for_scoped_operations() {
    let gateway = StorageGateway::in_memory();
    let repo = SqliteFeedbackRepository::new(&gateway);
    let missing = "com.unknown";
    let is_missing_package =
        |err: RepoError| err.not_found() == Some(&NotFound::Package(missing.to_string()));

    assert!(is_missing_package(repo.list_feedback(missing, None).unwrap_err()));
    assert!(is_missing_package(repo.get_feedback(missing, "x").unwrap_err()));
    assert!(is_missing_package(
        repo.list_feedback_by_user(missing, "user-1").unwrap_err()
    ));
    assert!(is_missing_package(repo.average_rating(missing, None).unwrap_err()));
    assert!(is_missing_package(repo.feedback_stats(missing, None).unwrap_err()));
    assert!(is_missing_package(repo.search_feedback(missing, None).unwrap_err()));
    assert!(is_missing_package(
        repo.recent_feedback(missing, None, None).unwrap_err()
    ));
    assert!(is_missing_package(repo.delete_feedback(missing, "x").unwrap_err()));
    assert!(is_missing_package(
        repo.delete_feedback_for_form(missing, "form-a").unwrap_err()
    ));
    assert!(is_missing_package(repo.delete_all_feedback(missing).unwrap_err()));
}

#[test]
fn list_feedback_filters_by_form_and_reports_empty_filter_as_not_found() {
    let gateway = StorageGateway::in_memory();
    let repo = SqliteFeedbackRepository::new(&gateway);
    let first = submit(&repo, json!({ "message": "one" }));
    let second = submit(&repo, json!({ "message": "two", "form_id": "form-b" }));
    let third = submit(&repo, json!({ "message": "three" }));

    let all = repo.list_feedback(PACKAGE, None).unwrap();
    let ids: Vec<&str> = all.iter().map(|item| item.id.as_str()).collect();
    assert_eq!(ids, vec![first.id.as_str(), second.id.as_str(), third.id.as_str()]);

    let unfiltered = repo.list_feedback(PACKAGE, Some("")).unwrap();
    assert_eq!(unfiltered.len(), 3);

    let form_a = repo.list_feedback(PACKAGE, Some("form-a")).unwrap();
    assert_eq!(form_a.len(), 2);
    assert!(form_a.iter().all(|item| item.form_id == "form-a"));

    let err = repo.list_feedback(PACKAGE, Some("form-z")).unwrap_err();
    assert_eq!(
        err.not_found(),
        Some(&NotFound::NoMatchingFeedback {
            package: PACKAGE.to_string(),
            form_id: Some("form-z".to_string()),
        })
    );
}

#[test]
fn get_feedback_is_scoped_to_its_package() {
    let gateway = StorageGateway::in_memory();
    let repo = SqliteFeedbackRepository::new(&gateway);
    let created = submit(&repo, json!({ "message": "scoped" }));
    repo.create_feedback(&submission(
        json!({ "package_name": "com.other", "message": "other" }),
    ))
    .unwrap();

    assert_eq!(repo.get_feedback(PACKAGE, &created.id).unwrap(), created);

    let err = repo.get_feedback("com.other", &created.id).unwrap_err();
    assert!(matches!(
        err.not_found(),
        Some(NotFound::Feedback { .. })
    ));

    let err = repo.get_feedback(PACKAGE, "not-a-uuid").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn list_feedback_by_user_returns_empty_list_instead_of_not_found() {
    let gateway = StorageGateway::in_memory();
    let repo = SqliteFeedbackRepository::new(&gateway);
    submit(&repo, json!({ "message": "a" }));
    submit(&repo, json!({ "message": "b", "user_id": "user-2" }));
    submit(&repo, json!({ "message": "c" }));

    assert_eq!(repo.list_feedback_by_user(PACKAGE, "user-1").unwrap().len(), 2);
    assert_eq!(repo.list_feedback_by_user(PACKAGE, "user-2").unwrap().len(), 1);
    assert!(repo
        .list_feedback_by_user(PACKAGE, "nobody")
        .unwrap()
        .is_empty());
}

#[test]
fn search_feedback_matches_case_insensitive_literals() {
    let gateway = StorageGateway::in_memory();
    let repo = SqliteFeedbackRepository::new(&gateway);
    let crash = submit(&repo, json!({ "message": "App CRASHES on login" }));
    submit(&repo, json!({ "message": "Great app" }));
    submit(&repo, json!({ "rating": 2 }));
    let dotted = submit(&repo, json!({ "message": "version 1.2 broke it" }));

    let found = repo.search_feedback(PACKAGE, Some("crash")).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, crash.id);

    let literal = repo.search_feedback(PACKAGE, Some("1.2")).unwrap();
    assert_eq!(literal.len(), 1);
    assert_eq!(literal[0].id, dotted.id);

    assert!(repo
        .search_feedback(PACKAGE, Some("nothing like this"))
        .unwrap()
        .is_empty());
    assert_eq!(repo.search_feedback(PACKAGE, None).unwrap().len(), 4);
    assert_eq!(repo.search_feedback(PACKAGE, Some("")).unwrap().len(), 4);
}

#[test]
fn recent_feedback_orders_newest_first_and_applies_limit() {
    let gateway = StorageGateway::in_memory();
    let repo = SqliteFeedbackRepository::new(&gateway);
    let mut ids = Vec::new();
    for index in 0..12 {
        let created = submit(&repo, json!({ "message": format!("entry {index}") }));
        set_created_at(&gateway, &created.id, 1_000 + index);
        ids.push(created.id);
    }

    let recent = repo.recent_feedback(PACKAGE, None, None).unwrap();
    assert_eq!(recent.len(), 10);
    assert_eq!(recent[0].id, ids[11]);
    assert_eq!(recent[9].id, ids[2]);
    assert!(recent
        .windows(2)
        .all(|pair| pair[0].created_at >= pair[1].created_at));

    let top_two = repo.recent_feedback(PACKAGE, Some(2), None).unwrap();
    assert_eq!(top_two.len(), 2);
    assert_eq!(top_two[1].id, ids[10]);

    let everything = repo.recent_feedback(PACKAGE, Some(0), None).unwrap();
    assert_eq!(everything.len(), 12);
    assert_eq!(everything[11].id, ids[0]);
}

#[test]
fn recent_feedback_with_unknown_form_is_not_found() {
    let gateway = StorageGateway::in_memory();
    let repo = SqliteFeedbackRepository::new(&gateway);
    submit(&repo, json!({ "message": "only form-a" }));

    let recent = repo
        .recent_feedback(PACKAGE, Some(5), Some("form-a"))
        .unwrap();
    assert_eq!(recent.len(), 1);

    let err = repo
        .recent_feedback(PACKAGE, Some(5), Some("form-b"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn delete_feedback_twice_reports_not_found_second_time() {
    let gateway = StorageGateway::in_memory();
    let repo = SqliteFeedbackRepository::new(&gateway);
    let created = submit(&repo, json!({ "message": "delete me" }));

    repo.delete_feedback(PACKAGE, &created.id).unwrap();
    let err = repo.delete_feedback(PACKAGE, &created.id).unwrap_err();
    assert!(matches!(
        err.not_found(),
        Some(NotFound::Feedback { .. })
    ));
}

#[test]
fn delete_feedback_for_form_counts_and_rejects_unknown_form() {
    let gateway = StorageGateway::in_memory();
    let repo = SqliteFeedbackRepository::new(&gateway);
    submit(&repo, json!({ "message": "a" }));
    submit(&repo, json!({ "message": "b" }));
    let kept = submit(&repo, json!({ "message": "c", "form_id": "form-b" }));

    assert_eq!(repo.delete_feedback_for_form(PACKAGE, "form-a").unwrap(), 2);
    let remaining = repo.list_feedback(PACKAGE, None).unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, kept.id);

    let err = repo
        .delete_feedback_for_form(PACKAGE, "unknown-form")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn delete_all_feedback_keeps_the_collection() {
    let gateway = StorageGateway::in_memory();
    let repo = SqliteFeedbackRepository::new(&gateway);
    submit(&repo, json!({ "message": "a" }));
    submit(&repo, json!({ "rating": 5 }));
    submit(&repo, json!({ "package_name": "com.other", "message": "untouched" }));

    assert_eq!(repo.delete_all_feedback(PACKAGE).unwrap(), 2);
    assert_eq!(repo.delete_all_feedback(PACKAGE).unwrap(), 0);

    assert!(repo.list_feedback_by_user(PACKAGE, "user-1").unwrap().is_empty());
    let err = repo.list_feedback(PACKAGE, None).unwrap_err();
    assert!(matches!(
        err.not_found(),
        Some(NotFound::NoMatchingFeedback { .. })
    ));
    assert_eq!(repo.list_feedback("com.other", None).unwrap().len(), 1);
    assert_eq!(
        repo.list_packages().unwrap(),
        vec!["com.example.myapp", "com.other"]
    );
}
