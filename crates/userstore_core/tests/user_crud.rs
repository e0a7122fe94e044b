use rusqlite::Connection;
use userstore_core::db::open_db_in_memory;
use userstore_core::{
    ListPage, NewUser, RepoError, SqliteUserRepository, UserPatch, UserRepository,
    UserValidationError,
};

#[test]
fn insert_and_get_roundtrip() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteUserRepository::try_new(&conn).unwrap();

    let created = repo
        .insert_user(&NewUser::new(" Ann ", "ann@x.com ").unwrap())
        .unwrap();
    assert!(created.id > 0);
    assert_eq!(created.name, "Ann");
    assert_eq!(created.email, "ann@x.com");
    assert!(!created.created_at.is_empty());

    let loaded = repo.get_user(created.id).unwrap().unwrap();
    assert_eq!(loaded, created);
}

#[test]
fn get_missing_returns_none() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteUserRepository::try_new(&conn).unwrap();

    assert!(repo.get_user(42).unwrap().is_none());
}

#[test]
fn duplicate_email_maps_to_semantic_error() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteUserRepository::try_new(&conn).unwrap();

    repo.insert_user(&NewUser::new("Bob", "bob@x.com").unwrap())
        .unwrap();
    let err = repo
        .insert_user(&NewUser::new("Bob2", "bob@x.com").unwrap())
        .unwrap_err();
    assert!(matches!(err, RepoError::DuplicateEmail));
    assert_eq!(repo.count_users().unwrap(), 1);
}

#[test]
fn email_uniqueness_is_case_sensitive() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteUserRepository::try_new(&conn).unwrap();

    repo.insert_user(&NewUser::new("Bob", "bob@x.com").unwrap())
        .unwrap();
    repo.insert_user(&NewUser::new("Bob", "BOB@x.com").unwrap())
        .unwrap();
    assert_eq!(repo.count_users().unwrap(), 2);
}

#[test]
fn list_orders_newest_first_and_applies_window() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteUserRepository::try_new(&conn).unwrap();

    let a = repo.insert_user(&NewUser::new("A", "a@x.com").unwrap()).unwrap();
    let b = repo.insert_user(&NewUser::new("B", "b@x.com").unwrap()).unwrap();
    let c = repo.insert_user(&NewUser::new("C", "c@x.com").unwrap()).unwrap();

    let all = repo.list_users(ListPage::default()).unwrap();
    let ids: Vec<_> = all.iter().map(|user| user.id).collect();
    assert_eq!(ids, vec![c.id, b.id, a.id]);

    let page = repo
        .list_users(ListPage::normalize(Some(2), Some(1)))
        .unwrap();
    let ids: Vec<_> = page.iter().map(|user| user.id).collect();
    assert_eq!(ids, vec![b.id, a.id]);

    let past_end = repo
        .list_users(ListPage::normalize(Some(10), Some(10)))
        .unwrap();
    assert!(past_end.is_empty());
    assert_eq!(repo.count_users().unwrap(), 3);
}

#[test]
fn update_applies_only_present_fields() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteUserRepository::try_new(&conn).unwrap();

    let created = repo
        .insert_user(&NewUser::new("Ann", "ann@x.com").unwrap())
        .unwrap();

    let renamed = repo
        .update_user(
            created.id,
            &UserPatch {
                name: Some("  Annie ".to_string()),
                email: None,
            },
        )
        .unwrap();
    assert_eq!(renamed.name, "Annie");
    assert_eq!(renamed.email, "ann@x.com");
    assert_eq!(renamed.created_at, created.created_at);

    let moved = repo
        .update_user(
            created.id,
            &UserPatch {
                name: None,
                email: Some("annie@x.com".to_string()),
            },
        )
        .unwrap();
    assert_eq!(moved.name, "Annie");
    assert_eq!(moved.email, "annie@x.com");
}

#[test]
fn update_to_own_email_is_not_a_duplicate() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteUserRepository::try_new(&conn).unwrap();

    let created = repo
        .insert_user(&NewUser::new("Ann", "ann@x.com").unwrap())
        .unwrap();
    let updated = repo
        .update_user(
            created.id,
            &UserPatch {
                name: None,
                email: Some("ann@x.com".to_string()),
            },
        )
        .unwrap();
    assert_eq!(updated, created);
}

#[test]
fn update_to_taken_email_fails_and_leaves_row_unchanged() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteUserRepository::try_new(&conn).unwrap();

    repo.insert_user(&NewUser::new("Ann", "ann@x.com").unwrap())
        .unwrap();
    let bob = repo
        .insert_user(&NewUser::new("Bob", "bob@x.com").unwrap())
        .unwrap();

    let err = repo
        .update_user(
            bob.id,
            &UserPatch {
                name: Some("Robert".to_string()),
                email: Some("ann@x.com".to_string()),
            },
        )
        .unwrap_err();
    assert!(matches!(err, RepoError::DuplicateEmail));
    assert_eq!(repo.get_user(bob.id).unwrap().unwrap(), bob);
}

#[test]
fn update_missing_and_empty_patch_errors() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteUserRepository::try_new(&conn).unwrap();

    let err = repo
        .update_user(
            9,
            &UserPatch {
                name: Some("X".to_string()),
                email: None,
            },
        )
        .unwrap_err();
    assert!(matches!(err, RepoError::NotFound(9)));

    let err = repo.update_user(9, &UserPatch::default()).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(UserValidationError::EmptyPatch)
    ));
}

#[test]
fn delete_returns_snapshot_and_ids_are_not_reused() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteUserRepository::try_new(&conn).unwrap();

    let first = repo
        .insert_user(&NewUser::new("Ann", "ann@x.com").unwrap())
        .unwrap();
    let deleted = repo.delete_user(first.id).unwrap();
    assert_eq!(deleted, first);
    assert!(repo.get_user(first.id).unwrap().is_none());

    let err = repo.delete_user(first.id).unwrap_err();
    assert!(matches!(err, RepoError::NotFound(id) if id == first.id));

    let second = repo
        .insert_user(&NewUser::new("Ann", "ann@x.com").unwrap())
        .unwrap();
    assert!(second.id > first.id);
}

#[test]
fn repository_rejects_connection_without_users_table() {
    let conn = Connection::open_in_memory().unwrap();

    let result = SqliteUserRepository::try_new(&conn);
    assert!(matches!(
        result,
        Err(RepoError::MissingRequiredTable("users"))
    ));
}

#[test]
fn repository_rejects_connection_missing_users_column() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE
        );",
    )
    .unwrap();

    let result = SqliteUserRepository::try_new(&conn);
    assert!(matches!(
        result,
        Err(RepoError::MissingRequiredColumn {
            table: "users",
            column: "created_at"
        })
    ));
}
