mod support;

use teamdeck::board::{BoardTaskPatch, NewBoardTask, TagPatch};
use teamdeck::Error;

use support::TestEnv;

#[test]
fn tag_creation_writes_entity_and_board_reference() {
    let env = TestEnv::with_users(&["alice"]);
    let boards = env.boards();

    let board = boards.create_board("alice", "Launch", None).unwrap();
    let tag = boards.create_tag("alice", &board.id, "urgent", "#ef4444").unwrap();

    assert!(env.storage.tag_file(&tag.id).exists());
    let board = boards.get_board("alice", &board.id).unwrap();
    assert_eq!(board.tags, vec![tag.id.clone()]);

    let tags = boards.get_tags("alice", &board.id).unwrap();
    assert_eq!(tags.len(), 1);
    assert_eq!(tags[0].title, "urgent");
}

#[test]
fn tasks_may_only_reference_board_tags() {
    let env = TestEnv::with_users(&["alice"]);
    let boards = env.boards();

    let board = boards.create_board("alice", "Launch", None).unwrap();
    let board = boards.create_column("alice", &board.id, "todo").unwrap();
    let todo = board.columns[0].id.clone();

    let err = boards
        .create_task(
            "alice",
            &board.id,
            &todo,
            NewBoardTask {
                title: "a".to_string(),
                tag_ids: vec!["tag_bogus".to_string()],
                ..Default::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, Error::Conflict(_)));
}

#[test]
fn deleting_a_tag_prunes_every_reference() {
    let env = TestEnv::with_users(&["alice"]);
    let boards = env.boards();

    let board = boards.create_board("alice", "Launch", None).unwrap();
    let board = boards.create_column("alice", &board.id, "todo").unwrap();
    let todo = board.columns[0].id.clone();

    let urgent = boards.create_tag("alice", &board.id, "urgent", "#ef4444").unwrap();
    let later = boards.create_tag("alice", &board.id, "later", "#3b82f6").unwrap();

    boards
        .create_task(
            "alice",
            &board.id,
            &todo,
            NewBoardTask {
                title: "a".to_string(),
                tag_ids: vec![urgent.id.clone(), later.id.clone()],
                ..Default::default()
            },
        )
        .unwrap();
    boards
        .create_task(
            "alice",
            &board.id,
            &todo,
            NewBoardTask {
                title: "b".to_string(),
                tag_ids: vec![urgent.id.clone()],
                ..Default::default()
            },
        )
        .unwrap();

    let board = boards.delete_tag("alice", &board.id, &urgent.id).unwrap();

    assert_eq!(board.tags, vec![later.id.clone()]);
    assert!(!env.storage.tag_file(&urgent.id).exists());
    for task in &board.columns[0].tasks {
        assert!(!task.tag_ids.contains(&urgent.id));
    }
    // The other tag survives on the first task.
    assert!(board.columns[0].tasks[0].tag_ids.contains(&later.id));
}

#[test]
fn tag_updates_are_visible_through_the_board() {
    let env = TestEnv::with_users(&["alice"]);
    let boards = env.boards();

    let board = boards.create_board("alice", "Launch", None).unwrap();
    let tag = boards.create_tag("alice", &board.id, "urgent", "#ef4444").unwrap();

    let tag = boards
        .update_tag(
            "alice",
            &board.id,
            &tag.id,
            TagPatch {
                title: Some("blocking".to_string()),
                color: None,
            },
        )
        .unwrap();
    assert_eq!(tag.title, "blocking");
    assert_eq!(tag.color, "#ef4444");

    let tags = boards.get_tags("alice", &board.id).unwrap();
    assert_eq!(tags[0].title, "blocking");
}

#[test]
fn tag_from_another_board_is_rejected() {
    let env = TestEnv::with_users(&["alice"]);
    let boards = env.boards();

    let first = boards.create_board("alice", "Launch", None).unwrap();
    let second = boards.create_board("alice", "Ops", None).unwrap();
    let foreign = boards.create_tag("alice", &second.id, "ops", "#10b981").unwrap();

    let first = boards.create_column("alice", &first.id, "todo").unwrap();
    let todo = first.columns[0].id.clone();
    let first = boards
        .create_task(
            "alice",
            &first.id,
            &todo,
            NewBoardTask {
                title: "a".to_string(),
                ..Default::default()
            },
        )
        .unwrap();
    let task = first.columns[0].tasks[0].id.clone();

    let err = boards
        .update_task(
            "alice",
            &first.id,
            &todo,
            &task,
            BoardTaskPatch {
                tag_ids: Some(vec![foreign.id.clone()]),
                ..Default::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, Error::Conflict(_)));
}

#[test]
fn deleting_a_board_deletes_its_tag_entities() {
    let env = TestEnv::with_users(&["alice"]);
    let boards = env.boards();

    let board = boards.create_board("alice", "Launch", None).unwrap();
    let tag = boards.create_tag("alice", &board.id, "urgent", "#ef4444").unwrap();

    boards.delete_board("alice", &board.id).unwrap();
    assert!(!env.storage.tag_file(&tag.id).exists());
    assert!(!env.storage.board_file(&board.id).exists());
}
