mod support;

use teamdeck::Error;

use support::TestEnv;

#[test]
fn owner_is_sole_member_on_creation() {
    let env = TestEnv::with_users(&["alice"]);
    let boards = env.boards();

    let board = boards.create_board("alice", "Launch", None).unwrap();
    assert_eq!(board.owner_id, "alice");
    assert_eq!(board.member_ids, vec!["alice".to_string()]);
    assert!(board.columns.is_empty());
}

#[test]
fn non_member_lookup_reports_not_found() {
    let env = TestEnv::with_users(&["alice", "mallory"]);
    let boards = env.boards();

    let board = boards.create_board("alice", "Launch", None).unwrap();
    let err = boards.get_board("mallory", &board.id).unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[test]
fn duplicate_member_is_a_conflict() {
    let env = TestEnv::with_users(&["alice", "bob"]);
    let boards = env.boards();

    let board = boards.create_board("alice", "Launch", None).unwrap();
    boards.add_member("alice", &board.id, "bob").unwrap();
    let err = boards.add_member("alice", &board.id, "bob").unwrap_err();
    assert!(matches!(err, Error::Conflict(_)));
}

#[test]
fn unregistered_member_is_not_found() {
    let env = TestEnv::with_users(&["alice"]);
    let boards = env.boards();

    let board = boards.create_board("alice", "Launch", None).unwrap();
    let err = boards.add_member("alice", &board.id, "ghost").unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[test]
fn only_the_owner_can_invite() {
    let env = TestEnv::with_users(&["alice", "bob", "carol"]);
    let boards = env.boards();

    let board = boards.create_board("alice", "Launch", None).unwrap();
    boards.add_member("alice", &board.id, "bob").unwrap();

    let err = boards.add_member("bob", &board.id, "carol").unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[test]
fn owner_cannot_be_removed_or_leave() {
    let env = TestEnv::with_users(&["alice", "bob"]);
    let boards = env.boards();

    let board = boards.create_board("alice", "Launch", None).unwrap();
    boards.add_member("alice", &board.id, "bob").unwrap();

    let err = boards.remove_member("alice", &board.id, "alice").unwrap_err();
    assert!(matches!(err, Error::BadRequest(_)));

    let err = boards.leave("alice", &board.id).unwrap_err();
    assert!(matches!(err, Error::BadRequest(_)));
}

#[test]
fn member_capacity_is_enforced() {
    let mut env = TestEnv::init();
    env.config.limits.max_members = 2;
    env.storage.add_user("alice", "alice").unwrap();
    env.storage.add_user("bob", "bob").unwrap();
    env.storage.add_user("carol", "carol").unwrap();
    let boards = env.boards();

    let board = boards.create_board("alice", "Launch", None).unwrap();
    boards.add_member("alice", &board.id, "bob").unwrap();
    let err = boards.add_member("alice", &board.id, "carol").unwrap_err();
    assert!(matches!(err, Error::CapacityExceeded { .. }));
}

#[test]
fn columns_keep_dense_orders_through_reorder_and_delete() {
    let env = TestEnv::with_users(&["alice"]);
    let boards = env.boards();

    let board = boards.create_board("alice", "Launch", None).unwrap();
    for title in ["todo", "doing", "review", "done"] {
        boards.create_column("alice", &board.id, title).unwrap();
    }
    let board = boards.get_board("alice", &board.id).unwrap();
    let orders: Vec<usize> = board.columns.iter().map(|c| c.order).collect();
    assert_eq!(orders, vec![0, 1, 2, 3]);

    // Move "review" (order 2) to the front.
    let review = board.columns[2].id.clone();
    let board = boards
        .update_column(
            "alice",
            &board.id,
            &review,
            teamdeck::board::ColumnPatch {
                title: None,
                order: Some(0),
            },
        )
        .unwrap();
    let titles: Vec<&str> = {
        let mut cols: Vec<_> = board.columns.iter().collect();
        cols.sort_by_key(|c| c.order);
        cols.iter().map(|c| c.title.as_str()).collect()
    };
    assert_eq!(titles, vec!["review", "todo", "doing", "done"]);

    // Deleting closes the gap.
    let board = boards.delete_column("alice", &board.id, &review).unwrap();
    let mut orders: Vec<usize> = board.columns.iter().map(|c| c.order).collect();
    orders.sort_unstable();
    assert_eq!(orders, vec![0, 1, 2]);
}

#[test]
fn reorder_past_the_end_is_rejected() {
    let env = TestEnv::with_users(&["alice"]);
    let boards = env.boards();

    let board = boards.create_board("alice", "Launch", None).unwrap();
    boards.create_column("alice", &board.id, "todo").unwrap();
    let board = boards.create_column("alice", &board.id, "done").unwrap();

    let column = board.columns[0].id.clone();
    let err = boards
        .update_column(
            "alice",
            &board.id,
            &column,
            teamdeck::board::ColumnPatch {
                title: None,
                order: Some(2),
            },
        )
        .unwrap_err();
    assert!(matches!(err, Error::InvalidOrder { requested: 2, len: 2 }));
}

#[test]
fn move_task_keeps_both_columns_dense() {
    let env = TestEnv::with_users(&["alice"]);
    let boards = env.boards();

    let board = boards.create_board("alice", "Launch", None).unwrap();
    boards.create_column("alice", &board.id, "todo").unwrap();
    let board = boards.create_column("alice", &board.id, "doing").unwrap();
    let todo = board.columns[0].id.clone();
    let doing = board.columns[1].id.clone();

    for title in ["a", "b", "c"] {
        boards
            .create_task(
                "alice",
                &board.id,
                &todo,
                teamdeck::board::NewBoardTask {
                    title: title.to_string(),
                    ..Default::default()
                },
            )
            .unwrap();
    }
    boards
        .create_task(
            "alice",
            &board.id,
            &doing,
            teamdeck::board::NewBoardTask {
                title: "x".to_string(),
                ..Default::default()
            },
        )
        .unwrap();

    let board = boards.get_board("alice", &board.id).unwrap();
    // Move "b" (order 1 in todo) to the head of doing.
    let task_b = board.columns[0].tasks[1].id.clone();
    let board = boards
        .move_task("alice", &board.id, &todo, &doing, &task_b, Some(0))
        .unwrap();

    let todo_col = board.columns.iter().find(|c| c.id == todo).unwrap();
    let doing_col = board.columns.iter().find(|c| c.id == doing).unwrap();

    let todo_titles: Vec<&str> = todo_col.tasks.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(todo_titles, vec!["a", "c"]);
    assert_eq!(
        todo_col.tasks.iter().map(|t| t.order).collect::<Vec<_>>(),
        vec![0, 1]
    );

    let mut doing_sorted: Vec<_> = doing_col.tasks.iter().collect();
    doing_sorted.sort_by_key(|t| t.order);
    let doing_titles: Vec<&str> = doing_sorted.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(doing_titles, vec!["b", "x"]);
}

#[test]
fn move_task_to_same_column_is_a_bad_request() {
    let env = TestEnv::with_users(&["alice"]);
    let boards = env.boards();

    let board = boards.create_board("alice", "Launch", None).unwrap();
    let board = boards.create_column("alice", &board.id, "todo").unwrap();
    let todo = board.columns[0].id.clone();
    let board = boards
        .create_task(
            "alice",
            &board.id,
            &todo,
            teamdeck::board::NewBoardTask {
                title: "a".to_string(),
                ..Default::default()
            },
        )
        .unwrap();
    let task = board.columns[0].tasks[0].id.clone();

    let err = boards
        .move_task("alice", &board.id, &todo, &todo, &task, None)
        .unwrap_err();
    assert!(matches!(err, Error::BadRequest(_)));
}

#[test]
fn unknown_assignees_are_rejected() {
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
            teamdeck::board::NewBoardTask {
                title: "a".to_string(),
                assignee_ids: vec!["ghost".to_string()],
                ..Default::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[test]
fn task_capacity_per_column_is_enforced() {
    let mut env = TestEnv::init();
    env.config.limits.max_tasks_per_column = 2;
    env.storage.add_user("alice", "alice").unwrap();
    let boards = env.boards();

    let board = boards.create_board("alice", "Launch", None).unwrap();
    let board = boards.create_column("alice", &board.id, "todo").unwrap();
    let todo = board.columns[0].id.clone();

    for title in ["a", "b"] {
        boards
            .create_task(
                "alice",
                &board.id,
                &todo,
                teamdeck::board::NewBoardTask {
                    title: title.to_string(),
                    ..Default::default()
                },
            )
            .unwrap();
    }
    let err = boards
        .create_task(
            "alice",
            &board.id,
            &todo,
            teamdeck::board::NewBoardTask {
                title: "c".to_string(),
                ..Default::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, Error::CapacityExceeded { .. }));
}

#[test]
fn deleting_a_board_requires_ownership() {
    let env = TestEnv::with_users(&["alice", "bob"]);
    let boards = env.boards();

    let board = boards.create_board("alice", "Launch", None).unwrap();
    boards.add_member("alice", &board.id, "bob").unwrap();

    let err = boards.delete_board("bob", &board.id).unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));

    boards.delete_board("alice", &board.id).unwrap();
    assert!(boards.list_boards("alice").unwrap().is_empty());
}
