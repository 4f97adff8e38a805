//! Realtime session scenarios: joining, presence notifications, mutation
//! fan-out, mid-session revocation, and disconnects.

use std::net::SocketAddr;

use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use pantry_integration_tests::{TestContext, drain, principal};
use pantry_core::{ListId, Principal};
use pantry_server::error::AppError;
use pantry_server::realtime::{ServerEvent, hub};
use pantry_server::services::items::{self, ItemInput};
use pantry_server::services::lists::{self, ListInput};
use pantry_server::services::shares::{self, ShareInput};

async fn make_list(ctx: &TestContext, owner: &Principal) -> ListId {
    let list = lists::create_list(
        &ctx.state,
        owner,
        ListInput {
            name: "Groceries".to_owned(),
            description: None,
            auto_remove_after_secs: None,
        },
    )
    .await
    .expect("create list");
    list.id
}

async fn share_with(ctx: &TestContext, owner: &Principal, list_id: ListId, user: &Principal, can_edit: bool) {
    ctx.provision(user).await;
    shares::create_share(
        &ctx.state,
        owner,
        list_id,
        ShareInput {
            user_id: user.id,
            can_edit,
        },
    )
    .await
    .expect("create share");
}

fn item_input(name: &str) -> ItemInput {
    ItemInput {
        name: name.to_owned(),
        note: None,
        quantity: None,
        group_id: None,
    }
}

#[tokio::test]
async fn test_unauthorized_join_is_silent() {
    let ctx = TestContext::new();
    let owner = principal("Ada");
    let stranger = principal("Mallory");
    let list_id = make_list(&ctx, &owner).await;
    ctx.provision(&stranger).await;

    let (conn, mut rx) = ctx.connect(&stranger);
    hub::join(&ctx.state, conn, &stranger, &list_id.to_string()).await;

    assert!(drain(&mut rx).is_empty(), "no events for a rejected join");
    assert_eq!(ctx.state.presence().joined_list(conn), None);
}

#[tokio::test]
async fn test_join_notifies_room_and_snapshots_joiner() {
    let ctx = TestContext::new();
    let owner = principal("Ada");
    let member = principal("Grace");
    let list_id = make_list(&ctx, &owner).await;
    ctx.provision(&owner).await;
    share_with(&ctx, &owner, list_id, &member, false).await;

    let (owner_conn, mut owner_rx) = ctx.connect(&owner);
    hub::join(&ctx.state, owner_conn, &owner, &list_id.to_string()).await;

    // First into the room: a snapshot containing only themselves.
    let events = drain(&mut owner_rx);
    assert_eq!(events.len(), 1);
    let ServerEvent::ActiveUsers { users } = &events[0] else {
        panic!("expected active_users, got {events:?}");
    };
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].user_id, owner.id);

    let (member_conn, mut member_rx) = ctx.connect(&member);
    hub::join(&ctx.state, member_conn, &member, &list_id.to_string()).await;

    // Existing member sees the arrival.
    let events = drain(&mut owner_rx);
    assert_eq!(
        events,
        vec![ServerEvent::UserJoined {
            user_id: member.id,
            user_name: member.name.clone(),
        }]
    );

    // Joiner gets the snapshot, which already includes them.
    let events = drain(&mut member_rx);
    assert_eq!(events.len(), 1);
    let ServerEvent::ActiveUsers { users } = &events[0] else {
        panic!("expected active_users, got {events:?}");
    };
    let ids: Vec<_> = users.iter().map(|u| u.user_id).collect();
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&owner.id) && ids.contains(&member.id));
}

#[tokio::test]
async fn test_item_mutation_reaches_every_room_member() {
    let ctx = TestContext::new();
    let owner = principal("Ada");
    let editor = principal("Grace");
    let list_id = make_list(&ctx, &owner).await;
    ctx.provision(&owner).await;
    share_with(&ctx, &owner, list_id, &editor, true).await;

    let (owner_conn, mut owner_rx) = ctx.connect(&owner);
    hub::join(&ctx.state, owner_conn, &owner, &list_id.to_string()).await;
    let (editor_conn, mut editor_rx) = ctx.connect(&editor);
    hub::join(&ctx.state, editor_conn, &editor, &list_id.to_string()).await;
    drain(&mut owner_rx);
    drain(&mut editor_rx);

    let item = items::add_item(&ctx.state, &editor, list_id, item_input("Milk"))
        .await
        .expect("add item");

    // Everyone in the room hears about it, the mutating user included.
    let expected = ServerEvent::ItemAdded { item };
    assert_eq!(drain(&mut owner_rx), vec![expected.clone()]);
    assert_eq!(drain(&mut editor_rx), vec![expected]);
}

#[tokio::test]
async fn test_revocation_applies_at_the_next_mutation() {
    let ctx = TestContext::new();
    let owner = principal("Ada");
    let editor = principal("Grace");
    let list_id = make_list(&ctx, &owner).await;
    ctx.provision(&owner).await;
    share_with(&ctx, &owner, list_id, &editor, true).await;

    let (editor_conn, mut editor_rx) = ctx.connect(&editor);
    hub::join(&ctx.state, editor_conn, &editor, &list_id.to_string()).await;
    drain(&mut editor_rx);

    shares::delete_share(&ctx.state, &owner, list_id, editor.id)
        .await
        .expect("revoke share");

    // The next write is rejected...
    let err = items::add_item(&ctx.state, &editor, list_id, item_input("Eggs"))
        .await
        .expect_err("revoked editor must not write");
    assert!(matches!(err, AppError::Forbidden(_)), "got {err:?}");

    // ...but the live session stays in the room until it leaves on its own.
    assert_eq!(ctx.state.presence().joined_list(editor_conn), Some(list_id));
    let item = items::add_item(&ctx.state, &owner, list_id, item_input("Bread"))
        .await
        .expect("owner writes");
    assert_eq!(drain(&mut editor_rx), vec![ServerEvent::ItemAdded { item }]);
}

#[tokio::test]
async fn test_disconnect_emits_exactly_one_user_left() {
    let ctx = TestContext::new();
    let owner = principal("Ada");
    let member = principal("Grace");
    let list_id = make_list(&ctx, &owner).await;
    ctx.provision(&owner).await;
    share_with(&ctx, &owner, list_id, &member, false).await;

    let (owner_conn, mut owner_rx) = ctx.connect(&owner);
    hub::join(&ctx.state, owner_conn, &owner, &list_id.to_string()).await;
    let (member_conn, _member_rx) = ctx.connect(&member);
    hub::join(&ctx.state, member_conn, &member, &list_id.to_string()).await;
    drain(&mut owner_rx);

    hub::disconnect(&ctx.state, member_conn);
    // A racing explicit leave or repeated disconnect finds nothing left.
    hub::disconnect(&ctx.state, member_conn);

    assert_eq!(
        drain(&mut owner_rx),
        vec![ServerEvent::UserLeft {
            user_id: member.id,
            user_name: member.name.clone(),
        }]
    );
    assert_eq!(ctx.state.presence().connection_count(), 1);
}

#[tokio::test]
async fn test_joining_a_second_list_implicitly_leaves_the_first() {
    let ctx = TestContext::new();
    let owner = principal("Ada");
    let rover = principal("Grace");
    let first = make_list(&ctx, &owner).await;
    let second = make_list(&ctx, &owner).await;
    ctx.provision(&owner).await;
    share_with(&ctx, &owner, first, &rover, false).await;
    shares::create_share(
        &ctx.state,
        &owner,
        second,
        ShareInput {
            user_id: rover.id,
            can_edit: false,
        },
    )
    .await
    .expect("second share");

    let (owner_conn, mut owner_rx) = ctx.connect(&owner);
    hub::join(&ctx.state, owner_conn, &owner, &first.to_string()).await;
    let (rover_conn, mut rover_rx) = ctx.connect(&rover);
    hub::join(&ctx.state, rover_conn, &rover, &first.to_string()).await;
    drain(&mut owner_rx);
    drain(&mut rover_rx);

    hub::join(&ctx.state, rover_conn, &rover, &second.to_string()).await;

    assert_eq!(
        drain(&mut owner_rx),
        vec![ServerEvent::UserLeft {
            user_id: rover.id,
            user_name: rover.name.clone(),
        }]
    );
    assert_eq!(ctx.state.presence().joined_list(rover_conn), Some(second));
}

#[tokio::test]
async fn test_rejoining_the_same_list_resends_snapshot_without_a_join_event() {
    let ctx = TestContext::new();
    let owner = principal("Ada");
    let member = principal("Grace");
    let list_id = make_list(&ctx, &owner).await;
    ctx.provision(&owner).await;
    share_with(&ctx, &owner, list_id, &member, false).await;

    let (owner_conn, mut owner_rx) = ctx.connect(&owner);
    hub::join(&ctx.state, owner_conn, &owner, &list_id.to_string()).await;
    let (member_conn, mut member_rx) = ctx.connect(&member);
    hub::join(&ctx.state, member_conn, &member, &list_id.to_string()).await;
    drain(&mut owner_rx);
    drain(&mut member_rx);

    hub::join(&ctx.state, member_conn, &member, &list_id.to_string()).await;

    assert!(
        drain(&mut owner_rx).is_empty(),
        "repeat join must not re-announce"
    );
    let events = drain(&mut member_rx);
    assert_eq!(events.len(), 1);
    assert!(matches!(events[0], ServerEvent::ActiveUsers { .. }));
}

/// Opens a raw TCP connection and performs a WebSocket opening handshake,
/// returning the HTTP status line of the server's response.
async fn ws_handshake_status_line(addr: SocketAddr, token: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.expect("connect");
    let request = format!(
        "GET /ws?access_token={token} HTTP/1.1\r\n\
         Host: {addr}\r\n\
         Connection: Upgrade\r\n\
         Upgrade: websocket\r\n\
         Sec-WebSocket-Version: 13\r\n\
         Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n\
         \r\n"
    );
    stream
        .write_all(request.as_bytes())
        .await
        .expect("send handshake");
    let mut buf = [0u8; 1024];
    let n = stream.read(&mut buf).await.expect("read response");
    String::from_utf8_lossy(&buf[..n])
        .lines()
        .next()
        .expect("status line")
        .to_owned()
}

#[tokio::test]
async fn test_ws_handshake_checks_the_token() {
    let ctx = TestContext::new();
    let token = ctx.token(&principal("Ada"));

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let app = ctx.app();
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });

    let rejected = ws_handshake_status_line(addr, "not-a-jwt").await;
    assert!(rejected.starts_with("HTTP/1.1 401"), "got {rejected}");

    let accepted = ws_handshake_status_line(addr, &token).await;
    assert!(accepted.starts_with("HTTP/1.1 101"), "got {accepted}");
}

#[tokio::test]
async fn test_client_join_message_drives_the_same_path() {
    let ctx = TestContext::new();
    let owner = principal("Ada");
    let list_id = make_list(&ctx, &owner).await;
    ctx.provision(&owner).await;

    let (conn, mut rx) = ctx.connect(&owner);
    let message =
        serde_json::from_value(json!({"type": "join_list", "list_id": list_id.to_string()}))
            .expect("parse client message");
    hub::handle_message(&ctx.state, conn, &owner, message).await;

    let events = drain(&mut rx);
    assert_eq!(events.len(), 1);
    assert!(matches!(events[0], ServerEvent::ActiveUsers { .. }));
}
