mod common;

use common::{MockConnector, test_params};
use mybridge::dispatch::Dispatcher;
use mybridge::protocol::{
    ClientMessage, ConnectPayload, ServerMessage, TableDataRequest,
};
use mybridge::session::{CredentialCache, SessionRegistry, SqlConnector};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

fn dispatcher(connector: Arc<MockConnector>) -> Dispatcher {
    let connector: Arc<dyn SqlConnector> = connector;
    Dispatcher::new(
        Arc::new(SessionRegistry::new(10)),
        Arc::new(CredentialCache::new()),
        connector,
    )
}

fn connect_msg(remember: bool) -> ClientMessage {
    ClientMessage::ConnectDatabase(ConnectPayload {
        params: test_params(),
        remember,
    })
}

#[tokio::test]
async fn commands_without_a_connection_emit_not_connected() {
    let dispatcher = dispatcher(MockConnector::new());
    let session = Uuid::new_v4();

    let reply = dispatcher
        .dispatch(session, ClientMessage::GetDatabases)
        .await;
    assert_eq!(
        reply,
        ServerMessage::Error {
            message: "No active database connection".to_string()
        }
    );
}

#[tokio::test]
async fn connect_then_introspect() {
    let connector = MockConnector::new();
    connector.stub_rows(
        "SHOW DATABASES",
        &["Database"],
        vec![vec![json!("app_db")], vec![json!("sys_db")]],
    );
    let dispatcher = dispatcher(connector);
    let session = Uuid::new_v4();

    let reply = dispatcher.dispatch(session, connect_msg(false)).await;
    match reply {
        ServerMessage::ConnectionSuccess { connection_id, .. } => {
            assert_eq!(connection_id, session.to_string());
        }
        other => panic!("expected connection_success, got {other:?}"),
    }

    let reply = dispatcher
        .dispatch(session, ClientMessage::GetDatabases)
        .await;
    assert_eq!(
        reply,
        ServerMessage::DatabasesList(vec!["app_db".to_string(), "sys_db".to_string()])
    );
}

#[tokio::test]
async fn failed_connect_emits_connection_error_and_binds_nothing() {
    let connector = MockConnector::new();
    connector.fail_all_opens("access denied");
    let dispatcher = dispatcher(connector);
    let session = Uuid::new_v4();

    let reply = dispatcher.dispatch(session, connect_msg(false)).await;
    match reply {
        ServerMessage::ConnectionError { message } => {
            assert!(message.contains("access denied"));
        }
        other => panic!("expected connection_error, got {other:?}"),
    }
    assert!(dispatcher.registry().lookup(&session).is_none());
}

#[tokio::test]
async fn reconnect_replaces_the_previous_handle() {
    let connector = MockConnector::new();
    let dispatcher = dispatcher(connector.clone());
    let session = Uuid::new_v4();

    dispatcher.dispatch(session, connect_msg(false)).await;
    let first = dispatcher.registry().lookup(&session).unwrap();
    dispatcher.dispatch(session, connect_msg(false)).await;
    let second = dispatcher.registry().lookup(&session).unwrap();

    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(dispatcher.registry().active_sessions(), 1);
    // The displaced handle released its underlying session
    assert_eq!(connector.closed_sessions(), 1);
}

#[tokio::test]
async fn table_data_echoes_the_request_shape() {
    let connector = MockConnector::new();
    connector.stub_rows(
        "SELECT COUNT(*) AS total FROM `app_db`.`users`",
        &["total"],
        vec![vec![json!(1)]],
    );
    connector.stub_rows(
        "SELECT * FROM `app_db`.`users` LIMIT 25 OFFSET 50",
        &["id"],
        vec![vec![json!(51)]],
    );
    let dispatcher = dispatcher(connector);
    let session = Uuid::new_v4();
    dispatcher.dispatch(session, connect_msg(false)).await;

    let reply = dispatcher
        .dispatch(
            session,
            ClientMessage::GetTableData(TableDataRequest {
                database: "app_db".to_string(),
                table: "users".to_string(),
                limit: 25,
                offset: 50,
                sort_column: None,
                sort_direction: None,
                search_column: None,
                search_value: None,
            }),
        )
        .await;
    match reply {
        ServerMessage::TableData(data) => {
            assert_eq!(data.database, "app_db");
            assert_eq!(data.limit, 25);
            assert_eq!(data.offset, 50);
            assert_eq!(data.total, 1);
            assert_eq!(data.data[0]["id"], json!(51));
        }
        other => panic!("expected table_data, got {other:?}"),
    }
}

#[tokio::test]
async fn query_failures_emit_query_execution_error() {
    let connector = MockConnector::new();
    connector.stub_fail("SELECT broken", "bad query");
    let dispatcher = dispatcher(connector);
    let session = Uuid::new_v4();
    dispatcher.dispatch(session, connect_msg(false)).await;

    let reply = dispatcher
        .dispatch(
            session,
            ClientMessage::ExecuteQuery {
                database: None,
                query: "SELECT broken".to_string(),
            },
        )
        .await;
    match reply {
        ServerMessage::QueryExecutionError {
            database,
            query,
            message,
        } => {
            assert_eq!(database, None);
            assert_eq!(query, "SELECT broken");
            assert!(message.contains("bad query"));
        }
        other => panic!("expected query_execution_error, got {other:?}"),
    }
}

#[tokio::test]
async fn disconnect_empties_the_registry() {
    let connector = MockConnector::new();
    let dispatcher = dispatcher(connector);
    let session = Uuid::new_v4();
    dispatcher.dispatch(session, connect_msg(false)).await;
    assert!(dispatcher.registry().lookup(&session).is_some());

    let reply = dispatcher
        .dispatch(session, ClientMessage::DisconnectDatabase)
        .await;
    assert_eq!(
        reply,
        ServerMessage::DisconnectionSuccess {
            message: "Database disconnected successfully".to_string()
        }
    );
    assert!(dispatcher.registry().lookup(&session).is_none());

    // A follow-up command now reports the missing connection
    let reply = dispatcher
        .dispatch(session, ClientMessage::GetDatabases)
        .await;
    assert!(matches!(reply, ServerMessage::Error { .. }));
}

#[tokio::test]
async fn remembered_credentials_survive_until_logout() {
    let connector = MockConnector::new();
    let dispatcher = dispatcher(connector);
    let session = Uuid::new_v4();

    dispatcher.dispatch(session, connect_msg(true)).await;
    let reply = dispatcher
        .dispatch(session, ClientMessage::GetCachedCredentials)
        .await;
    match reply {
        ServerMessage::CachedCredentials { params: Some(params) } => {
            assert_eq!(params.host, "db.test");
            // The echo never carries the password
            assert_eq!(params.password, "");
        }
        other => panic!("expected cached credentials, got {other:?}"),
    }

    let reply = dispatcher.dispatch(session, ClientMessage::Logout).await;
    assert!(matches!(reply, ServerMessage::LogoutSuccess { .. }));
    let reply = dispatcher
        .dispatch(session, ClientMessage::GetCachedCredentials)
        .await;
    assert_eq!(reply, ServerMessage::CachedCredentials { params: None });
}

#[tokio::test]
async fn transport_session_end_tears_everything_down() {
    let connector = MockConnector::new();
    let dispatcher = dispatcher(connector.clone());
    let session = Uuid::new_v4();
    dispatcher.dispatch(session, connect_msg(true)).await;

    dispatcher.session_closed(session).await;

    assert!(dispatcher.registry().lookup(&session).is_none());
    assert_eq!(connector.closed_sessions(), 1);
    let reply = dispatcher
        .dispatch(session, ClientMessage::GetCachedCredentials)
        .await;
    assert_eq!(reply, ServerMessage::CachedCredentials { params: None });
}

#[tokio::test]
async fn delete_selected_without_a_column_is_rejected() {
    let connector = MockConnector::new();
    let dispatcher = dispatcher(connector.clone());
    let session = Uuid::new_v4();
    dispatcher.dispatch(session, connect_msg(false)).await;

    let reply = dispatcher
        .dispatch(
            session,
            ClientMessage::DeleteSelectedData(mybridge::protocol::DeleteSelectedRequest {
                database: "app_db".to_string(),
                table: "users".to_string(),
                target_column: None,
                target_values: vec![],
            }),
        )
        .await;
    match reply {
        ServerMessage::Error { message } => {
            assert!(message.contains("No target column"));
        }
        other => panic!("expected error, got {other:?}"),
    }
}
