mod common;

use common::{SERVICE, descriptor, echo, server};
use serde_json::json;
use sipahi::{
    BoundAddress, CallError, Code, ConfigError, ListenOptions, Metadata, Phase, PhaseHook,
    RegistryError, Server, ServerConfig, ServerError, ServiceDescriptor, ToStatus, Transport,
    TransportOptions,
    hooks::LoggingHook,
    testing::{CountingHandler, MemoryTransport},
};

#[tokio::test]
async fn test_listen_defaults_host() {
    let (mut server, transport) = server();
    server.add_service(descriptor()).unwrap();

    let address = server.listen(ListenOptions::new(50051)).await.unwrap();

    assert_eq!(
        address,
        BoundAddress {
            host: "0.0.0.0".into(),
            port: 50051
        }
    );
    assert_eq!(transport.address(), Some(address.clone()));
    assert_eq!(server.local_address(), Some(&address));
    assert_eq!(address.to_string(), "0.0.0.0:50051");
}

#[tokio::test]
async fn test_listen_without_port_fails() {
    let (mut server, transport) = server();

    let err = server
        .listen(ListenOptions {
            host: Some("127.0.0.1".into()),
            port: None,
        })
        .await
        .unwrap_err();

    assert!(matches!(err, ServerError::Config(ConfigError::MissingPort)));
    assert!(transport.address().is_none());

    // A failed listen leaves the server configurable.
    server.bind_typed("Echo", echo).unwrap();
    server.listen(ListenOptions::new(9000)).await.unwrap();
}

#[tokio::test]
async fn test_config_reaches_transport() {
    let config: ServerConfig = serde_json::from_value(json!({
        "logger": {"enabled": false},
        "max_receive_message_length": 1024
    }))
    .unwrap();
    let transport = MemoryTransport::new();
    let mut server = Server::new(transport.clone(), config).unwrap();

    server
        .listen(ListenOptions::new(8080).with_host("localhost"))
        .await
        .unwrap();

    assert_eq!(
        transport.options(),
        TransportOptions {
            max_receive_message_length: Some(1024),
            max_send_message_length: None,
        }
    );
}

#[test]
fn test_invalid_log_level_rejected() {
    let config: ServerConfig =
        serde_json::from_value(json!({"logger": {"level": "chatty"}})).unwrap();
    let err = Server::new(MemoryTransport::new(), config).unwrap_err();
    assert!(matches!(
        err,
        ServerError::Config(ConfigError::InvalidLevel(_))
    ));
}

#[test]
fn test_duplicate_binding_keeps_first() {
    let (mut server, _transport) = server();
    let first = CountingHandler::echo();
    server.bind("Echo", first).unwrap();

    let err = server.bind("Echo", CountingHandler::echo()).unwrap_err();
    assert!(matches!(
        err,
        ServerError::Registry(RegistryError::DuplicateBinding(ref method)) if method == "Echo"
    ));
}

#[test]
fn test_add_hook_by_phase() {
    let (mut server, _transport) = server();
    server
        .add_hook(Phase::Request, PhaseHook::request(LoggingHook::new()))
        .unwrap()
        .add_hook("onError".parse().unwrap(), PhaseHook::error(LoggingHook::new()))
        .unwrap();

    let err = server
        .add_hook(Phase::Response, PhaseHook::error(LoggingHook::new()))
        .unwrap_err();
    assert!(matches!(
        err,
        ServerError::Registry(RegistryError::PhaseMismatch {
            expected: Phase::Response,
            found: Phase::Error
        })
    ));
}

#[tokio::test]
async fn test_setup_is_frozen_after_listen() {
    let (mut server, _transport) = server();
    server.listen(ListenOptions::new(50051)).await.unwrap();

    assert!(matches!(
        server.bind("Echo", CountingHandler::echo()),
        Err(ServerError::AlreadyListening)
    ));
    assert!(matches!(
        server.add_service(descriptor()),
        Err(ServerError::AlreadyListening)
    ));
    assert!(matches!(
        server.on_error(LoggingHook::new()),
        Err(ServerError::AlreadyListening)
    ));
    assert!(matches!(
        server.listen(ListenOptions::new(50052)).await,
        Err(ServerError::AlreadyListening)
    ));
}

#[tokio::test]
async fn test_duplicate_service_is_a_transport_error() {
    let (mut server, transport) = server();
    server
        .add_service(descriptor())
        .unwrap()
        .add_service(ServiceDescriptor::new(SERVICE))
        .unwrap();

    let err = server.listen(ListenOptions::new(50051)).await.unwrap_err();
    assert!(matches!(err, ServerError::Transport(_)));
    assert!(!server.is_listening());
    assert!(transport.services().is_empty());
}

#[tokio::test]
async fn test_failed_bind_withdraws_services_for_retry() {
    let (mut server, transport) = server();
    server
        .add_service(descriptor())
        .unwrap()
        .bind_typed("Echo", echo)
        .unwrap();

    let mut occupant = transport.clone();
    occupant
        .bind("0.0.0.0", 1, TransportOptions::default())
        .await
        .unwrap();

    let err = server.listen(ListenOptions::new(50051)).await.unwrap_err();
    assert!(matches!(err, ServerError::Transport(_)));
    assert!(!server.is_listening());
    assert!(transport.services().is_empty());

    occupant.shutdown().await.unwrap();
    server.listen(ListenOptions::new(50051)).await.unwrap();

    assert_eq!(transport.services(), [SERVICE]);
    let response = transport
        .call(SERVICE, "Echo", json!({"msg": "hi"}), Metadata::new())
        .await
        .unwrap();
    assert_eq!(response, json!({"msg": "hi"}));
}

#[tokio::test]
async fn test_close_stops_serving() {
    let (mut server, transport) = server();
    server
        .add_service(descriptor())
        .unwrap()
        .bind_typed("Echo", echo)
        .unwrap();
    server.listen(ListenOptions::new(50051)).await.unwrap();

    transport
        .call(SERVICE, "Echo", json!({"msg": "hi"}), Metadata::new())
        .await
        .unwrap();

    server.close().await.unwrap();
    assert!(transport.is_shut_down());
    assert!(!server.is_listening());
    let err = transport
        .call(SERVICE, "Echo", json!({"msg": "hi"}), Metadata::new())
        .await
        .unwrap_err();
    assert!(matches!(err, CallError::Unavailable(_)));
    assert_eq!(err.to_status().code(), Code::Unavailable);
    assert!(matches!(server.close().await, Err(ServerError::Closed)));
}

#[tokio::test]
async fn test_services_share_one_pipeline() {
    let handler = CountingHandler::echo();
    let (mut server, transport) = server();
    server
        .add_service(ServiceDescriptor::new("A").with_method("Ping"))
        .unwrap()
        .add_service(ServiceDescriptor::new("B").with_method("Ping"))
        .unwrap()
        .bind("Ping", handler.clone())
        .unwrap();
    server.listen(ListenOptions::new(50051)).await.unwrap();

    assert_eq!(transport.services(), ["A", "B"]);
    transport
        .call("A", "Ping", json!(1), Metadata::new())
        .await
        .unwrap();
    transport
        .call("B", "Ping", json!(2), Metadata::new())
        .await
        .unwrap();
    assert_eq!(handler.count(), 2);
}
