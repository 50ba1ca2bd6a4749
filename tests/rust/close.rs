// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

mod common;

//======================================================================================================================
// Imports
//======================================================================================================================

use ::anyhow::Result;
use ::netclose::{
    close,
    close_with,
    ensure_eq,
    ensure_neq,
    net::{
        flags::EventFlags,
        loopback::{
            Delivery,
            EngineCall,
            ScriptedEvent,
        },
    },
    runtime::config::Config,
    CloseOptions,
    DescriptorTable,
    Fail,
    LoopbackEngine,
    NetworkEngine,
    QDesc,
    QType,
    SharedSocket,
    SocketTable,
};
use common::sockets::{
    is_hooked,
    open_socket,
};
use std::{
    sync::Arc,
    thread::{
        self,
        JoinHandle,
    },
    time::{
        Duration,
        Instant,
    },
};

//======================================================================================================================
// Constants
//======================================================================================================================

/// Upper bound on how long a test waits for the closing task to reach its blocking point.
const SETUP_TIMEOUT: Duration = Duration::from_secs(10);

//======================================================================================================================
// Helper Functions
//======================================================================================================================

/// Waits until the closing task has installed its event hooks on the connection of `socket`.
fn wait_until_hooked(socket: &SharedSocket) -> Result<()> {
    let start: Instant = Instant::now();
    while !is_hooked(socket) {
        if start.elapsed() > SETUP_TIMEOUT {
            anyhow::bail!("close() did not install its event hooks");
        }
        thread::sleep(Duration::from_millis(1));
    }
    Ok(())
}

//======================================================================================================================
// Stream Sockets
//======================================================================================================================

/// A connected stream socket is closed once the peer closes, dropping the data that arrives in the meantime.
#[test]
fn close_connected_stream_socket() -> Result<()> {
    common::setup();
    let engine: LoopbackEngine = LoopbackEngine::new();
    let table: SocketTable = SocketTable::new();
    let (socket, qd): (SharedSocket, QDesc) = open_socket(&engine, &table, QType::Stream, true);
    let id: u32 = socket.connection().id();
    ensure_neq!(table.lookup(qd).map(|s| s.refcount()), None);
    engine.script(
        socket.connection(),
        vec![
            ScriptedEvent::newdata(b"first"),
            ScriptedEvent::newdata(b"second"),
            ScriptedEvent::close(),
        ],
    );

    ensure_eq!(close(&table, &engine, qd).is_ok(), true);
    engine.join();

    ensure_eq!(
        engine.calls(),
        vec![
            EngineCall::StopListening(id),
            EngineCall::NotifyDriver(id),
            EngineCall::FreeStream(id),
        ]
    );
    ensure_eq!(
        engine.deliveries(),
        vec![
            Delivery {
                conn: id,
                flags_in: EventFlags::NEWDATA,
                flags_out: EventFlags::CLOSE,
                payload_len: 0,
            },
            Delivery {
                conn: id,
                flags_in: EventFlags::NEWDATA,
                flags_out: EventFlags::CLOSE,
                payload_len: 0,
            },
            Delivery {
                conn: id,
                flags_in: EventFlags::CLOSE,
                flags_out: EventFlags::CLOSE,
                payload_len: 0,
            },
        ]
    );
    ensure_eq!(is_hooked(&socket), false);
    ensure_eq!(socket.is_connected(), false);
    ensure_eq!(socket.connection().critical_section(|cb| cb.is_freed()), true);
    ensure_eq!(table.lookup(qd).is_none(), true);

    Ok(())
}

/// An abort from the peer completes the close just like a regular close does.
#[test]
fn close_stream_socket_on_abort() -> Result<()> {
    common::setup();
    let engine: LoopbackEngine = LoopbackEngine::new();
    let table: SocketTable = SocketTable::new();
    let (socket, qd): (SharedSocket, QDesc) = open_socket(&engine, &table, QType::Stream, true);
    engine.script(socket.connection(), vec![ScriptedEvent::abort()]);

    ensure_eq!(close(&table, &engine, qd).is_ok(), true);
    engine.join();

    ensure_eq!(is_hooked(&socket), false);
    ensure_eq!(table.is_empty(), true);
    ensure_eq!(
        engine.deliveries().iter().map(|d| d.flags_out).collect::<Vec<EventFlags>>(),
        vec![EventFlags::ABORT]
    );

    Ok(())
}

/// The closing task stays blocked through transient events and resumes on the terminal one.
#[test]
fn close_blocks_until_terminal_event() -> Result<()> {
    common::setup();
    let engine: Arc<LoopbackEngine> = Arc::new(LoopbackEngine::new());
    let table: Arc<SocketTable> = Arc::new(SocketTable::new());
    let (socket, qd): (SharedSocket, QDesc) = open_socket(&engine, &table, QType::Stream, true);

    let closer: JoinHandle<Result<(), Fail>> = {
        let engine: Arc<LoopbackEngine> = engine.clone();
        let table: Arc<SocketTable> = table.clone();
        thread::spawn(move || close(&*table, &*engine, qd))
    };
    wait_until_hooked(&socket)?;

    for payload in [&b"late"[..], &b"later"[..]] {
        let flags: EventFlags = engine.deliver_now(socket.connection(), ScriptedEvent::newdata(payload));
        ensure_eq!(flags.contains(EventFlags::NEWDATA), false);
        ensure_eq!(flags.contains(EventFlags::CLOSE), true);
        ensure_eq!(is_hooked(&socket), true);
        ensure_eq!(table.lookup(qd).is_some(), true);
    }
    ensure_eq!(
        engine.deliveries().iter().map(|d| d.payload_len).collect::<Vec<usize>>(),
        vec![0, 0]
    );

    engine.deliver_now(socket.connection(), ScriptedEvent::close());
    let result: Result<(), Fail> = match closer.join() {
        Ok(result) => result,
        Err(_) => anyhow::bail!("closing task panicked"),
    };
    ensure_eq!(result.is_ok(), true);
    ensure_eq!(is_hooked(&socket), false);
    ensure_eq!(table.lookup(qd).is_none(), true);
    ensure_eq!(engine.calls().last().copied(), Some(EngineCall::FreeStream(socket.connection().id())));

    Ok(())
}

/// An unconnected stream socket is freed without notifying the driver.
#[test]
fn close_unconnected_stream_socket() -> Result<()> {
    common::setup();
    let engine: LoopbackEngine = LoopbackEngine::new();
    let table: SocketTable = SocketTable::new();
    let (socket, qd): (SharedSocket, QDesc) = open_socket(&engine, &table, QType::Stream, false);
    let id: u32 = socket.connection().id();

    ensure_eq!(close(&table, &engine, qd).is_ok(), true);

    ensure_eq!(engine.calls(), vec![EngineCall::StopListening(id), EngineCall::FreeStream(id)]);
    ensure_eq!(is_hooked(&socket), false);

    Ok(())
}

/// A linger deadline bounds the wait on an unresponsive peer.
#[test]
fn close_with_linger_deadline() -> Result<()> {
    common::setup();
    let engine: LoopbackEngine = LoopbackEngine::new();
    let table: SocketTable = SocketTable::new();
    let (socket, qd): (SharedSocket, QDesc) = open_socket(&engine, &table, QType::Stream, true);
    let options: CloseOptions = CloseOptions {
        linger: Some(Duration::from_millis(50)),
    };

    ensure_eq!(close_with(&table, &engine, qd, &options).is_ok(), true);

    ensure_eq!(is_hooked(&socket), false);
    ensure_eq!(socket.is_connected(), false);
    ensure_eq!(socket.connection().critical_section(|cb| cb.is_freed()), true);
    ensure_eq!(table.is_empty(), true);

    Ok(())
}

/// Close options may come from a configuration file.
#[test]
fn close_with_configured_linger() -> Result<()> {
    common::setup();
    let yaml: &str = "tcp_socket_options:\n  linger:\n    enabled: true\n    time_seconds: 0\n";
    let config: Config = match yaml.parse::<Config>() {
        Ok(config) => config,
        Err(e) => anyhow::bail!("failed to parse configuration: {:?}", e),
    };
    let options: CloseOptions = match config.close_options() {
        Ok(options) => options,
        Err(e) => anyhow::bail!("failed to read close options: {:?}", e),
    };
    ensure_eq!(options.linger, Some(Duration::ZERO));

    let engine: LoopbackEngine = LoopbackEngine::new();
    let table: SocketTable = SocketTable::new();
    let (socket, qd): (SharedSocket, QDesc) = open_socket(&engine, &table, QType::Stream, true);

    ensure_eq!(close_with(&table, &engine, qd, &options).is_ok(), true);
    ensure_eq!(is_hooked(&socket), false);

    Ok(())
}

//======================================================================================================================
// Datagram Sockets
//======================================================================================================================

/// A datagram socket is freed right away, whatever its connected flag says.
#[test]
fn close_datagram_socket() -> Result<()> {
    common::setup();
    for connected in [false, true] {
        let engine: LoopbackEngine = LoopbackEngine::new();
        let table: SocketTable = SocketTable::new();
        let (socket, qd): (SharedSocket, QDesc) = open_socket(&engine, &table, QType::Datagram, connected);
        engine.script(socket.connection(), vec![ScriptedEvent::newdata(b"ignored")]);

        ensure_eq!(close(&table, &engine, qd).is_ok(), true);

        ensure_eq!(engine.calls(), vec![EngineCall::FreeDatagram(socket.connection().id())]);
        ensure_eq!(engine.deliveries(), Vec::<Delivery>::new());
        ensure_eq!(is_hooked(&socket), false);
        ensure_eq!(table.lookup(qd).is_none(), true);
    }

    Ok(())
}

//======================================================================================================================
// Bad Descriptors
//======================================================================================================================

/// Closing a bad descriptor fails and changes nothing.
#[test]
fn close_bad_descriptors() -> Result<()> {
    common::setup();
    let engine: LoopbackEngine = LoopbackEngine::new();
    let table: SocketTable = SocketTable::new();
    let (raw, raw_qd): (SharedSocket, QDesc) = open_socket(&engine, &table, QType::Raw, false);
    let (stream, stream_qd): (SharedSocket, QDesc) = open_socket(&engine, &table, QType::Stream, false);

    // Unknown descriptor.
    let e: Fail = match close(&table, &engine, QDesc::from(42u32)) {
        Ok(()) => anyhow::bail!("close() should fail on an unknown descriptor"),
        Err(e) => e,
    };
    ensure_eq!(e.is_invalid_descriptor(), true);

    // Unsupported protocol type.
    ensure_eq!(close(&table, &engine, raw_qd).map_err(|e| e.errno), Err(libc::EBADF));
    ensure_eq!(raw.refcount(), 1);

    ensure_eq!(engine.calls(), Vec::<EngineCall>::new());
    ensure_eq!(table.len(), 2);

    // A descriptor is gone after its last close.
    ensure_eq!(close(&table, &engine, stream_qd).is_ok(), true);
    ensure_eq!(close(&table, &engine, stream_qd).map_err(|e| e.errno), Err(libc::EBADF));
    ensure_eq!(stream.refcount(), 0);
    ensure_eq!(table.len(), 1);

    Ok(())
}

//======================================================================================================================
// Trait Objects
//======================================================================================================================

/// The descriptor table and the engine may be handed in as trait objects.
#[test]
fn close_through_trait_objects() -> Result<()> {
    common::setup();
    let engine: LoopbackEngine = LoopbackEngine::new();
    let table: SocketTable = SocketTable::new();
    let (socket, qd): (SharedSocket, QDesc) = open_socket(&engine, &table, QType::Stream, true);
    engine.script(socket.connection(), vec![ScriptedEvent::close()]);

    let table_ref: &dyn DescriptorTable = &table;
    let engine_ref: &dyn NetworkEngine = &engine;
    ensure_eq!(close(table_ref, engine_ref, qd).is_ok(), true);
    engine.join();

    ensure_eq!(is_hooked(&socket), false);
    ensure_eq!(table.is_empty(), true);

    Ok(())
}
