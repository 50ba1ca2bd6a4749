// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

#![deny(clippy::all)]

//======================================================================================================================
// Imports
//======================================================================================================================

use ::anyhow::Result;
use ::clap::{
    Arg,
    ArgAction,
    ArgMatches,
    Command,
};
use ::netclose::{
    close_with,
    net::{
        conn::SharedConnection,
        loopback::ScriptedEvent,
    },
    runtime::{
        config::Config,
        logging,
    },
    CloseOptions,
    LoopbackEngine,
    QDesc,
    QType,
    SharedSocket,
    Socket,
    SocketTable,
};
use ::std::{
    sync::Arc,
    time::Duration,
};

//======================================================================================================================
// Program Arguments
//======================================================================================================================

#[derive(Debug)]
struct ProgramArguments {
    /// Type of the socket to close.
    qtype: QType,
    /// Whether the socket starts out connected.
    connected: bool,
    /// Events that the peer produces once the driver is notified.
    events: Vec<ScriptedEvent>,
    /// Close options.
    options: CloseOptions,
}

impl ProgramArguments {
    /// Parses the program arguments from the command line interface.
    fn new(app_name: &'static str, app_author: &'static str, app_about: &'static str) -> Result<Self> {
        let matches: ArgMatches = Command::new(app_name)
            .author(app_author)
            .about(app_about)
            .arg(
                Arg::new("type")
                    .long("type")
                    .value_parser(["stream", "datagram"])
                    .default_value("stream")
                    .help("Sets socket type"),
            )
            .arg(
                Arg::new("connected")
                    .long("connected")
                    .action(ArgAction::SetTrue)
                    .help("Starts with a connected socket"),
            )
            .arg(
                Arg::new("events")
                    .long("events")
                    .value_parser(clap::value_parser!(String))
                    .default_value("newdata,close")
                    .value_name("newdata|close|abort,...")
                    .help("Sets events that the peer sends while the socket closes"),
            )
            .arg(
                Arg::new("linger")
                    .long("linger-secs")
                    .value_parser(clap::value_parser!(u64))
                    .required(false)
                    .value_name("SECONDS")
                    .help("Sets how long to wait for the peer"),
            )
            .arg(
                Arg::new("config")
                    .long("config")
                    .value_parser(clap::value_parser!(String))
                    .required(false)
                    .value_name("FILE")
                    .help("Reads close options from a configuration file"),
            )
            .get_matches();

        let qtype: QType = match matches.get_one::<String>("type").map(String::as_str) {
            Some("datagram") => QType::Datagram,
            _ => QType::Stream,
        };

        let events: Vec<ScriptedEvent> = {
            let list: &String = matches
                .get_one::<String>("events")
                .ok_or_else(|| anyhow::anyhow!("missing events"))?;
            Self::parse_events(list)?
        };

        let mut options: CloseOptions = match matches.get_one::<String>("config") {
            Some(path) => Config::new(path)?.close_options()?,
            None => CloseOptions::default(),
        };
        if let Some(secs) = matches.get_one::<u64>("linger") {
            options.linger = Some(Duration::from_secs(*secs));
        }

        Ok(Self {
            qtype,
            connected: matches.get_flag("connected"),
            events,
            options,
        })
    }

    fn parse_events(list: &str) -> Result<Vec<ScriptedEvent>> {
        let mut events: Vec<ScriptedEvent> = Vec::new();
        for name in list.split(',').map(str::trim).filter(|name| !name.is_empty()) {
            let event: ScriptedEvent = match name {
                "newdata" => ScriptedEvent::newdata(b"payload"),
                "close" => ScriptedEvent::close(),
                "abort" => ScriptedEvent::abort(),
                _ => anyhow::bail!("invalid event {:?}", name),
            };
            events.push(event);
        }
        Ok(events)
    }
}

//======================================================================================================================
// main()
//======================================================================================================================

fn main() -> Result<()> {
    logging::initialize();
    let args: ProgramArguments = ProgramArguments::new(
        "close-demo",
        "Microsoft Corporation",
        "Closes a socket on a loopback network engine",
    )?;

    let engine: LoopbackEngine = LoopbackEngine::new();
    let table: SocketTable = SocketTable::new();
    let conn: SharedConnection = engine.open(args.qtype);
    let socket: SharedSocket = Arc::new(Socket::new(args.qtype, conn));
    socket.set_connected(args.connected);
    let qd: QDesc = table.alloc(socket.clone());

    // Without a terminal event or a deadline, close() would never return.
    let completes: bool = args.events.iter().any(|event: &ScriptedEvent| event.flags.is_terminal());
    if args.qtype == QType::Stream && args.connected && args.options.linger.is_none() && !completes {
        anyhow::bail!("a connected stream socket needs a close or abort event, or a linger deadline");
    }
    engine.script(socket.connection(), args.events);

    close_with(&table, &engine, qd, &args.options)?;
    engine.join();

    println!("engine calls:");
    for call in engine.calls() {
        println!("  {:?}", call);
    }
    println!("deliveries:");
    for delivery in engine.deliveries() {
        println!(
            "  {:?} -> {:?} (payload left: {})",
            delivery.flags_in, delivery.flags_out, delivery.payload_len
        );
    }

    Ok(())
}

