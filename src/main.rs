use log::info;
use patchbay::constants::server as server_constants;
use patchbay::dispatch::{Command, DispatchConfig, Dispatcher};
use patchbay::engine::Engine;
use patchbay::server::Server;
use serde_json::json;
use std::env;
use std::net::SocketAddr;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut engine = Engine::new()?;
    seed_graph(&mut engine)?;

    let port = env::var(server_constants::PORT_ENV)
        .ok()
        .and_then(|v| v.parse::<u16>().ok())
        .unwrap_or(server_constants::DEFAULT_PORT);
    let addr: SocketAddr = format!("127.0.0.1:{port}").parse()?;

    let dispatcher = Dispatcher::spawn(engine, DispatchConfig::default());
    let server = Server::bind(addr)?;
    info!("ready on port {port}");
    server.run(dispatcher)?;
    Ok(())
}

/// Create the standing nodes every session starts with and mark the
/// control node undeletable, along with any operator-supplied paths.
fn seed_graph(engine: &mut Engine) -> Result<(), patchbay::EngineError> {
    engine.execute(Command::parse(
        "create",
        &json!({"type": "container", "name": "project"}),
    )?)?;
    engine.execute(Command::parse(
        "create",
        &json!({"type": "text", "family": "data", "name": "server"}),
    )?)?;
    engine.protect("/server");

    if let Ok(extra) = env::var(server_constants::PROTECTED_ENV) {
        for path in extra.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            engine.protect(path);
        }
    }
    Ok(())
}
