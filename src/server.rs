//! Line-delimited JSON transport
//!
//! One TCP connection per client, one thread per connection. Each request
//! line is `{"method": ..., "params": {...}}`; each response line carries
//! either a `result` payload or an `error` with a message and code.

use crate::dispatch::{canonical_method, Command, Dispatcher};
use crate::error::EngineError;
use log::{debug, info, warn};
use serde::Deserialize;
use serde_json::{json, Value};
use std::io::{self, BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::thread;

#[derive(Debug, Deserialize)]
struct Request {
    method: String,
    #[serde(default)]
    params: Value,
}

pub struct Server {
    listener: TcpListener,
}

impl Server {
    /// Bind the listener; port 0 picks a free port
    pub fn bind(addr: SocketAddr) -> io::Result<Self> {
        let listener = TcpListener::bind(addr)?;
        info!("listening on {}", listener.local_addr()?);
        Ok(Self { listener })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections forever, one handler thread each
    pub fn run(self, dispatcher: Dispatcher) -> io::Result<()> {
        for stream in self.listener.incoming() {
            match stream {
                Ok(stream) => {
                    let dispatcher = dispatcher.clone();
                    thread::spawn(move || {
                        let peer = stream
                            .peer_addr()
                            .map(|a| a.to_string())
                            .unwrap_or_else(|_| "?".to_string());
                        if let Err(err) = handle_connection(stream, &dispatcher) {
                            debug!("connection {peer} closed: {err}");
                        }
                    });
                }
                Err(err) => warn!("accept failed: {err}"),
            }
        }
        Ok(())
    }
}

fn handle_connection(stream: TcpStream, dispatcher: &Dispatcher) -> io::Result<()> {
    let reader = BufReader::new(stream.try_clone()?);
    let mut writer = stream;
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let response = handle_line(&line, dispatcher);
        writer.write_all(response.to_string().as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
    }
    Ok(())
}

fn handle_line(line: &str, dispatcher: &Dispatcher) -> Value {
    let request: Request = match serde_json::from_str(line) {
        Ok(r) => r,
        Err(err) => {
            return error_response(&EngineError::InvalidArguments(format!(
                "malformed request: {err}"
            )))
        }
    };
    // Status is answered here; everything else crosses to the worker
    if canonical_method(&request.method) == "status" {
        return json!({"result": status_payload()});
    }
    let command = match Command::parse(&request.method, &request.params) {
        Ok(c) => c,
        Err(err) => return error_response(&err),
    };
    match dispatcher.submit(command) {
        Ok(result) => json!({"result": result}),
        Err(err) => error_response(&err),
    }
}

fn error_response(err: &EngineError) -> Value {
    json!({"error": {"message": err.to_string(), "code": err.code()}})
}

fn status_payload() -> Value {
    json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "methods": [
            "create", "delete", "set", "set_many", "connect", "connect_chain",
            "auto_connect", "disconnect", "rename", "ensure_inputs", "layout",
            "build_workflow", "list", "get", "list_properties", "list_types",
            "history", "status",
        ],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::DispatchConfig;
    use crate::engine::Engine;

    fn start_server() -> SocketAddr {
        let engine = Engine::new().unwrap();
        let dispatcher = Dispatcher::spawn(engine, DispatchConfig::default());
        let server = Server::bind("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = server.local_addr().unwrap();
        thread::spawn(move || server.run(dispatcher));
        addr
    }

    fn round_trip(stream: &mut TcpStream, request: Value) -> Value {
        stream
            .write_all(format!("{request}\n").as_bytes())
            .unwrap();
        let mut reader = BufReader::new(stream.try_clone().unwrap());
        let mut line = String::new();
        reader.read_line(&mut line).unwrap();
        serde_json::from_str(&line).unwrap()
    }

    #[test]
    fn test_request_response_over_tcp() {
        let addr = start_server();
        let mut stream = TcpStream::connect(addr).unwrap();

        let response = round_trip(
            &mut stream,
            json!({"method": "create", "params": {"type": "noise"}}),
        );
        assert_eq!(response["result"]["path"], "/noise1");

        // Alias spelling reaches the same command
        let response = round_trip(
            &mut stream,
            json!({"method": "getNode", "params": {"path": "/noise1"}}),
        );
        assert_eq!(response["result"]["type"], "noiseFx");
    }

    #[test]
    fn test_errors_carry_message_and_code() {
        let addr = start_server();
        let mut stream = TcpStream::connect(addr).unwrap();

        let response = round_trip(
            &mut stream,
            json!({"method": "get", "params": {"path": "/missing"}}),
        );
        assert_eq!(response["error"]["code"], -32002);
        assert!(response["error"]["message"]
            .as_str()
            .unwrap()
            .contains("/missing"));

        let response = round_trip(&mut stream, json!({"method": "explode"}));
        assert_eq!(response["error"]["code"], -32000);

        let mut raw = TcpStream::connect(addr).unwrap();
        raw.write_all(b"not json\n").unwrap();
        let mut reader = BufReader::new(raw.try_clone().unwrap());
        let mut line = String::new();
        reader.read_line(&mut line).unwrap();
        let response: Value = serde_json::from_str(&line).unwrap();
        assert!(response["error"]["message"]
            .as_str()
            .unwrap()
            .contains("malformed"));
    }

    #[test]
    fn test_status_answers_without_touching_the_worker() {
        let addr = start_server();
        let mut stream = TcpStream::connect(addr).unwrap();
        let response = round_trip(&mut stream, json!({"method": "status"}));
        assert_eq!(response["result"]["name"], "patchbay");
        assert!(response["result"]["methods"]
            .as_array()
            .unwrap()
            .iter()
            .any(|m| m == "create"));
    }

    #[test]
    fn test_two_clients_share_one_graph() {
        let addr = start_server();
        let mut first = TcpStream::connect(addr).unwrap();
        let mut second = TcpStream::connect(addr).unwrap();

        round_trip(
            &mut first,
            json!({"method": "create", "params": {"type": "movie"}}),
        );
        let response = round_trip(
            &mut second,
            json!({"method": "list", "params": {}}),
        );
        assert_eq!(response["result"]["nodes"].as_array().unwrap().len(), 1);
    }
}
