use std::collections::HashMap;
use std::net::{Shutdown, TcpStream};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use log::debug;
use serde::Serialize;

use super::Sink;

/// Fluentd forward-protocol client.
///
/// Events are msgpack-encoded `[tag, time, record]` arrays written over one
/// long-lived TCP connection held for the whole run. The connection is
/// opened lazily on first emit, so an unreachable endpoint degrades to
/// per-line warnings instead of failing the run.
pub struct FluentSink {
    host: String,
    port: u16,
    base_tag: String,
    stream: Option<TcpStream>,
}

/// One forward-mode event. Serde encodes the tuple struct as an array.
#[derive(Serialize)]
struct ForwardEvent<'a>(&'a str, u64, &'a HashMap<String, String>);

impl FluentSink {
    pub fn new(host: &str, port: u16, base_tag: &str) -> Self {
        FluentSink {
            host: host.to_string(),
            port,
            base_tag: base_tag.to_string(),
            stream: None,
        }
    }

    /// The wire tag is the base tag with the record name appended.
    fn wire_tag(&self, name: &str) -> String {
        if self.base_tag.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", self.base_tag, name)
        }
    }

    fn stream(&mut self) -> Result<&mut TcpStream> {
        if self.stream.is_none() {
            let stream = TcpStream::connect((self.host.as_str(), self.port)).context(format!(
                "Failed to connect to fluent endpoint {}:{}",
                self.host, self.port
            ))?;
            debug!("Connected to fluent endpoint {}:{}", self.host, self.port);
            self.stream = Some(stream);
        }
        self.stream.as_mut().context("fluent connection unavailable")
    }
}

impl Sink for FluentSink {
    fn emit(
        &mut self,
        tag: &str,
        fields: &HashMap<String, String>,
        timestamp: Option<u64>,
    ) -> Result<()> {
        let wire_tag = self.wire_tag(tag);
        // The forward protocol always carries an event time; without a
        // capture timestamp the send time is used.
        let time = timestamp.unwrap_or_else(|| {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0)
        });
        let event = ForwardEvent(&wire_tag, time, fields);

        let stream = self.stream()?;
        rmp_serde::encode::write(stream, &event).context("Failed to write fluent event")?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if let Some(stream) = self.stream.take() {
            stream
                .shutdown(Shutdown::Both)
                .context("Failed to close fluent connection")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use std::net::TcpListener;
    use std::thread;

    #[test]
    fn test_wire_tag_appends_record_name_to_base_tag() {
        let sink = FluentSink::new("localhost", 24224, "collected");
        assert_eq!(sink.wire_tag("app"), "collected.app");

        let bare = FluentSink::new("localhost", 24224, "");
        assert_eq!(bare.wire_tag("app"), "app");
    }

    #[test]
    fn test_close_without_connection_is_a_noop() {
        let mut sink = FluentSink::new("localhost", 24224, "tag");
        assert!(sink.close().is_ok());
    }

    #[test]
    fn test_emit_writes_forward_protocol_event() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = thread::spawn(move || {
            let (mut socket, _) = listener.accept().unwrap();
            let mut bytes = Vec::new();
            socket.read_to_end(&mut bytes).unwrap();
            bytes
        });

        let mut sink = FluentSink::new("127.0.0.1", port, "collected");
        let mut fields = HashMap::new();
        fields.insert("message".to_string(), "hello".to_string());
        sink.emit("app", &fields, Some(1700000000)).unwrap();
        sink.close().unwrap();

        let bytes = server.join().unwrap();
        let (tag, time, record): (String, u64, HashMap<String, String>) =
            rmp_serde::from_slice(&bytes).unwrap();

        assert_eq!(tag, "collected.app");
        assert_eq!(time, 1700000000);
        assert_eq!(record.get("message").unwrap(), "hello");
    }

    #[test]
    fn test_unreachable_endpoint_fails_per_emit() {
        // Port 1 on localhost is essentially never listening.
        let mut sink = FluentSink::new("127.0.0.1", 1, "tag");
        let fields = HashMap::new();
        assert!(sink.emit("app", &fields, None).is_err());
        assert!(sink.close().is_ok());
    }
}
