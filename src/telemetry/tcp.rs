use std::io::{BufRead, BufReader, Write};
use std::net::TcpStream;

use crate::error::TelemetryError;
use crate::telemetry::{CameraImage, Command, TelemetryChannel, TelemetryFrame};

/// TCP client for the simulator's telemetry service.
///
/// The protocol is line-delimited JSON: each request is a single JSON object
/// followed by `\n`, and each `get` request is answered with a single JSON
/// line — the payload, or `null` when no data is ready yet. Control commands
/// are fire-and-forget.
pub struct GameTelemetry {
    addr: String,
    reader: Option<BufReader<TcpStream>>,
    writer: Option<TcpStream>,
}

/// Camera frame as it appears on the wire: raw RGB bytes, row-major.
#[derive(serde::Serialize, serde::Deserialize)]
struct WireImage {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl GameTelemetry {
    pub fn new(ip: &str, port: u16) -> Self {
        GameTelemetry {
            addr: format!("{ip}:{port}"),
            reader: None,
            writer: None,
        }
    }

    fn request(&mut self, body: &serde_json::Value) -> Result<String, TelemetryError> {
        let writer = self.writer.as_mut().ok_or(TelemetryError::NotConnected)?;
        let reader = self.reader.as_mut().ok_or(TelemetryError::NotConnected)?;

        let mut line = serde_json::to_string(body)?;
        line.push('\n');
        writer.write_all(line.as_bytes())?;
        writer.flush()?;

        let mut response = String::new();
        let read = reader.read_line(&mut response)?;
        if read == 0 {
            return Err(TelemetryError::Protocol(
                "simulator closed the connection".into(),
            ));
        }
        Ok(response)
    }
}

impl TelemetryChannel for GameTelemetry {
    fn connect(&mut self) -> Result<(), TelemetryError> {
        let stream = TcpStream::connect(&self.addr).map_err(|e| TelemetryError::Connect {
            addr: self.addr.clone(),
            source: e,
        })?;
        stream.set_nodelay(true)?;
        self.reader = Some(BufReader::new(stream.try_clone()?));
        self.writer = Some(stream);
        Ok(())
    }

    fn game_data(&mut self) -> Result<Option<TelemetryFrame>, TelemetryError> {
        let response = self.request(&serde_json::json!({ "get": "telemetry" }))?;
        let frame: Option<TelemetryFrame> = serde_json::from_str(response.trim())?;
        Ok(frame)
    }

    fn image(&mut self) -> Result<Option<CameraImage>, TelemetryError> {
        let response = self.request(&serde_json::json!({ "get": "image" }))?;
        let wire: Option<WireImage> = serde_json::from_str(response.trim())?;
        match wire {
            None => Ok(None),
            Some(wire) => {
                let (width, height, len) = (wire.width, wire.height, wire.pixels.len());
                let image = CameraImage::from_raw(width, height, wire.pixels).ok_or(
                    TelemetryError::ImageDecode { width, height, len },
                )?;
                Ok(Some(image))
            }
        }
    }

    fn send_command(&mut self, command: &Command) -> Result<(), TelemetryError> {
        let writer = self.writer.as_mut().ok_or(TelemetryError::NotConnected)?;
        let mut line = serde_json::to_string(&serde_json::json!({
            "control": [command.steering, command.throttle]
        }))?;
        line.push('\n');
        writer.write_all(line.as_bytes())?;
        writer.flush()?;
        Ok(())
    }
}
