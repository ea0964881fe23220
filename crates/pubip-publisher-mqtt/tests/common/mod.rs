//! Minimal MQTT 3.1.1 broker stand-in for tests
//!
//! Accepts connections one at a time on a background thread, answers
//! CONNECT with CONNACK and records every CONNECT and PUBLISH it sees.
//! Packets are decoded and encoded with rumqttc's `mqttbytes` codec.
//! Enough for QoS 0 clients; nothing is forwarded anywhere.

#![allow(dead_code)]

use bytes::BytesMut;
use rumqttc::mqttbytes::v4::{self, ConnAck, ConnectReturnCode, Packet, PingResp};
use rumqttc::mqttbytes::{self, QoS};
use std::io::{self, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// A CONNECT packet as received
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedConnect {
    pub client_id: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// A PUBLISH packet as received
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedPublish {
    /// Index of the connection (0-based) the packet arrived on
    pub connection: usize,
    pub topic: String,
    pub payload: String,
    pub qos: u8,
    pub retain: bool,
}

#[derive(Default)]
struct Recorded {
    connects: Vec<ReceivedConnect>,
    publishes: Vec<ReceivedPublish>,
    disconnects: usize,
}

/// Largest packet the stand-in accepts
const MAX_PACKET_SIZE: usize = 64 * 1024;

pub struct FakeBroker {
    pub port: u16,
    recorded: Arc<Mutex<Recorded>>,
}

impl FakeBroker {
    /// Start a broker that accepts every client
    pub fn start() -> Self {
        Self::spawn(true)
    }

    /// Start a broker that refuses every client as "not authorized"
    pub fn rejecting() -> Self {
        Self::spawn(false)
    }

    fn spawn(accept: bool) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind fake broker");
        let port = listener.local_addr().expect("local addr").port();
        let recorded = Arc::new(Mutex::new(Recorded::default()));

        let shared = recorded.clone();
        thread::spawn(move || {
            for (index, stream) in listener.incoming().enumerate() {
                let Ok(stream) = stream else { continue };
                let _ = serve(stream, index, accept, &shared);
            }
        });

        Self { port, recorded }
    }

    pub fn connects(&self) -> Vec<ReceivedConnect> {
        self.recorded.lock().unwrap().connects.clone()
    }

    pub fn publishes(&self) -> Vec<ReceivedPublish> {
        self.recorded.lock().unwrap().publishes.clone()
    }

    pub fn disconnects(&self) -> usize {
        self.recorded.lock().unwrap().disconnects
    }

    /// Wait until `count` clean disconnects were seen
    pub fn wait_for_disconnects(&self, count: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if self.disconnects() >= count {
                return true;
            }
            thread::sleep(Duration::from_millis(10));
        }
        self.disconnects() >= count
    }
}

fn serve(
    mut stream: TcpStream,
    connection: usize,
    accept: bool,
    recorded: &Mutex<Recorded>,
) -> io::Result<()> {
    stream.set_read_timeout(Some(Duration::from_secs(10)))?;

    let mut incoming = BytesMut::new();
    let mut outgoing = BytesMut::new();

    while let Some(packet) = read_packet(&mut stream, &mut incoming)? {
        match packet {
            Packet::Connect(connect) => {
                let login = connect.login;
                recorded.lock().unwrap().connects.push(ReceivedConnect {
                    client_id: connect.client_id,
                    username: login.as_ref().map(|l| l.username.clone()),
                    password: login.as_ref().map(|l| l.password.clone()),
                });

                let code = if accept {
                    ConnectReturnCode::Success
                } else {
                    ConnectReturnCode::NotAuthorized
                };
                ConnAck::new(code, false)
                    .write(&mut outgoing)
                    .map_err(codec_error)?;
                flush(&mut stream, &mut outgoing)?;

                if !accept {
                    return Ok(());
                }
            }
            Packet::Publish(publish) => {
                recorded.lock().unwrap().publishes.push(ReceivedPublish {
                    connection,
                    topic: publish.topic,
                    payload: String::from_utf8_lossy(&publish.payload).into_owned(),
                    qos: qos_level(publish.qos),
                    retain: publish.retain,
                });
            }
            Packet::PingReq => {
                PingResp.write(&mut outgoing).map_err(codec_error)?;
                flush(&mut stream, &mut outgoing)?;
            }
            Packet::Disconnect => {
                recorded.lock().unwrap().disconnects += 1;
                return Ok(());
            }
            _ => {}
        }
    }

    Ok(())
}

/// Decode the next packet, reading more bytes as needed; `None` on EOF
fn read_packet(stream: &mut TcpStream, buf: &mut BytesMut) -> io::Result<Option<Packet>> {
    loop {
        match v4::read(buf, MAX_PACKET_SIZE) {
            Ok(packet) => return Ok(Some(packet)),
            Err(mqttbytes::Error::InsufficientBytes(_)) => {}
            Err(e) => return Err(codec_error(e)),
        }

        let mut chunk = [0u8; 4096];
        let n = stream.read(&mut chunk)?;
        if n == 0 {
            return Ok(None);
        }
        buf.extend_from_slice(&chunk[..n]);
    }
}

fn flush(stream: &mut TcpStream, buf: &mut BytesMut) -> io::Result<()> {
    stream.write_all(buf)?;
    buf.clear();
    Ok(())
}

fn qos_level(qos: QoS) -> u8 {
    match qos {
        QoS::AtMostOnce => 0,
        QoS::AtLeastOnce => 1,
        QoS::ExactlyOnce => 2,
    }
}

fn codec_error(e: mqttbytes::Error) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, format!("{:?}", e))
}
