//! SSDP M-SEARCH client.
//!
//! Internal to the crate: sends one multicast search and yields the unicast
//! answers until the read timeout expires.

use std::net::UdpSocket;
use std::time::Duration;

use crate::error::{DiscoveryError, Result};

const MULTICAST_ADDR: &str = "239.255.255.250:1900";

/// One answer to an M-SEARCH request
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SsdpResponse {
    pub location: String,
    pub st: String,
    pub usn: String,
    pub server: Option<String>,
}

pub(crate) struct SsdpClient {
    socket: UdpSocket,
    mx: u64,
}

impl SsdpClient {
    /// Create a client whose search window is `timeout`
    pub fn new(timeout: Duration) -> Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0")
            .map_err(|e| DiscoveryError::NetworkError(format!("Failed to bind UDP socket: {}", e)))?;

        socket
            .set_read_timeout(Some(timeout))
            .map_err(|e| DiscoveryError::NetworkError(format!("Failed to set read timeout: {}", e)))?;

        socket
            .set_multicast_loop_v4(true)
            .map_err(|e| DiscoveryError::NetworkError(format!("Failed to set multicast loop: {}", e)))?;

        // Devices spread their answers over MX seconds; keep that inside the window.
        let mx = timeout.as_secs().clamp(1, 5);

        Ok(Self { socket, mx })
    }

    /// Send an M-SEARCH request and return an iterator of responses
    pub fn search(&self, search_target: &str) -> Result<SsdpResponseIterator<'_>> {
        let request = build_search_request(search_target, self.mx);

        self.socket
            .send_to(request.as_bytes(), MULTICAST_ADDR)
            .map_err(|e| DiscoveryError::NetworkError(format!("Failed to send M-SEARCH: {}", e)))?;

        Ok(SsdpResponseIterator {
            socket: &self.socket,
            buffer: [0; 2048],
            finished: false,
        })
    }
}

fn build_search_request(search_target: &str, mx: u64) -> String {
    format!(
        "M-SEARCH * HTTP/1.1\r\n\
         HOST: {}\r\n\
         MAN: \"ssdp:discover\"\r\n\
         MX: {}\r\n\
         ST: {}\r\n\
         USER-AGENT: raumfeld-bridge/0.2 UPnP/1.0\r\n\
         \r\n",
        MULTICAST_ADDR, mx, search_target
    )
}

pub(crate) struct SsdpResponseIterator<'a> {
    socket: &'a UdpSocket,
    buffer: [u8; 2048],
    finished: bool,
}

impl Iterator for SsdpResponseIterator<'_> {
    type Item = Result<SsdpResponse>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.finished {
            match self.socket.recv_from(&mut self.buffer) {
                Ok((size, _)) => {
                    let parsed = std::str::from_utf8(&self.buffer[..size])
                        .ok()
                        .and_then(parse_ssdp_response);
                    if let Some(response) = parsed {
                        return Some(Ok(response));
                    }
                }
                Err(e)
                    if e.kind() == std::io::ErrorKind::WouldBlock
                        || e.kind() == std::io::ErrorKind::TimedOut =>
                {
                    self.finished = true;
                }
                Err(e) => {
                    self.finished = true;
                    return Some(Err(DiscoveryError::NetworkError(format!("Socket error: {}", e))));
                }
            }
        }
        None
    }
}

/// Parse an SSDP response from HTTP text
fn parse_ssdp_response(response: &str) -> Option<SsdpResponse> {
    let mut location = None;
    let mut st = None;
    let mut usn = None;
    let mut server = None;

    for line in response.lines() {
        let line = line.trim();

        if let Some(value) = extract_header_value(line, "LOCATION:") {
            location = Some(value);
        } else if let Some(value) = extract_header_value(line, "ST:") {
            st = Some(value);
        } else if let Some(value) = extract_header_value(line, "USN:") {
            usn = Some(value);
        } else if let Some(value) = extract_header_value(line, "SERVER:") {
            server = Some(value);
        }
    }

    Some(SsdpResponse {
        location: location?,
        st: st?,
        usn: usn?,
        server,
    })
}

/// Extract header value from a line like "HEADER: value"
fn extract_header_value(line: &str, header: &str) -> Option<String> {
    if line.len() > header.len() && line[..header.len()].eq_ignore_ascii_case(header) {
        Some(line[header.len()..].trim().to_string())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_request_carries_target_and_mx() {
        let request = build_search_request("urn:schemas-raumfeld-com:service:RaumfeldGenerator:1", 2);

        assert!(request.starts_with("M-SEARCH * HTTP/1.1\r\n"));
        assert!(request.contains("ST: urn:schemas-raumfeld-com:service:RaumfeldGenerator:1\r\n"));
        assert!(request.contains("MX: 2\r\n"));
        assert!(request.ends_with("\r\n\r\n"));
    }

    #[test]
    fn test_parse_ssdp_response_valid() {
        let response = "HTTP/1.1 200 OK\r\n\
            LOCATION: http://192.168.1.40:52441/f3a1c6e2-7b0d-4d3c-9a51-0e5c2f1b7a11.xml\r\n\
            ST: urn:schemas-raumfeld-com:service:RaumfeldGenerator:1\r\n\
            USN: uuid:f3a1c6e2-7b0d-4d3c-9a51-0e5c2f1b7a11::urn:schemas-raumfeld-com:service:RaumfeldGenerator:1\r\n\
            SERVER: Linux/3.14 UPnP/1.0 Raumfeld/1.0\r\n\
            \r\n";

        let parsed = parse_ssdp_response(response).unwrap();

        assert_eq!(
            parsed.location,
            "http://192.168.1.40:52441/f3a1c6e2-7b0d-4d3c-9a51-0e5c2f1b7a11.xml"
        );
        assert_eq!(parsed.st, "urn:schemas-raumfeld-com:service:RaumfeldGenerator:1");
        assert!(parsed.usn.starts_with("uuid:f3a1c6e2"));
        assert_eq!(parsed.server.as_deref(), Some("Linux/3.14 UPnP/1.0 Raumfeld/1.0"));
    }

    #[test]
    fn test_parse_ssdp_response_case_insensitive() {
        let response = "HTTP/1.1 200 OK\r\n\
            location: http://192.168.1.41:52441/desc.xml\r\n\
            st: urn:schemas-raumfeld-com:service:RaumfeldGenerator:1\r\n\
            usn: uuid:abc::urn:schemas-raumfeld-com:service:RaumfeldGenerator:1\r\n\
            \r\n";

        let parsed = parse_ssdp_response(response).unwrap();
        assert_eq!(parsed.location, "http://192.168.1.41:52441/desc.xml");
        assert_eq!(parsed.server, None);
    }

    #[test]
    fn test_parse_ssdp_response_missing_required_headers() {
        let missing_location = "HTTP/1.1 200 OK\r\nST: x\r\nUSN: y\r\n\r\n";
        let missing_usn = "HTTP/1.1 200 OK\r\nLOCATION: http://a/b\r\nST: x\r\n\r\n";

        assert!(parse_ssdp_response(missing_location).is_none());
        assert!(parse_ssdp_response(missing_usn).is_none());
        assert!(parse_ssdp_response("").is_none());
    }

    #[test]
    fn test_extract_header_value() {
        assert_eq!(
            extract_header_value("Location:   http://example.com  ", "LOCATION:"),
            Some("http://example.com".to_string())
        );
        assert_eq!(extract_header_value("LOCATION:", "LOCATION:"), None);
        assert_eq!(extract_header_value("LOCATIONS: value", "LOCATION:"), None);
    }
}
