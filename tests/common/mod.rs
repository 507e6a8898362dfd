#![allow(dead_code)]

pub mod dispatch {
    use std::path::PathBuf;
    use waypoint::cli::build_dispatcher;
    use waypoint::runtime_config::RuntimeConfig;
    use waypoint::{Dispatcher, UnhandledErrorPolicy};

    /// Demo dispatcher with `tests/staticdata` as the static fallback.
    pub fn demo_dispatcher() -> Dispatcher {
        demo_dispatcher_with(UnhandledErrorPolicy::Render)
    }

    pub fn demo_dispatcher_with(policy: UnhandledErrorPolicy) -> Dispatcher {
        let config = RuntimeConfig {
            static_dir: Some(PathBuf::from("tests/staticdata")),
            error_policy: policy,
            ..RuntimeConfig::default()
        };
        build_dispatcher(&config).unwrap()
    }
}

pub mod http {
    use std::io::{Read, Write};
    use std::net::{SocketAddr, TcpListener, TcpStream};
    use std::time::Duration;

    /// Reserve a loopback port, then release it for the server.
    pub fn free_addr() -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        addr
    }

    pub fn send_request(addr: &SocketAddr, req: &str) -> String {
        send_bytes(addr, req.as_bytes())
    }

    pub fn send_bytes(addr: &SocketAddr, req: &[u8]) -> String {
        let mut stream = TcpStream::connect(addr).unwrap();
        stream.write_all(req).unwrap();
        stream
            .set_read_timeout(Some(Duration::from_millis(200)))
            .unwrap();
        let mut buf = Vec::new();
        loop {
            let mut tmp = [0u8; 1024];
            match stream.read(&mut tmp) {
                Ok(0) => break,
                Ok(n) => buf.extend_from_slice(&tmp[..n]),
                Err(ref e)
                    if e.kind() == std::io::ErrorKind::WouldBlock
                        || e.kind() == std::io::ErrorKind::TimedOut =>
                {
                    break
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::ConnectionReset => break,
                Err(e) => panic!("read error: {e:?}"),
            }
        }
        String::from_utf8_lossy(&buf).to_string()
    }

    /// Status, lowercase-named headers and body of a raw response.
    pub fn parse_response(resp: &str) -> (u16, Vec<(String, String)>, String) {
        let (head, body) = resp.split_once("\r\n\r\n").unwrap_or((resp, ""));
        let mut lines = head.lines();
        let status = lines
            .next()
            .and_then(|l| l.split_whitespace().nth(1))
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);
        let headers = lines
            .filter_map(|l| l.split_once(':'))
            .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
            .collect();
        (status, headers, body.to_string())
    }

    pub fn header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
        headers
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

pub mod test_server {
    use std::sync::Once;

    static MAY_INIT: Once = Once::new();

    pub fn setup_may_runtime() {
        MAY_INIT.call_once(|| {
            may::config().set_stack_size(0x8000);
        });
    }
}
