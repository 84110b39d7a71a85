//! TCP transport for serial-over-network bridges

use super::{connect_failed, ConnectionParams, LinkHalves, Transport};
use armctl_core::ConnectionError;
use std::net::{TcpStream, ToSocketAddrs};

/// Opens `host:port` TCP links
#[derive(Debug, Default, Clone, Copy)]
pub struct TcpTransport;

impl Transport for TcpTransport {
    fn open(&self, params: &ConnectionParams) -> Result<LinkHalves, ConnectionError> {
        let address = params
            .port
            .to_socket_addrs()
            .map_err(|e| connect_failed(&params.port, e))?
            .next()
            .ok_or_else(|| connect_failed(&params.port, "address did not resolve"))?;

        let stream = TcpStream::connect_timeout(&address, params.connect_timeout)
            .map_err(|e| connect_failed(&params.port, e))?;
        stream
            .set_read_timeout(Some(params.read_timeout))
            .map_err(|e| connect_failed(&params.port, e))?;
        stream
            .set_nodelay(true)
            .map_err(|e| connect_failed(&params.port, e))?;

        let writer = stream
            .try_clone()
            .map_err(|e| connect_failed(&params.port, e))?;

        tracing::debug!("TCP link open to {}", address);
        Ok(LinkHalves {
            reader: Box::new(stream),
            writer: Box::new(writer),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use std::net::TcpListener;
    use std::time::Duration;

    #[test]
    fn test_open_local_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let address = listener.local_addr().unwrap().to_string();
        let params = ConnectionParams::tcp(address).with_read_timeout(Duration::from_millis(20));

        let mut halves = TcpTransport.open(&params).unwrap();
        let _peer = listener.accept().unwrap();

        let mut buf = [0u8; 8];
        let err = halves.reader.read(&mut buf).unwrap_err();
        assert!(matches!(
            err.kind(),
            std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
        ));
    }

    #[test]
    fn test_unresolvable_address() {
        let params = ConnectionParams::tcp("not an address");
        assert!(matches!(
            TcpTransport.open(&params),
            Err(ConnectionError::ConnectFailed { .. })
        ));
    }
}
