// certship-api: wire-protocol clients for the devices certship manages.
//
// Two surfaces, nothing shared above the transport layer:
// - `routeros`: the MikroTik binary management API (length-prefixed words
//   over TCP, optional TLS on a separate port).
// - `reolink`: the Reolink camera CGI API (JSON command envelopes over
//   HTTPS, token-in-query-string auth).

pub mod error;
pub mod reolink;
pub mod routeros;
pub mod transport;

pub use error::Error;
pub use reolink::{DeviceInfo, ReolinkClient};
pub use routeros::{Reply, ReplyKind, RouterOsConnection};
pub use transport::{TlsMode, TransportConfig};
