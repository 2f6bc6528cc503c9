// RouterOS binary management API client.
//
// The protocol is a stream of "sentences" -- sequences of length-prefixed
// UTF-8 "words" terminated by a zero-length word -- over TCP (port 8728)
// or TLS (port 8729, self-signed device cert). `codec` owns the framing;
// `connection` owns the socket, login, and the command/reply loop.

pub mod codec;
pub mod connection;

pub use connection::{Reply, ReplyKind, RouterOsConnection};
