// Reolink camera CGI API client.
//
// All commands go through `POST /api.cgi?cmd=<name>&token=<token>` with a
// one-element JSON array as the body and a one-element array back. Auth is
// a lease token obtained from `Login` and passed in the query string.

pub mod client;

pub use client::{DeviceInfo, ReolinkClient};
