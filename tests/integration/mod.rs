//! Integration tests against bundles packed from real directory trees

mod cli_roundtrip;
mod fs_laws;
mod http_adapter;
mod support;
