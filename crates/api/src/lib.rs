//! HTTP API: webhook ingress and operator endpoints.

pub mod app;
