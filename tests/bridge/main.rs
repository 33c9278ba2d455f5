//! Integration tests for `EditorBridge` against in-memory collaborators.

mod support;

mod handshake;
