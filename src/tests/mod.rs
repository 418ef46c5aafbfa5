//! tests/mod.rs
//! Pruebas unitarias y de integración HTTP (SQLite en memoria + transporte simulado).

mod booking_tests;
mod support;
