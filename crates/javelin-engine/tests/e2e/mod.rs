//! End-to-end tests: syntax trees compiled and executed on a fresh process

mod harness;

mod classes;
mod collections;
mod entry_point;
mod execution;
mod operators;
mod serialization;
