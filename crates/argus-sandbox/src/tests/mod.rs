//! Unit and behavioural tests for the sandbox.

mod support;
