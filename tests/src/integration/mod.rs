//! # Integration Scenarios
//!
//! End-to-end transactions over `InMemoryWorld` and `ScriptedExecutor`.


mod nested_calls;
mod storage_flows;
mod transactions;
