//! Trait implementations for the HTTP boundary clients.

mod caravan_adapter;
mod dashboard_adapter;
