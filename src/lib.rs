//! Blueprint Forge - capture, store, transport and rebuild entity arrangements

pub mod blueprints;
pub mod codec;
pub mod collection;
pub mod core;
pub mod storage;
pub mod world;
