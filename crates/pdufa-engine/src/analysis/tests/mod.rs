mod builder;
mod common;
mod registry;
