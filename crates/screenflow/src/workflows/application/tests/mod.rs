mod common;

mod hooks;
mod store;
