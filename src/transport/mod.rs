mod backend;

pub use backend::{BackendClient, BackendStream};
