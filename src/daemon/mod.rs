mod service;

pub use service::{process_payload, router, run};
