mod write_json;

pub use write_json::write_sample_result;
