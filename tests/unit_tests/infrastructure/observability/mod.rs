mod request_id_test;
mod tracing_config_test;
