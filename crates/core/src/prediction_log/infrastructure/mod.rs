pub mod csv_log_store;
