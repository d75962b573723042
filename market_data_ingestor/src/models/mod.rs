pub mod bar;
pub mod market;
pub mod options;
pub mod request_params;
