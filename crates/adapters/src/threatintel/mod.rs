pub mod otx_http_provider;
