pub mod excel_write;
pub mod http;
pub mod soap;
