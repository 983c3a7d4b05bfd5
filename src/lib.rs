// heic2pdf-server: accepts HEIC/phone-photo uploads over HTTP, converts each
// to JPEG, and returns a single PDF with one image per page.

pub mod app;
pub mod compose;
pub mod convert;
pub mod error;
pub mod extract_upload;
pub mod handlers;
pub mod intake;
pub mod listeners;
pub mod shutdown_signal;
