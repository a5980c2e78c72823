pub mod catalog;
pub mod requests;
pub mod upload;

pub use catalog::{ProductImageRecord, ProductRecord};
pub use requests::{
    ConfirmUploadRequest, ConfirmUploadResponse, DeleteFileRequest, DeleteFileResponse,
    InitiateUploadRequest, InitiateUploadResponse,
};
pub use upload::{UploadRecord, UploadStatus};
