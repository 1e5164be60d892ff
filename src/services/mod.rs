pub mod allocator;
pub mod gallery_service;
pub mod image_store;
pub mod storage;
